use super::surface::{SlotId, SurfaceId};

/// Receives slot text from the controller. Painting is up to the implementor.
pub trait RenderSink {
    fn on_slot_update(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str);

    /// Called instead of [`RenderSink::on_slot_update`] when the slot shows
    /// failure text.
    fn on_slot_error(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEvent {
    pub surface: SurfaceId,
    pub slot: SlotId,
    pub text: String,
    pub is_error: bool,
}

/// Records every notification, in order.
impl RenderSink for Vec<SlotEvent> {
    fn on_slot_update(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str) {
        self.push(SlotEvent {
            surface: surface.clone(),
            slot: slot.clone(),
            text: text.to_string(),
            is_error: false,
        });
    }

    fn on_slot_error(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str) {
        self.push(SlotEvent {
            surface: surface.clone(),
            slot: slot.clone(),
            text: text.to_string(),
            is_error: true,
        });
    }
}
