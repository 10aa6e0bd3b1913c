use my_stop::display::{RenderSink, SlotId, SurfaceId};

/// Paints slot text to stdout, one block per update.
pub struct TerminalSink;

impl RenderSink for TerminalSink {
    fn on_slot_update(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str) {
        println!("[{surface}/{slot}]\n{}\n", text.trim_end());
    }

    fn on_slot_error(&mut self, surface: &SurfaceId, slot: &SlotId, text: &str) {
        println!("[{surface}/{slot}] !\n{}\n", text.trim_end());
    }
}
