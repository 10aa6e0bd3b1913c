//! Display-state controller.
//!
//! Owns one [`SurfaceState`] per rendering surface and decides, per toggle or
//! refresh, whether to reuse the cached results or start a new fetch round.
//! Fetching itself happens elsewhere: entry points return a [`FetchPlan`] and
//! results come back through [`DisplayController::apply`].
//!
//! Each round is tagged with a sequence number. Outcomes from any round other
//! than the surface's latest are discarded, so a slow superseded response can
//! never overwrite a newer one.

mod sink;
mod surface;

pub use sink::{RenderSink, SlotEvent};
pub use surface::{
    Phase, RefreshPolicy, SlotBinding, SlotId, SurfaceConfig, SurfaceId, SurfaceState,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{FetchPlan, SourceOutcome};
use crate::clock::Clock;
use crate::config::Config;
use crate::format::RenderedSlot;
use crate::source::{Source, SourceId};
use surface::InFlight;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("unknown surface '{0}'")]
    UnknownSurface(SurfaceId),
    #[error("unknown source '{0}'")]
    UnknownSource(SourceId),
}

/// What [`DisplayController::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Not from the surface's latest round; dropped.
    Stale,
    /// Recorded; other sources of the round are still outstanding.
    Pending,
    /// Last outstanding source; the round is resolved.
    Completed,
}

pub struct DisplayController<S> {
    sources: HashMap<SourceId, Source>,
    surfaces: BTreeMap<SurfaceId, SurfaceState>,
    sink: S,
    clock: Arc<dyn Clock>,
    next_seq: u64,
}

impl<S: RenderSink> DisplayController<S> {
    /// Builds the controller with every surface hidden.
    ///
    /// Fails if `config` does not validate, since a slot bound to an unknown
    /// source would leave its surface waiting on a round that never completes.
    pub fn new(config: &Config, sink: S, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        config.validate()?;
        let sources = config
            .sources
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();
        let surfaces = config
            .surfaces
            .iter()
            .map(|s| (s.id.clone(), SurfaceState::new(s.clone())))
            .collect();

        Ok(Self {
            sources,
            surfaces,
            sink,
            clock,
            next_seq: 0,
        })
    }

    /// Shows a hidden surface or hides a shown one.
    ///
    /// Revealing reuses cached results when present (re-rendered against the
    /// current time) and otherwise starts a fetch round.
    pub fn toggle(&mut self, id: &SurfaceId) -> Result<Option<FetchPlan>, ControlError> {
        let now = self.clock.now();
        let surface = self
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ControlError::UnknownSurface(id.clone()))?;

        if surface.is_visible() {
            surface.phase = Phase::Hidden;
            info!(surface = %id, "Surface hidden");
            return Ok(None);
        }

        if let Some(cache) = &surface.cache {
            let slots = surface.render(cache, &self.sources, now, None);
            publish(&mut self.sink, surface, slots);
            surface.phase = Phase::Visible;
            info!(surface = %id, "Surface shown from cache");
            return Ok(None);
        }

        info!(surface = %id, "Surface shown, fetching");
        Ok(Some(begin_round(surface, &mut self.next_seq, &self.sources)))
    }

    /// Re-fetches a shown surface, bypassing its cache. No-op when hidden.
    pub fn refresh(&mut self, id: &SurfaceId) -> Result<Option<FetchPlan>, ControlError> {
        let surface = self
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ControlError::UnknownSurface(id.clone()))?;

        if !surface.is_visible() {
            debug!(surface = %id, "Ignoring refresh of hidden surface");
            return Ok(None);
        }

        Ok(Some(begin_round(surface, &mut self.next_seq, &self.sources)))
    }

    /// Points selection-following slots at `source`.
    ///
    /// Drops the surface cache along with any round still in flight for the
    /// old selection; a shown surface fetches the new source at once.
    pub fn select_source(
        &mut self,
        id: &SurfaceId,
        source: &SourceId,
    ) -> Result<Option<FetchPlan>, ControlError> {
        if !self.sources.contains_key(source) {
            return Err(ControlError::UnknownSource(source.clone()));
        }
        let surface = self
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ControlError::UnknownSurface(id.clone()))?;

        surface.selection = Some(source.clone());
        surface.cache = None;
        info!(surface = %id, source = %source, "Source selected");

        if !surface.is_visible() {
            surface.in_flight = None;
            return Ok(None);
        }
        Ok(Some(begin_round(surface, &mut self.next_seq, &self.sources)))
    }

    /// Applies one source's result to the surface that requested it.
    pub fn apply(&mut self, outcome: SourceOutcome) -> Applied {
        let now = self.clock.now();
        let SourceOutcome {
            surface: surface_id,
            seq,
            source,
            result,
        } = outcome;

        let Some(surface) = self.surfaces.get_mut(&surface_id) else {
            warn!(surface = %surface_id, "Outcome for unknown surface");
            return Applied::Stale;
        };

        let Some(in_flight) = surface.in_flight.as_mut().filter(|f| f.seq == seq) else {
            debug!(surface = %surface_id, source = %source, seq, "Discarding stale outcome");
            return Applied::Stale;
        };
        if !in_flight.awaiting.remove(&source) {
            debug!(surface = %surface_id, source = %source, seq, "Discarding duplicate outcome");
            return Applied::Stale;
        }
        in_flight.received.insert(source.clone(), result);
        let done = in_flight.awaiting.is_empty();

        if surface.is_visible() && surface.policy() == RefreshPolicy::Incremental {
            if let Some(in_flight) = &surface.in_flight {
                let slots = surface.render(&in_flight.received, &self.sources, now, Some(&source));
                publish(&mut self.sink, surface, slots);
            }
        }

        if !done {
            return Applied::Pending;
        }

        let Some(InFlight { received, .. }) = surface.in_flight.take() else {
            return Applied::Pending;
        };
        let resolved = surface.resolve(&received);

        if surface.is_visible() {
            if surface.policy() == RefreshPolicy::Atomic {
                let slots = surface.render(&received, &self.sources, now, None);
                publish(&mut self.sink, surface, slots);
            }
            surface.phase = resolved.clone();
        }

        surface.cache = match resolved {
            Phase::Visible => Some(received),
            _ => None,
        };
        info!(
            surface = %surface_id,
            seq,
            phase = ?surface.phase,
            cached = surface.cache.is_some(),
            "Fetch round complete"
        );
        Applied::Completed
    }

    pub fn surface(&self, id: &SurfaceId) -> Option<&SurfaceState> {
        self.surfaces.get(id)
    }

    /// `true` when no surface is waiting on a fetch round.
    pub fn is_idle(&self) -> bool {
        self.surfaces.values().all(|s| s.in_flight.is_none())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Starts a new round for `surface`, superseding any round in flight.
fn begin_round(
    surface: &mut SurfaceState,
    next_seq: &mut u64,
    sources: &HashMap<SourceId, Source>,
) -> FetchPlan {
    *next_seq += 1;
    let seq = *next_seq;

    let plan_sources: Vec<Source> = surface
        .required_sources()
        .iter()
        .filter_map(|id| sources.get(id).cloned())
        .collect();

    surface.phase = Phase::Loading;
    surface.in_flight = Some(InFlight::new(
        seq,
        plan_sources.iter().map(|s| s.id.clone()),
    ));
    debug!(surface = %surface.id(), seq, sources = plan_sources.len(), "Fetch round started");

    FetchPlan {
        surface: surface.id().clone(),
        seq,
        sources: plan_sources,
    }
}

fn publish<S: RenderSink>(
    sink: &mut S,
    surface: &mut SurfaceState,
    slots: Vec<(SlotId, RenderedSlot)>,
) {
    for (slot, rendered) in slots {
        if rendered.is_error {
            sink.on_slot_error(surface.id(), &slot, &rendered.text);
        } else {
            sink.on_slot_update(surface.id(), &slot, &rendered.text);
        }
        surface.rendered.insert(slot, rendered.text);
    }
}
