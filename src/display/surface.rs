use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::format::{RenderedSlot, failure_text, render_slot};
use crate::source::{Source, SourceId, SourceResult};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Identifies a rendering surface, e.g. the foreground view or the widget.
    SurfaceId
);
string_id!(
    /// Identifies a slot within a surface.
    SlotId
);

/// How results from a multi-source fetch reach the slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Each source's slots update as soon as that source completes.
    #[default]
    Incremental,
    /// All slots update together once every source has completed.
    Atomic,
}

/// Binds a slot to a source and, optionally, a rank within its arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    pub id: SlotId,
    /// `None` follows the surface's current source selection.
    #[serde(default)]
    pub source: Option<SourceId>,
    /// `None` shows every arrival; `Some(n)` shows only the n-th (0-based).
    #[serde(default)]
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub id: SurfaceId,
    #[serde(default)]
    pub refresh: RefreshPolicy,
    /// Initial source for slots that follow the selection.
    #[serde(default)]
    pub selection: Option<SourceId>,
    pub slots: Vec<SlotBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Hidden,
    Loading,
    Visible,
    /// A visible surface whose last fetch round produced no usable source.
    Error(String),
}

/// Results gathered so far for the latest dispatch on a surface.
#[derive(Debug)]
pub(crate) struct InFlight {
    pub(crate) seq: u64,
    pub(crate) awaiting: BTreeSet<SourceId>,
    pub(crate) received: BTreeMap<SourceId, SourceResult>,
}

impl InFlight {
    pub(crate) fn new(seq: u64, awaiting: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            seq,
            awaiting: awaiting.into_iter().collect(),
            received: BTreeMap::new(),
        }
    }
}

/// Display state of one surface. Only the controller mutates it.
#[derive(Debug)]
pub struct SurfaceState {
    pub(crate) config: SurfaceConfig,
    pub(crate) phase: Phase,
    pub(crate) selection: Option<SourceId>,
    pub(crate) cache: Option<BTreeMap<SourceId, SourceResult>>,
    pub(crate) rendered: BTreeMap<SlotId, String>,
    pub(crate) in_flight: Option<InFlight>,
}

impl SurfaceState {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            selection: config.selection.clone(),
            config,
            phase: Phase::Hidden,
            cache: None,
            rendered: BTreeMap::new(),
            in_flight: None,
        }
    }

    pub fn id(&self) -> &SurfaceId {
        &self.config.id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// `Loading`, `Visible` and `Error` all count as shown.
    pub fn is_visible(&self) -> bool {
        !matches!(self.phase, Phase::Hidden)
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.config.refresh
    }

    pub fn selection(&self) -> Option<&SourceId> {
        self.selection.as_ref()
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Last text pushed to `slot`, if any.
    pub fn rendered_text(&self, slot: &SlotId) -> Option<&str> {
        self.rendered.get(slot).map(String::as_str)
    }

    pub fn latest_seq(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|f| f.seq)
    }

    fn bound_source<'a>(&'a self, binding: &'a SlotBinding) -> Option<&'a SourceId> {
        binding.source.as_ref().or(self.selection.as_ref())
    }

    /// Distinct sources the slots currently need, in slot order.
    pub fn required_sources(&self) -> Vec<SourceId> {
        let mut seen = BTreeSet::new();
        self.config
            .slots
            .iter()
            .filter_map(|binding| self.bound_source(binding))
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Renders the slots whose source has a result in `results`. With `only`
    /// set, just the slots bound to that source.
    pub(crate) fn render(
        &self,
        results: &BTreeMap<SourceId, SourceResult>,
        sources: &HashMap<SourceId, Source>,
        now: DateTime<Utc>,
        only: Option<&SourceId>,
    ) -> Vec<(SlotId, RenderedSlot)> {
        self.config
            .slots
            .iter()
            .filter_map(|binding| {
                let source = self.bound_source(binding)?;
                if only.is_some_and(|only| only != source) {
                    return None;
                }
                let result = results.get(source)?;
                let fields = sources
                    .get(source)
                    .map(|s| s.display_fields)
                    .unwrap_or_default();
                Some((
                    binding.id.clone(),
                    render_slot(result, binding.rank, fields, now),
                ))
            })
            .collect()
    }

    /// Phase reached once every source of a round has answered.
    pub(crate) fn resolve(&self, results: &BTreeMap<SourceId, SourceResult>) -> Phase {
        if results.values().any(SourceResult::is_success) {
            return Phase::Visible;
        }

        let message = self
            .required_sources()
            .iter()
            .filter_map(|id| results.get(id))
            .find_map(failure_text)
            .unwrap_or_else(|| crate::format::NO_DATA.to_string());
        Phase::Error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> SurfaceConfig {
        serde_json::from_str(
            r#"{"id":"widget","refresh":"atomic","slots":[
                {"id":"first","source":"MUNI","rank":0},
                {"id":"second","source":"MUNI","rank":1},
                {"id":"bart","source":"BART"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_new_surface_is_hidden_and_empty() {
        let surface = SurfaceState::new(widget());
        assert_eq!(surface.phase(), &Phase::Hidden);
        assert!(!surface.is_visible());
        assert!(!surface.has_cache());
        assert_eq!(surface.policy(), RefreshPolicy::Atomic);
        assert_eq!(surface.rendered_text(&SlotId::from("first")), None);
    }

    #[test]
    fn test_required_sources_are_distinct_in_slot_order() {
        let surface = SurfaceState::new(widget());
        assert_eq!(
            surface.required_sources(),
            [SourceId::from("MUNI"), SourceId::from("BART")]
        );
    }

    #[test]
    fn test_selection_following_slots() {
        let config: SurfaceConfig = serde_json::from_str(
            r#"{"id":"app","selection":"MUNI","slots":[{"id":"arrivals"}]}"#,
        )
        .unwrap();
        let mut surface = SurfaceState::new(config);
        assert_eq!(surface.policy(), RefreshPolicy::Incremental);
        assert_eq!(surface.required_sources(), [SourceId::from("MUNI")]);

        surface.selection = Some(SourceId::from("BART"));
        assert_eq!(surface.required_sources(), [SourceId::from("BART")]);
    }

    #[test]
    fn test_resolve_prefers_any_success() {
        let surface = SurfaceState::new(widget());
        let mut results = BTreeMap::new();
        results.insert(
            SourceId::from("MUNI"),
            SourceResult::TransportFailure("timeout".into()),
        );
        results.insert(SourceId::from("BART"), SourceResult::Success(vec![]));
        assert_eq!(surface.resolve(&results), Phase::Visible);

        results.insert(
            SourceId::from("BART"),
            SourceResult::ParseFailure("bad".into()),
        );
        assert_eq!(
            surface.resolve(&results),
            Phase::Error("Error fetching data: timeout".into())
        );
    }
}
