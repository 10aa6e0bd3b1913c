//! Source and surface configuration.
//!
//! Stored as a JSON object on disk:
//! ```json
//! {
//!   "sources": [
//!     { "id": "MUNI", "url": "https://my-stop.app/real-time-arrivals/15567/SF" }
//!   ],
//!   "surfaces": [
//!     { "id": "app", "selection": "MUNI", "slots": [{ "id": "arrivals" }] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::display::{RefreshPolicy, SlotBinding, SlotId, SurfaceConfig, SurfaceId};
use crate::source::{Source, SourceId};

pub const MUNI_URL: &str = "https://my-stop.app/real-time-arrivals/15567/SF";
pub const BART_URL: &str = "https://my-stop.app/real-time-arrivals/24TH/BA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub sources: Vec<Source>,
    pub surfaces: Vec<SurfaceConfig>,
}

impl Default for Config {
    /// MUNI and BART sources, an `app` surface following the selected
    /// agency and a two-slot `widget` for the next two MUNI arrivals.
    fn default() -> Self {
        let slot = |id: &str, source: Option<&str>, rank: Option<usize>| SlotBinding {
            id: SlotId::from(id),
            source: source.map(SourceId::from),
            rank,
        };

        Self {
            sources: vec![Source::new("MUNI", MUNI_URL), Source::new("BART", BART_URL)],
            surfaces: vec![
                SurfaceConfig {
                    id: SurfaceId::from("app"),
                    refresh: RefreshPolicy::Incremental,
                    selection: Some(SourceId::from("MUNI")),
                    slots: vec![slot("arrivals", None, None)],
                },
                SurfaceConfig {
                    id: SurfaceId::from("widget"),
                    refresh: RefreshPolicy::Atomic,
                    selection: None,
                    slots: vec![
                        slot("first", Some("MUNI"), Some(0)),
                        slot("second", Some("MUNI"), Some(1)),
                    ],
                },
            ],
        }
    }
}

impl Config {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ids are unique and every slot resolves to a configured source.
    pub fn validate(&self) -> Result<()> {
        let mut source_ids = HashSet::new();
        for source in &self.sources {
            if !source_ids.insert(&source.id) {
                bail!("duplicate source id '{}'", source.id);
            }
        }

        let mut surface_ids = HashSet::new();
        for surface in &self.surfaces {
            if !surface_ids.insert(&surface.id) {
                bail!("duplicate surface id '{}'", surface.id);
            }
            if surface.slots.is_empty() {
                bail!("surface '{}' has no slots", surface.id);
            }

            let mut slot_ids = HashSet::new();
            for slot in &surface.slots {
                if !slot_ids.insert(&slot.id) {
                    bail!("duplicate slot id '{}' on surface '{}'", slot.id, surface.id);
                }
                match slot.source.as_ref().or(surface.selection.as_ref()) {
                    Some(id) if source_ids.contains(id) => {}
                    Some(id) => bail!(
                        "slot '{}' on surface '{}' refers to unknown source '{}'",
                        slot.id,
                        surface.id,
                        id
                    ),
                    None => bail!(
                        "slot '{}' on surface '{}' follows the selection but the surface has none",
                        slot.id,
                        surface.id
                    ),
                }
            }
        }

        Ok(())
    }

    pub fn source(&self, id: &SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| &s.id == id)
    }
}
