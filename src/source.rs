//! Feed sources and the outcome of one fetch-and-parse cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arrival::ArrivalRecord;

/// Identifies a configured feed source, e.g. `"MUNI"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which arrival fields a source's slots show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFields {
    #[default]
    Line,
    LineAndDestination,
}

/// A feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub url: String,
    #[serde(default)]
    pub display_fields: DisplayFields,
}

impl Source {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(id),
            url: url.into(),
            display_fields: DisplayFields::default(),
        }
    }

    pub fn with_display_fields(mut self, fields: DisplayFields) -> Self {
        self.display_fields = fields;
        self
    }
}

/// Outcome of one source's fetch-and-parse cycle.
///
/// Failure reasons are kept for logging; users see fixed placeholder text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResult {
    /// Arrivals in feed order. May be empty.
    Success(Vec<ArrivalRecord>),
    ParseFailure(String),
    TransportFailure(String),
}

impl SourceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceResult::Success(_))
    }

    pub fn arrivals(&self) -> Option<&[ArrivalRecord]> {
        match self {
            SourceResult::Success(records) => Some(records),
            _ => None,
        }
    }
}
