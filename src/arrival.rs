//! Normalized arrival records and relative-time calculation.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

/// One predicted vehicle arrival at a stop.
///
/// `minutes_away` is the value observed at parse time. Rendering code should
/// call [`ArrivalRecord::minutes_away_at`] so cached records do not go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalRecord {
    pub line_ref: String,
    pub destination: Option<String>,
    pub expected_arrival: DateTime<FixedOffset>,
    pub minutes_away: i64,
}

impl ArrivalRecord {
    pub fn new(
        line_ref: String,
        destination: Option<String>,
        expected_arrival: DateTime<FixedOffset>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            minutes_away: minutes_away(expected_arrival, observed_at),
            line_ref,
            destination,
            expected_arrival,
        }
    }

    /// Minutes until arrival as seen from `now`.
    pub fn minutes_away_at(&self, now: DateTime<Utc>) -> i64 {
        minutes_away(self.expected_arrival, now)
    }
}

/// Whole minutes from `now` until `expected`, truncated toward zero.
///
/// Negative once the arrival is at least a minute in the past. Not clamped.
pub fn minutes_away(expected: DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    (expected.with_timezone(&Utc) - now).num_minutes()
}
