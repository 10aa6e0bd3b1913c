//! JSON parser for stop-monitoring arrival feeds.
//!
//! The feed nests its visits under
//! `ServiceDelivery.StopMonitoringDelivery.MonitoredStopVisit[*]`. Parsing is
//! strict: a missing key, a wrong type or one bad timestamp fails the whole
//! batch.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::arrival::ArrivalRecord;
use crate::error::ParseError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FeedEnvelope {
    service_delivery: ServiceDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceDelivery {
    stop_monitoring_delivery: StopMonitoringDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StopMonitoringDelivery {
    monitored_stop_visit: Vec<MonitoredStopVisit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MonitoredStopVisit {
    monitored_vehicle_journey: MonitoredVehicleJourney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MonitoredVehicleJourney {
    line_ref: String,
    destination_name: Option<String>,
    monitored_call: MonitoredCall,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MonitoredCall {
    expected_arrival_time: String,
}

/// Parses a feed body into arrival records, in feed order.
///
/// An empty visit list is a valid result, not an error.
///
/// # Errors
///
/// Returns [`ParseError`] if the body is not JSON of the expected shape or if
/// any visit carries an unparseable arrival timestamp.
pub fn parse_arrivals(body: &str, now: DateTime<Utc>) -> Result<Vec<ArrivalRecord>, ParseError> {
    // Some feed servers prefix the body with a UTF-8 byte-order mark.
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let envelope: FeedEnvelope = serde_json::from_str(body)?;

    envelope
        .service_delivery
        .stop_monitoring_delivery
        .monitored_stop_visit
        .into_iter()
        .map(|visit| -> Result<ArrivalRecord, ParseError> {
            let journey = visit.monitored_vehicle_journey;
            let expected = parse_timestamp(&journey.monitored_call.expected_arrival_time)?;
            Ok(ArrivalRecord::new(
                journey.line_ref,
                journey.destination_name,
                expected,
                now,
            ))
        })
        .collect()
}

/// Parses an offset-qualified ISO-8601 timestamp.
///
/// A trailing bracketed region id, as in `...-07:00[America/Los_Angeles]`, is
/// accepted; the numeric offset decides the instant.
fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = match value.find('[') {
        Some(start) if value.ends_with(']') => &value[..start],
        _ => value,
    };

    DateTime::parse_from_rfc3339(trimmed).map_err(|source| ParseError::Timestamp {
        value: value.to_string(),
        source,
    })
}
