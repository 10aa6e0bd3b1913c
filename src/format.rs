//! Text rendering for display slots.
//!
//! Relative times are computed from the record's arrival instant at render
//! time, so redisplaying a cached result never shows frozen minute counts.

use chrono::{DateTime, Utc};

use crate::arrival::ArrivalRecord;
use crate::source::{DisplayFields, SourceResult};

pub const NO_DATA: &str = "No data available";
pub const INVALID_RESPONSE: &str = "Invalid JSON response";
pub const PLACEHOLDER: &str = "N/A";

/// Text destined for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSlot {
    pub text: String,
    pub is_error: bool,
}

impl RenderedSlot {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// `Line: <ref>`, optionally followed by ` / <destination>`.
pub fn record_label(record: &ArrivalRecord, fields: DisplayFields) -> String {
    match (fields, record.destination.as_deref()) {
        (DisplayFields::LineAndDestination, Some(destination)) => {
            format!("Line: {} / {}", record.line_ref, destination)
        }
        _ => format!("Line: {}", record.line_ref),
    }
}

pub fn format_record(record: &ArrivalRecord, fields: DisplayFields, now: DateTime<Utc>) -> String {
    format!(
        "{}\n{} minutes away\n",
        record_label(record, fields),
        record.minutes_away_at(now)
    )
}

/// All records in feed order, separated by blank lines.
pub fn format_arrivals(
    records: &[ArrivalRecord],
    fields: DisplayFields,
    now: DateTime<Utc>,
) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }

    records
        .iter()
        .map(|record| format_record(record, fields, now))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User-facing text for a failed result, `None` on success.
pub fn failure_text(result: &SourceResult) -> Option<String> {
    match result {
        SourceResult::Success(_) => None,
        SourceResult::ParseFailure(_) => Some(INVALID_RESPONSE.to_string()),
        SourceResult::TransportFailure(message) => Some(format!("Error fetching data: {message}")),
    }
}

/// Renders a result for a slot showing either the whole list (`rank` is
/// `None`) or the record at `rank`, with [`PLACEHOLDER`] when it is missing.
pub fn render_slot(
    result: &SourceResult,
    rank: Option<usize>,
    fields: DisplayFields,
    now: DateTime<Utc>,
) -> RenderedSlot {
    if let Some(text) = failure_text(result) {
        return RenderedSlot::error(text);
    }

    let records = result.arrivals().unwrap_or_default();
    match rank {
        None => RenderedSlot::ok(format_arrivals(records, fields, now)),
        Some(rank) => match records.get(rank) {
            Some(record) => RenderedSlot::ok(format_record(record, fields, now)),
            None => RenderedSlot::ok(PLACEHOLDER),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T17:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(line: &str, destination: Option<&str>, minutes: i64) -> ArrivalRecord {
        let arrival = (now() + Duration::minutes(minutes)).fixed_offset();
        ArrivalRecord::new(
            line.to_string(),
            destination.map(str::to_string),
            arrival,
            now(),
        )
    }

    #[test]
    fn test_single_record_block() {
        let text = format_arrivals(&[record("38", None, 7)], DisplayFields::Line, now());
        assert_eq!(text, "Line: 38\n7 minutes away\n");
    }

    #[test]
    fn test_records_separated_by_blank_line() {
        let records = [record("38", None, 7), record("14", None, 12)];
        let text = format_arrivals(&records, DisplayFields::Line, now());
        assert_eq!(
            text,
            "Line: 38\n7 minutes away\n\nLine: 14\n12 minutes away\n"
        );
    }

    #[test]
    fn test_empty_list_is_no_data() {
        assert_eq!(format_arrivals(&[], DisplayFields::Line, now()), NO_DATA);
    }

    #[test]
    fn test_destination_only_when_requested() {
        let r = record("N", Some("Ocean Beach"), 3);
        assert_eq!(record_label(&r, DisplayFields::Line), "Line: N");
        assert_eq!(
            record_label(&r, DisplayFields::LineAndDestination),
            "Line: N / Ocean Beach"
        );

        let no_dest = record("N", None, 3);
        assert_eq!(
            record_label(&no_dest, DisplayFields::LineAndDestination),
            "Line: N"
        );
    }

    #[test]
    fn test_render_uses_render_time() {
        let result = SourceResult::Success(vec![record("38", None, 7)]);
        let later = now() + Duration::minutes(4);
        let slot = render_slot(&result, None, DisplayFields::Line, later);
        assert_eq!(slot.text, "Line: 38\n3 minutes away\n");
    }

    #[test]
    fn test_overdue_arrivals_are_negative() {
        let result = SourceResult::Success(vec![record("38", None, -2)]);
        let slot = render_slot(&result, Some(0), DisplayFields::Line, now());
        assert_eq!(slot.text, "Line: 38\n-2 minutes away\n");
    }

    #[test]
    fn test_missing_rank_is_placeholder() {
        let result = SourceResult::Success(vec![record("38", None, 7)]);
        let first = render_slot(&result, Some(0), DisplayFields::Line, now());
        let second = render_slot(&result, Some(1), DisplayFields::Line, now());

        assert_eq!(first.text, "Line: 38\n7 minutes away\n");
        assert_eq!(second, RenderedSlot::ok(PLACEHOLDER));

        let empty = SourceResult::Success(vec![]);
        assert_eq!(
            render_slot(&empty, Some(0), DisplayFields::Line, now()).text,
            PLACEHOLDER
        );
        assert_eq!(
            render_slot(&empty, None, DisplayFields::Line, now()).text,
            NO_DATA
        );
    }

    #[test]
    fn test_failures_render_fixed_text() {
        let parse = SourceResult::ParseFailure("JSON error: expected value at line 1".into());
        let slot = render_slot(&parse, None, DisplayFields::Line, now());
        assert_eq!(slot, RenderedSlot::error(INVALID_RESPONSE));

        let transport = SourceResult::TransportFailure("connection refused".into());
        let slot = render_slot(&transport, Some(1), DisplayFields::Line, now());
        assert_eq!(slot, RenderedSlot::error("Error fetching data: connection refused"));
    }
}
