//! Error types for the fetch and parse stages of a source pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// A transport-level failure while fetching a feed body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    /// Failure reported by a non-reqwest transport.
    #[error("{0}")]
    Network(String),
}

/// A feed body that does not have the expected stop-monitoring shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid arrival timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "HTTP 503 Service Unavailable");
    }

    #[test]
    fn test_invalid_url_display() {
        let err = FetchError::InvalidUrl {
            url: "not a url".into(),
            reason: "relative URL without a base".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid feed URL not a url: relative URL without a base"
        );
    }

    #[test]
    fn test_parse_error_from_json_error() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{\"truncated\":");
        let err: ParseError = result.unwrap_err().into();
        assert!(matches!(err, ParseError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_timestamp_error_mentions_value() {
        let source = chrono::DateTime::parse_from_rfc3339("soon").unwrap_err();
        let err = ParseError::Timestamp {
            value: "soon".into(),
            source,
        };
        assert!(err.to_string().contains("\"soon\""));
    }
}
