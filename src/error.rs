use chrono::NaiveDate;
use thiserror::Error;

/// A single date of a tracked range that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub reason: String,
}

/// Errors produced by the flight data core.
///
/// The type is `Clone` so a failed single-flight fetch can be handed to every
/// caller that was waiting on the same cache key.
#[derive(Debug, Clone, Error)]
pub enum FlightError {
    #[error("upstream API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
    #[error("malformed flight record: {reason}")]
    MalformedRecord { reason: String },
    #[error("{} of the requested dates failed to fetch", .failed.len())]
    RangeFetchPartialFailure { failed: Vec<DateFailure> },
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("configuration error: {0}")]
    Config(String),
}

impl FlightError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FlightError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::upstream(Some(status.as_u16()), err.to_string()),
            None if err.is_decode() => Self::Decode(err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type FlightResult<T> = Result<T, FlightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_includes_status() {
        let err = FlightError::upstream(Some(429), "rate limit reached");
        assert_eq!(err.to_string(), "upstream API error (429): rate limit reached");

        let err = FlightError::upstream(None, "no body");
        assert_eq!(err.to_string(), "upstream API error: no body");
    }

    #[test]
    fn test_partial_failure_display_counts_dates() {
        let err = FlightError::RangeFetchPartialFailure {
            failed: vec![DateFailure {
                date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
                reason: "timeout".to_string(),
            }],
        };
        assert_eq!(err.to_string(), "1 of the requested dates failed to fetch");
    }
}
