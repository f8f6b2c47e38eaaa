//! Timestamp parsing for API payloads.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ApiError;

/// Format used by the API for `created_at` fields.
const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an API timestamp such as `2024-01-01T10:00:00Z` as a UTC instant.
///
/// Only the exact second-precision `Z` form is accepted; fractional seconds,
/// offsets and trailing characters are rejected.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ApiError> {
    NaiveDateTime::parse_from_str(value, API_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ApiError::InvalidTimestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_utc_timestamp() {
        let parsed = parse_timestamp("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_other_formats() {
        for value in [
            "",
            "2024-01-01",
            "2024-01-01T10:00:00",
            "2024-01-01T10:00:00+02:00",
            "2024-01-01T10:00:00.123Z",
            "2024-01-01T10:00:00Zjunk",
            "2024-13-01T10:00:00Z",
        ] {
            assert!(
                matches!(parse_timestamp(value), Err(ApiError::InvalidTimestamp(_))),
                "accepted {value:?}"
            );
        }
    }
}
