//! RFC-3339 parsing and formatting helpers.
//!
//! All database writes are RFC-3339 UTC strings and all bucket math uses
//! UTC. Offsets are accepted on input and normalized away; dates are plain
//! ISO `YYYY-MM-DD`. Local wall-clock handling belongs to the callers that
//! own a user-facing edge, not to this crate.

use chrono::{DateTime, NaiveDate, Utc};

/// Raised for malformed timestamp or date strings.
#[derive(thiserror::Error, Debug)]
pub enum TimeError {
    /// Not a valid RFC-3339 timestamp.
    #[error("bad rfc3339 timestamp: {0}")]
    BadTimestamp(String),
    /// Not a valid ISO `YYYY-MM-DD` date.
    #[error("bad iso date: {0}")]
    BadDate(String),
}

/// RFC-3339 with any offset -> UTC.
///
/// Example: "2024-03-10T09:30:00-05:00" -> 2024-03-10T14:30:00Z.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>, TimeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeError::BadTimestamp(s.to_string()))
}

/// Format a UTC datetime as RFC-3339 with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| TimeError::BadDate(s.to_string()))
}

/// Format a date as ISO `YYYY-MM-DD`. Lexicographic order matches
/// chronological order, which the range queries rely on.
pub fn date_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_offset_to_utc() {
        let got = parse_utc("2024-03-10T09:30:00-05:00").expect("parse");
        let want = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn format_then_parse_is_identity() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
        assert_eq!(parse_utc(&to_rfc3339_millis(t)).unwrap(), t);
    }

    #[test]
    fn bad_inputs_error() {
        assert!(parse_utc("yesterday").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn date_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date(&date_str(d)).unwrap(), d);
    }
}
