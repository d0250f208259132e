//! Timestamp generation/parsing and human-friendly duration formatting.
//!
//! Ported from the original's timestamp helpers. All `YYmmdd_HHMMSS` style
//! timestamps are in the `America/New_York` zone (DST-aware, unlike a fixed
//! UTC offset), which is why this crate pulls in `chrono-tz` on top of
//! `chrono`.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::America::New_York;

const TIMESTAMP_FMT: &str = "%y%m%d_%H%M%S";
const LEGACY_TIMESTAMP_FMT: &str = "%y%m%d%H%M%S";

/// Generate a `YYmmdd_HHMMSS` timestamp for "now" in `America/New_York`.
pub fn generate_timestamp() -> String {
    chrono::Utc::now()
        .with_timezone(&New_York)
        .format(TIMESTAMP_FMT)
        .to_string()
}

/// Parse a `YYmmdd_HHMMSS` or legacy 12-digit `YYmmddHHMMSS` timestamp,
/// interpreted in `America/New_York`, into a UTC unix-seconds value.
///
/// Returns `None` on any malformed input rather than propagating an error;
/// callers treat unparseable timestamps as "unknown age" and skip them.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, LEGACY_TIMESTAMP_FMT))
        .ok()?;

    New_York
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
}

/// Age in seconds between `parse_timestamp(s)` and now. `None` if `s` is
/// unparseable.
pub fn age_seconds(s: &str) -> Option<i64> {
    let then = parse_timestamp(s)?;
    Some((chrono::Utc::now().timestamp() - then).max(0))
}

/// Format a duration in seconds as `XhYmZs` / `YmZs` / `Zs`, dropping any
/// leading zero components.
pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_timestamp_round_trips() {
        let ts = generate_timestamp();
        assert!(parse_timestamp(&ts).is_some());
    }

    #[test]
    fn legacy_12_digit_timestamp_parses() {
        assert!(parse_timestamp("250101120000").is_some());
    }

    #[test]
    fn malformed_timestamp_returns_none() {
        assert!(parse_timestamp("not-a-timestamp").is_none());
        assert!(parse_timestamp("250101_99999").is_none());
    }

    #[test]
    fn format_duration_drops_leading_zero_components() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(65), "1m5s");
        assert_eq!(format_duration(3665), "1h1m5s");
        assert_eq!(format_duration(0), "0s");
    }

    #[test]
    fn dst_boundary_parses_consistently() {
        // 2025-03-09 is the US spring-forward date; 2:30am local doesn't
        // exist, so `.single()` must return None rather than panicking.
        assert!(parse_timestamp("250309_023000").is_none());
    }
}
