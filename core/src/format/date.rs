//! Calendar date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Local date-time layouts, tried in order. Interpreted as UTC.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts, tried in order. Midnight UTC.
const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a calendar date or date-time into milliseconds since the Unix epoch.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00+02:00`), RFC 2822
/// (`Mon, 15 Jan 2024 10:30:00 +0000`), ISO dates and date-times without an offset
/// (read as UTC), and the same with `/` separators. Surrounding whitespace is ignored.
///
/// ```
/// use auditor::format::parse_date;
///
/// assert_eq!(parse_date("2024-01-15"), Some(1_705_276_800_000));
/// assert_eq!(parse_date("2024-01-15T10:30:00Z"), Some(1_705_314_600_000));
/// assert_eq!(parse_date("2024-02-30"), None);
/// ```
#[must_use]
pub fn parse_date(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }

    if let Some(ndt) = DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
    {
        return Some(ndt.and_utc().timestamp_millis());
    }

    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().timestamp_millis())
}
