//! Cell coercion helpers.
//!
//! Everything that turns a raw spreadsheet cell into a typed value lives here
//! so the ingest stages can treat `None` as "drop or default" and nothing else.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Cell values that mean "nothing here" in spreadsheet exports.
const NAN_LIKE: &[&str] = &["nan", "none", "na", "n/a", "null", "nat"];

/// Parse a numeric cell while being forgiving about export noise.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"120mm"`, `"NA"`).
/// - Strips thousands separators before parsing.
/// - Returns `None` for non-finite results.
pub fn parse_number(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let v = s.replace(',', "").parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Incentive acreage: unparsable becomes 0, negatives clip to 0.
pub fn parse_acres(s: Option<&str>) -> f64 {
    parse_number(s).map(|v| v.max(0.0)).unwrap_or(0.0)
}

/// Parse a date or date-time cell. Date-only values land at midnight.
pub fn parse_timestamp(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    ["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Canonical pipe identifier, or `None` for blank and nan-like cells.
///
/// Numeric codes that went through a float column (`"10028.0"`) are folded
/// back to their integer spelling so registry and readings agree.
pub fn normalize_pipe_id(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() || NAN_LIKE.contains(&s.to_ascii_lowercase().as_str()) {
        return None;
    }
    if let Some(int_part) = s.strip_suffix(".0") {
        if !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit()) {
            return Some(int_part.to_string());
        }
    }
    Some(s.to_string())
}

/// Text cell with a fallback for blank or nan-like values.
pub fn text_or(s: Option<&str>, fallback: &str) -> String {
    match s.map(str::trim) {
        Some(v) if !v.is_empty() && !NAN_LIKE.contains(&v.to_ascii_lowercase().as_str()) => {
            v.to_string()
        }
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_forgiving() {
        assert_eq!(parse_number(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_number(Some("80")), Some(80.0));
        assert_eq!(parse_number(Some("120mm")), None);
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_parse_acres_clips_and_defaults() {
        assert_eq!(parse_acres(Some("-3")), 0.0);
        assert_eq!(parse_acres(Some("abc")), 0.0);
        assert_eq!(parse_acres(Some("7.5")), 7.5);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();
        assert_eq!(parse_timestamp(Some("2025-06-17")).unwrap().date(), d);
        assert_eq!(parse_timestamp(Some("06/17/2025")).unwrap().date(), d);
        assert_eq!(parse_timestamp(Some("17-Jun-2025")).unwrap().date(), d);
        assert_eq!(
            parse_timestamp(Some("2025-06-17 14:30:00")).unwrap().date(),
            d
        );
        assert!(parse_timestamp(Some("yesterday")).is_none());
        assert!(parse_timestamp(Some("2025-13-01")).is_none());
    }

    #[test]
    fn test_normalize_pipe_id() {
        assert_eq!(normalize_pipe_id(Some(" 10028A1 ")).as_deref(), Some("10028A1"));
        assert_eq!(normalize_pipe_id(Some("10028.0")).as_deref(), Some("10028"));
        assert_eq!(normalize_pipe_id(Some("A.0")).as_deref(), Some("A.0"));
        assert_eq!(normalize_pipe_id(Some("nan")), None);
        assert_eq!(normalize_pipe_id(Some("  ")), None);
        assert_eq!(normalize_pipe_id(None), None);
    }
}
