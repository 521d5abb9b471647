//! tolerant timestamp parsing.
//!
//! sqlite files touched by multiple writers over the years carry datetimes
//! in several dialects: RFC 3339 with or without fractional seconds, and
//! space-separated forms with a timezone suffix. Reads must accept them all.

use chrono::{DateTime, NaiveDateTime, Utc};

const SPACE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// parse a timestamp in any of the accepted dialects, normalized to UTC.
///
/// trailing go monotonic-clock suffixes (`" m=+0.000"`) are stripped before
/// parsing. Naive forms are interpreted as UTC.
pub fn parse_flexible_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let mut value = value.trim();
    if let Some(idx) = value.find(" m=") {
        value = value[..idx].trim_end();
    }
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for layout in SPACE_LAYOUTS {
        if let Ok(parsed) = DateTime::parse_from_str(value, layout) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(parsed.and_utc());
        }
    }

    None
}

/// serde deserializer for optional timestamps in any accepted dialect.
pub fn deserialize_flexible_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_flexible_timestamp(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("unsupported datetime format: {raw:?}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_variants() {
        assert!(parse_flexible_timestamp("2026-03-01T12:30:00Z").is_some());
        assert!(parse_flexible_timestamp("2026-03-01T12:30:00.123456789Z").is_some());
        assert!(parse_flexible_timestamp("2026-03-01T12:30:00+02:00").is_some());
    }

    #[test]
    fn parses_space_separated_with_offset() {
        let a = parse_flexible_timestamp("2026-03-01 12:30:00 +0000").unwrap();
        let b = parse_flexible_timestamp("2026-03-01 12:30:00.5+00:00").unwrap();
        assert_eq!(a.date_naive(), b.date_naive());
    }

    #[test]
    fn parses_naive_as_utc() {
        let t = parse_flexible_timestamp("2026-03-01 12:30:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2026-03-01T12:30:00+00:00");
    }

    #[test]
    fn strips_go_monotonic_suffix() {
        let t = parse_flexible_timestamp("2026-03-01 12:30:00 +0000 m=+1.234");
        assert!(t.is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible_timestamp("").is_none());
        assert!(parse_flexible_timestamp("yesterday").is_none());
    }

    #[test]
    fn serde_helper_accepts_all_dialects() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(default, deserialize_with = "super::deserialize_flexible_opt")]
            at: Option<DateTime<Utc>>,
        }

        let w: Wrapper = serde_json::from_str(r#"{"at": "2026-03-01 12:30:00 +0000"}"#).unwrap();
        assert!(w.at.is_some());

        let w: Wrapper = serde_json::from_str(r#"{}"#).unwrap();
        assert!(w.at.is_none());

        assert!(serde_json::from_str::<Wrapper>(r#"{"at": "whenever"}"#).is_err());
    }
}
