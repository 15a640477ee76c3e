//! Timestamp encoding shared with subscriber bots.
//!
//! Bots parse `expires_at` with the fixed pattern `%Y-%m-%dT%H:%M:%S.%fZ`
//! (six fractional digits, literal `Z`), so RFC 3339 with offsets is not
//! accepted on their side.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse either the bot wire format or RFC 3339.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `#[serde(with = "zeitfrei_types::wire::timestamp")]`
pub mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_has_six_fraction_digits() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:05.000000Z");
    }

    #[test]
    fn test_parse_accepts_both_formats() {
        let wire = parse_timestamp("2024-03-01T12:30:05.250000Z").unwrap();
        let rfc = parse_timestamp("2024-03-01T12:30:05.25+00:00").unwrap();
        assert_eq!(wire, rfc);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
