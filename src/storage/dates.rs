//! Textual date formats used by the snapshot file.
//!
//! - Calendar dates are written as ISO-8601 `YYYY-MM-DD`. On read a full
//!   ISO date-time is also accepted and truncated to its date part.
//! - `Created_at` is local wall-clock time as `YYYY-MM-DD HH:MM:SS`.
//! - `last_modified` is written as `YYYY-MM-DDTHH:MM:SS`; fractional
//!   seconds are accepted on read.

use chrono::{NaiveDate, NaiveDateTime};

/// Format for `Created_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format for `last_modified`.
pub const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an ISO-8601 calendar date, tolerating a trailing time component.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    parse_timestamp(s).map(|dt| dt.date())
}

/// Parse a date the way tabular imports write them.
///
/// Accepts everything `parse_iso_date` does plus `YYYY/MM/DD` and
/// month-first `M/D/YYYY`.
pub fn parse_loose_date(s: &str) -> Option<NaiveDate> {
    parse_iso_date(s).or_else(|| {
        ["%Y/%m/%d", "%m/%d/%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok())
    })
}

/// Parse a local timestamp in any of the formats the snapshot may contain.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    [
        TIMESTAMP_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        ISO_TIMESTAMP_FORMAT,
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Serde adapter for `NaiveDate` fields stored as `YYYY-MM-DD`.
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_iso_date(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 date: {}", s)))
    }
}

/// Serde adapter for `Created_at`.
pub mod local_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        ts: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(super::TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", s)))
    }
}

/// Serde adapter for `last_modified`.
pub mod optional_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        ts: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => {
                serializer.serialize_str(&ts.format(super::ISO_TIMESTAMP_FORMAT).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", s))),
            None => Ok(None),
        }
    }
}
