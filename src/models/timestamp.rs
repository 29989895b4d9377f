//! Freeze time handling
//!
//! Beads are ordered by their freeze time, a zone-aware timestamp. The
//! canonical text form is compact ISO 8601 with microseconds and offset,
//! e.g. `20160704T162800000000+0200`; it is used in archive file names and in
//! every persisted structure.

use crate::error::{BeadError, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};

/// Zone-aware timestamp. Comparison and equality are by instant.
pub type Timestamp = DateTime<FixedOffset>;

/// `strftime` pattern of the compact form
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%6f%z";

/// Current time with the local offset
pub fn timestamp() -> Timestamp {
    Local::now().fixed_offset()
}

/// Format a timestamp in the compact form
pub fn format_timestamp(time: &Timestamp) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse the compact form strictly
///
/// # Errors
///
/// Returns `BeadError::Timestamp` if `text` is not in the compact form.
pub fn time_from_timestamp(text: &str) -> Result<Timestamp> {
    DateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| BeadError::Timestamp(format!("{:?}: {}", text, e)))
}

/// Parse a timestamp given by a human
///
/// Accepted forms, tried in order:
/// - compact form (`20160704T162800000000+0200`)
/// - RFC 3339 (`2016-07-04T16:28:00+02:00`)
/// - `2016-07-04 16:28:00+0200`
/// - bare date (`2016-07-04`), taken as midnight UTC
pub fn time_from_user(text: &str) -> Result<Timestamp> {
    let text = text.trim();
    if let Ok(time) = time_from_timestamp(text) {
        return Ok(time);
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time);
    }
    if let Ok(time) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(time);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().fixed_offset());
        }
    }
    Err(BeadError::Timestamp(format!(
        "could not interpret {:?} as a time",
        text
    )))
}

/// serde adapter storing timestamps in the compact form
pub mod serde_timestamp {
    use super::{format_timestamp, time_from_timestamp, Timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Timestamp, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        time_from_timestamp(&text).map_err(serde::de::Error::custom)
    }

    /// Same as the parent module, for optional fields
    pub mod option {
        use super::super::{format_timestamp, time_from_timestamp, Timestamp};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(
            time: &Option<Timestamp>,
            serializer: S,
        ) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match time {
                Some(time) => serializer.serialize_some(&format_timestamp(time)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(
            deserializer: D,
        ) -> std::result::Result<Option<Timestamp>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text: Option<String> = Option::deserialize(deserializer)?;
            text.map(|text| time_from_timestamp(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
