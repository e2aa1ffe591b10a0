//! Second-granularity timestamps as they travel on the wire.
//!
//! The message endpoints report `createdAt`/`updatedAt` either as integer
//! epoch seconds or as RFC 3339 strings. Both are normalised to epoch seconds.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

/// Parse a textual timestamp: either digits or an RFC 3339 date.
///
/// # Errors
/// Returns a description of the problem when the value is neither.
pub fn parse_seconds(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(seconds);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.timestamp())
        .map_err(|err| format!("invalid timestamp `{trimmed}`: {err}"))
}

/// Serde adapter for required timestamp fields.
pub mod seconds {
    use super::{Deserialize, Deserializer, RawTimestamp, Serializer, de, parse_seconds};

    /// Serialize epoch seconds as an integer.
    ///
    /// # Errors
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(*value)
    }

    /// Deserialize integer, fractional, or RFC 3339 timestamps into epoch seconds.
    ///
    /// # Errors
    /// Fails when the value is not a recognised timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Seconds(seconds) => Ok(seconds),
            #[allow(clippy::cast_possible_truncation)]
            RawTimestamp::Fractional(seconds) => Ok(seconds.floor() as i64),
            RawTimestamp::Text(text) => parse_seconds(&text).map_err(de::Error::custom),
        }
    }
}

/// Serde adapter for optional timestamp fields.
pub mod seconds_opt {
    use super::{Deserialize, Deserializer, RawTimestamp, Serializer, de, parse_seconds};

    /// Serialize optional epoch seconds.
    ///
    /// # Errors
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(seconds) => serializer.serialize_some(seconds),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional timestamp; `null` maps to `None`.
    ///
    /// # Errors
    /// Fails when a present value is not a recognised timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawTimestamp::Seconds(seconds)) => Ok(Some(seconds)),
            #[allow(clippy::cast_possible_truncation)]
            Some(RawTimestamp::Fractional(seconds)) => Ok(Some(seconds.floor() as i64)),
            Some(RawTimestamp::Text(text)) => {
                parse_seconds(&text).map(Some).map_err(de::Error::custom)
            }
        }
    }
}
