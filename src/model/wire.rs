//! Serde helpers for decoding backend payloads
//!
//! The backend is inconsistent about nulls, timestamp formats and response
//! wrapping. These helpers absorb that once, so the rest of the crate only
//! sees canonical values.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;

/// Deserialize a value that may be `null`, falling back to `T::default()`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a list, skipping entries that fail to decode
///
/// `null` or a non-array value decodes to an empty list. Each skipped entry is
/// logged.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            warn!("Expected a list, got {}; treating as empty", other);
            return Ok(Vec::new());
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(
                    "Skipping undecodable {} entry: {}",
                    std::any::type_name::<T>().rsplit("::").next().unwrap_or("list"),
                    e
                );
                None
            }
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

/// Deserialize an optional timestamp given as text or Unix milliseconds
///
/// Unparseable values decode to `None` instead of failing the whole payload.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawTimestamp::Text(text)) => parse_timestamp(&text),
        Some(RawTimestamp::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
        None => None,
    })
}

/// Parse a backend timestamp
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, `...+07:00`) and naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` / `YYYY-MM-DD HH:MM:SS`, which are taken as
/// local time.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(text, &Local)
}

/// Parse a backend timestamp, reading naive values in `tz`
pub fn parse_timestamp_in<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Response body that may or may not be wrapped in `{ "data": ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// `{ "data": T }` (or `{ "Data": T }`)
    Wrapped {
        /// Wrapped payload
        #[serde(alias = "Data")]
        data: T,
    },
    /// Bare payload
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap the payload regardless of shape
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(data) => data,
        }
    }
}
