//! Table-level queries. Every function takes a borrowed connection so
//! callers decide between the writer, a pooled reader, or a transaction.

pub mod features;
pub mod feedback;
pub mod logs;
pub mod patterns;
pub mod profiles;
pub mod runs;

use chrono::{DateTime, NaiveDate, Utc};
use jarvis_core::errors::StorageError;

pub(crate) fn to_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_ms(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StorageError::Serialization {
        message: format!("timestamp out of range: {ms}"),
    })
}

pub(crate) fn parse_day(day: &str) -> Result<NaiveDate, StorageError> {
    day.parse().map_err(|e| StorageError::Serialization {
        message: format!("bad date '{day}': {e}"),
    })
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(StorageError::serialization)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(StorageError::serialization)
}
