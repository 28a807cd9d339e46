//! Timestamp flattening for stored records
//!
//! Rich timestamps are stored as unix milliseconds so record encoding
//! stays on primitive fields.

use chrono::{DateTime, Utc};

/// Flatten a timestamp to unix milliseconds.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Rebuild a timestamp from unix milliseconds.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
