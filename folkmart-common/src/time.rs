//! Timestamp utilities
//!
//! Stored timestamps are RFC 3339 text, except scheduled session starts which
//! are kept as Unix milliseconds so interval arithmetic can run in SQL.

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix epoch milliseconds back into a UTC timestamp
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| Error::InvalidData(format!("Timestamp out of range: {}ms", millis)))
}

/// Parse an RFC 3339 column value
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidData(format!("Bad timestamp '{}': {}", value, e)))
}
