//! Database access layer for folkmart-api
//!
//! Functions take any SQLite executor so the booking workflow can run them
//! inside a transaction and handlers can run them on the pool.

use folkmart_common::{Error, Result};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::UnknownVariant;

pub mod artists;
pub mod sessions;
pub mod users;

/// Decode a TEXT uuid column
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::InvalidData(format!("{} is not a UUID ('{}'): {}", column, value, e)))
}

/// Decode a TEXT enum column
pub(crate) fn parse_enum<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse::<T>()
        .map_err(|e| Error::InvalidData(e.to_string()))
}

/// True when the error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => db_err
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false),
        _ => false,
    }
}
