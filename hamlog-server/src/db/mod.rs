//! Repository functions over the shared SQLite pool
//!
//! Schema lives in `hamlog_common::db`; these modules only read and write it.

pub mod callsign_cache;
pub mod qsos;
pub mod tokens;
pub mod users;

use chrono::{DateTime, Utc};
use hamlog_common::{Error, Result};
use uuid::Uuid;

/// Parse an RFC 3339 column value
pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Parse a UUID column value
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
