//! Callsign lookup cache
//!
//! One row per normalized callsign. Rows are overwritten in place on every
//! successful upstream lookup and never deleted here.

use chrono::{DateTime, Utc};
use hamlog_common::Result;
use sqlx::{Row, SqlitePool};

use super::parse_timestamp;

/// Last known directory data for a callsign
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCallsign {
    pub callsign: String,
    pub name: Option<String>,
    pub qth: Option<String>,
    pub grid: Option<String>,
    pub dxcc: Option<String>,
    pub cached_at: DateTime<Utc>,
}

/// Fetch the cache row for an already-normalized callsign
pub async fn get_cached(pool: &SqlitePool, callsign: &str) -> Result<Option<CachedCallsign>> {
    let row = sqlx::query(
        "SELECT callsign, name, qth, grid, dxcc, cached_at FROM callsign_cache WHERE callsign = ?",
    )
    .bind(callsign)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let cached_at: String = row.get("cached_at");
            Ok(Some(CachedCallsign {
                callsign: row.get("callsign"),
                name: row.get("name"),
                qth: row.get("qth"),
                grid: row.get("grid"),
                dxcc: row.get("dxcc"),
                cached_at: parse_timestamp("cached_at", &cached_at)?,
            }))
        }
        None => Ok(None),
    }
}

/// Insert or overwrite a cache row (last writer wins)
pub async fn upsert_cached(pool: &SqlitePool, entry: &CachedCallsign) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO callsign_cache (callsign, name, qth, grid, dxcc, cached_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(callsign) DO UPDATE SET
            name = excluded.name,
            qth = excluded.qth,
            grid = excluded.grid,
            dxcc = excluded.dxcc,
            cached_at = excluded.cached_at
        "#,
    )
    .bind(&entry.callsign)
    .bind(&entry.name)
    .bind(&entry.qth)
    .bind(&entry.grid)
    .bind(&entry.dxcc)
    .bind(entry.cached_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}
