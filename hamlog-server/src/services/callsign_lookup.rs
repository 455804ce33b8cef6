//! Cached callsign lookup
//!
//! Serves directory data from the local cache while it is fresh, refreshes
//! it from the directory otherwise, and degrades to an all-empty result
//! instead of failing.

use chrono::{DateTime, Duration, Utc};
use hamlog_common::callsign;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

use super::directory::DirectorySession;
use crate::db::callsign_cache::{self, CachedCallsign};

/// Cache entries younger than this are served without asking the directory
pub const CACHE_TTL_DAYS: i64 = 30;

/// Where a lookup result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Cache,
    Upstream,
    None,
}

/// Lookup result returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallsignLookup {
    pub callsign: String,
    pub name: Option<String>,
    pub qth: Option<String>,
    pub grid: Option<String>,
    pub dxcc: Option<String>,
    pub source: LookupSource,
}

impl CallsignLookup {
    fn empty(callsign: String) -> Self {
        Self {
            callsign,
            name: None,
            qth: None,
            grid: None,
            dxcc: None,
            source: LookupSource::None,
        }
    }

    fn from_cache(entry: CachedCallsign, source: LookupSource) -> Self {
        Self {
            callsign: entry.callsign,
            name: entry.name,
            qth: entry.qth,
            grid: entry.grid,
            dxcc: entry.dxcc,
            source,
        }
    }
}

/// Whether an entry cached at `cached_at` may still be served at `now`
pub fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at < Duration::days(CACHE_TTL_DAYS)
}

/// Cache-first lookup over the shared directory session
#[derive(Clone)]
pub struct CallsignLookupService {
    db: SqlitePool,
    session: Arc<DirectorySession>,
}

impl CallsignLookupService {
    pub fn new(db: SqlitePool, session: Arc<DirectorySession>) -> Self {
        Self { db, session }
    }

    /// Look up a callsign; never fails
    pub async fn lookup(&self, raw: &str) -> CallsignLookup {
        let call = callsign::normalize(raw);
        let now = Utc::now();

        match callsign_cache::get_cached(&self.db, &call).await {
            Ok(Some(entry)) if is_fresh(entry.cached_at, now) => {
                debug!(callsign = %call, "Callsign served from cache");
                return CallsignLookup::from_cache(entry, LookupSource::Cache);
            }
            Ok(Some(_)) => debug!(callsign = %call, "Cached callsign is stale"),
            Ok(None) => {}
            Err(e) => warn!(callsign = %call, error = %e, "Callsign cache read failed"),
        }

        let record = match self.session.lookup(&call).await {
            Ok(record) => record,
            Err(e) => {
                debug!(callsign = %call, error = %e, "Callsign not resolved");
                return CallsignLookup::empty(call);
            }
        };

        let entry = CachedCallsign {
            callsign: call,
            name: record.name,
            qth: record.qth,
            grid: record.grid,
            dxcc: record.dxcc,
            cached_at: now,
        };

        if let Err(e) = callsign_cache::upsert_cached(&self.db, &entry).await {
            warn!(callsign = %entry.callsign, error = %e, "Callsign cache write failed");
        }

        CallsignLookup::from_cache(entry, LookupSource::Upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        assert!(is_fresh(now, now));
        assert!(is_fresh(now - Duration::days(29), now));
        assert!(!is_fresh(now - Duration::days(30), now));
        assert!(!is_fresh(now - Duration::days(31), now));
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(LookupSource::Cache).unwrap(), "cache");
        assert_eq!(serde_json::to_value(LookupSource::Upstream).unwrap(), "upstream");
        assert_eq!(serde_json::to_value(LookupSource::None).unwrap(), "none");
    }
}
