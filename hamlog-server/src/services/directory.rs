//! Callsign directory session management
//!
//! The upstream directory hands out a session id on authentication and
//! expects it on every lookup. [`DirectorySession`] owns that id:
//!
//! ```text
//! {no session} --authenticate--> {active} --fetch--> record
//!                                    |
//!                       session expired: invalidate, authenticate, fetch once more
//! ```
//!
//! The id lives behind a `std::sync::RwLock` that is never held across an
//! `.await`; concurrent callers may authenticate redundantly, which is harmless.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Directory lookup failures
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory credentials not configured")]
    MissingCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed directory reply: {0}")]
    Malformed(String),

    /// Session id rejected; a fresh authentication may fix it
    #[error("Directory session expired: {0}")]
    SessionExpired(String),

    /// Any other upstream-reported error (e.g. callsign not found)
    #[error("Directory error: {0}")]
    Upstream(String),
}

/// Fields the directory knows about a callsign
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryRecord {
    pub name: Option<String>,
    pub qth: Option<String>,
    pub grid: Option<String>,
    pub dxcc: Option<String>,
}

/// Raw directory protocol
///
/// Implemented by the HamQTH client and by fakes in tests.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Obtain a new session id
    async fn authenticate(&self) -> Result<String, DirectoryError>;

    /// Look up `callsign` (already normalized) under `session_id`
    async fn fetch(&self, session_id: &str, callsign: &str)
        -> Result<DirectoryRecord, DirectoryError>;
}

/// Process-wide directory session
pub struct DirectorySession {
    api: Arc<dyn DirectoryApi>,
    session_id: RwLock<Option<String>>,
}

impl DirectorySession {
    pub fn new(api: Arc<dyn DirectoryApi>) -> Self {
        Self {
            api,
            session_id: RwLock::new(None),
        }
    }

    /// Current session id, authenticating first if there is none
    pub async fn get_or_authenticate(&self) -> Result<String, DirectoryError> {
        if let Some(id) = self.current() {
            return Ok(id);
        }

        let id = self.api.authenticate().await?;
        info!("Authenticated with callsign directory");
        if let Ok(mut guard) = self.session_id.write() {
            *guard = Some(id.clone());
        }
        Ok(id)
    }

    /// Forget the current session id
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.session_id.write() {
            *guard = None;
        }
    }

    fn current(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|guard| guard.clone())
    }

    /// Fetch a record, re-authenticating once if the session has expired
    ///
    /// Only [`DirectoryError::SessionExpired`] triggers the retry; every
    /// other error is returned immediately.
    pub async fn lookup(&self, callsign: &str) -> Result<DirectoryRecord, DirectoryError> {
        let session_id = self.get_or_authenticate().await?;

        match self.api.fetch(&session_id, callsign).await {
            Err(DirectoryError::SessionExpired(reason)) => {
                warn!(callsign = %callsign, reason = %reason, "Directory session expired, re-authenticating");
                self.invalidate();
                let session_id = self.get_or_authenticate().await?;
                self.api.fetch(&session_id, callsign).await
            }
            other => {
                if let Err(ref e) = other {
                    debug!(callsign = %callsign, error = %e, "Directory lookup failed");
                }
                other
            }
        }
    }
}
