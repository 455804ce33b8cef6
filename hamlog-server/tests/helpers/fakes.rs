//! Scripted stand-ins for the upstream services

use async_trait::async_trait;
use hamlog_server::services::{
    CompletionError, CompletionModel, DirectoryApi, DirectoryError, DirectoryRecord,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Directory fake: replays queued fetch results, counts calls
#[derive(Default)]
pub struct FakeDirectory {
    pub auth_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    auth_fails: bool,
    fetch_results: Mutex<VecDeque<Result<DirectoryRecord, DirectoryError>>>,
}

impl FakeDirectory {
    pub fn with_results(results: Vec<Result<DirectoryRecord, DirectoryError>>) -> Self {
        Self {
            fetch_results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    /// A directory whose authentication always fails
    pub fn unreachable() -> Self {
        Self {
            auth_fails: true,
            ..Default::default()
        }
    }

    pub fn auth_count(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectory {
    async fn authenticate(&self) -> Result<String, DirectoryError> {
        let n = self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fails {
            return Err(DirectoryError::Network("connection refused".to_string()));
        }
        Ok(format!("session-{}", n + 1))
    }

    async fn fetch(
        &self,
        _session_id: &str,
        _callsign: &str,
    ) -> Result<DirectoryRecord, DirectoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DirectoryError::Upstream("Callsign not found".to_string())))
    }
}

/// Completion model fake: returns a fixed reply and records prompts
pub struct FakeModel {
    reply: Result<String, u16>,
    pub calls: AtomicUsize,
    pub last_user_text: Mutex<Option<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_user_text: Mutex::new(None),
        }
    }

    /// A model whose API answers with the given HTTP status
    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
            last_user_text: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CompletionModel for FakeModel {
    async fn complete(&self, system: &str, user_text: &str) -> Result<String, CompletionError> {
        assert!(!system.is_empty());
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_text.lock().unwrap() = Some(user_text.to_string());

        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(CompletionError::Api(*status, "overloaded".to_string())),
        }
    }
}
