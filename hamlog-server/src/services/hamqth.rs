//! HamQTH XML directory client
//!
//! Two calls against a single endpoint:
//! - `?u=USER&p=PASS` returns `<session><session_id>`
//! - `?id=SESSION&callsign=CALL&prg=HamLog` returns `<search>`
//!
//! Failures come back as `<session><error>`. An error mentioning the session
//! means the id has expired; anything else (e.g. "Callsign not found") is final.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::directory::{DirectoryApi, DirectoryError, DirectoryRecord};

/// Fixed timeout for every HamQTH request
pub const HAMQTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Program name reported to HamQTH
const PROGRAM_NAME: &str = "HamLog";

const USER_AGENT: &str = concat!("HamLog/", env!("CARGO_PKG_VERSION"));

/// Root `<HamQTH>` element
///
/// Element names are matched by local name within the HamQTH default namespace.
#[derive(Debug, Default, Deserialize)]
struct HamQthReply {
    #[serde(default)]
    session: Option<SessionElement>,
    #[serde(default)]
    search: Option<SearchElement>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionElement {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchElement {
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    adr_name: Option<String>,
    #[serde(default)]
    qth: Option<String>,
    #[serde(default)]
    grid: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

fn parse_reply(xml: &str) -> Result<HamQthReply, DirectoryError> {
    quick_xml::de::from_str(xml).map_err(|e| DirectoryError::Malformed(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn classify_error(message: String) -> DirectoryError {
    if message.to_lowercase().contains("session") {
        DirectoryError::SessionExpired(message)
    } else {
        DirectoryError::Upstream(message)
    }
}

/// Extract the session id from an authentication reply
pub fn parse_auth_reply(xml: &str) -> Result<String, DirectoryError> {
    let session = parse_reply(xml)?
        .session
        .ok_or_else(|| DirectoryError::Malformed("missing <session>".to_string()))?;

    if let Some(error) = non_blank(session.error) {
        return Err(DirectoryError::Upstream(error));
    }

    non_blank(session.session_id)
        .ok_or_else(|| DirectoryError::Malformed("missing <session_id>".to_string()))
}

/// Extract the callsign record from a search reply
pub fn parse_search_reply(xml: &str) -> Result<DirectoryRecord, DirectoryError> {
    let reply = parse_reply(xml)?;

    if let Some(error) = reply.session.and_then(|s| non_blank(s.error)) {
        return Err(classify_error(error));
    }

    let search = reply
        .search
        .ok_or_else(|| DirectoryError::Malformed("missing <search>".to_string()))?;

    Ok(DirectoryRecord {
        name: non_blank(search.nick).or_else(|| non_blank(search.adr_name)),
        qth: non_blank(search.qth),
        grid: non_blank(search.grid),
        dxcc: non_blank(search.country),
    })
}

/// HamQTH API client
pub struct HamQthClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HamQthClient {
    /// Create a client; `credentials = None` makes every authentication fail
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HAMQTH_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            credentials,
        })
    }

    async fn get(&self, query: &[(&str, &str)]) -> Result<String, DirectoryError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Network(format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))
    }
}

#[async_trait]
impl DirectoryApi for HamQthClient {
    async fn authenticate(&self) -> Result<String, DirectoryError> {
        let (user, pass) = self
            .credentials
            .as_ref()
            .ok_or(DirectoryError::MissingCredentials)?;

        let body = self.get(&[("u", user.as_str()), ("p", pass.as_str())]).await?;
        parse_auth_reply(&body)
    }

    async fn fetch(
        &self,
        session_id: &str,
        callsign: &str,
    ) -> Result<DirectoryRecord, DirectoryError> {
        debug!(callsign = %callsign, "Querying HamQTH");

        let body = self
            .get(&[
                ("id", session_id),
                ("callsign", callsign),
                ("prg", PROGRAM_NAME),
            ])
            .await?;
        parse_search_reply(&body)
    }
}
