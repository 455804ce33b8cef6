//! Hosted completion model client (Anthropic Messages API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Timeout for a single completion request
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model API error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected model reply: {0}")]
    InvalidReply(String),
}

/// A model that turns a system prompt plus one user message into text
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, system: &str, user_text: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text blocks of a reply
fn reply_text(response: MessagesResponse) -> Result<String, CompletionError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        Err(CompletionError::InvalidReply("no text content".to_string()))
    } else {
        Ok(text)
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        base_url: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CompletionModel for AnthropicClient {
    async fn complete(&self, system: &str, user_text: &str) -> Result<String, CompletionError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user_text,
            }],
        };

        debug!(model = %self.model, chars = user_text.len(), "Sending completion request");

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Model API returned error");
            return Err(CompletionError::Api(status.as_u16(), body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidReply(e.to_string()))?;

        reply_text(parsed)
    }
}
