//! DigitalOcean GenAI agent client.
//!
//! The agent exposes an OpenAI-compatible endpoint under its own base URL
//! and answers with a model fixed at agent creation time.

use std::time::Duration;

use async_trait::async_trait;
use cz_protocol::ChatRequest;
use reqwest::Client;

use crate::backend::{BackendError, ChatBackend};
use crate::completion::{extract_content, AgentCompletionRequest};
use crate::openrouter::build_http_client;
use crate::sanitize::sanitize;

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

pub struct AgentClient {
    url: String,
    key: String,
    http: Client,
}

impl AgentClient {
    pub fn new(
        base_url: impl AsRef<str>,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base = base_url.as_ref().trim_end_matches('/');
        Ok(Self {
            url: format!("{base}{COMPLETIONS_PATH}"),
            key: key.into(),
            http: build_http_client(timeout)?,
        })
    }

    /// Full completions URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatBackend for AgentClient {
    fn name(&self) -> &str {
        "agent"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.key)
            .json(&AgentCompletionRequest::new(&request.messages))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("{status}: {body}")));
        }

        let raw = response.text().await?;
        tracing::debug!(raw = %raw, "agent raw response");

        let content = extract_content(&raw)?.unwrap_or(raw);
        Ok(sanitize(&content))
    }
}
