//! OpenRouter chat completion client, with optional SSE streaming.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use cz_protocol::{ChatRequest, StreamEvent};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;

use crate::backend::{BackendError, ChatBackend};
use crate::completion::{extract_content, process_chunk, CompletionRequest};
use crate::sse::sse_events;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const DONE_SENTINEL: &str = "[DONE]";

/// Build an HTTP client with the request timeout and connection limits used
/// by every backend.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, BackendError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()?)
}

/// OpenRouter API client.
pub struct OpenRouterClient {
    endpoint: String,
    api_key: String,
    model: String,
    http: Client,
}

impl OpenRouterClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            http: build_http_client(timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::NotConfigured("OpenRouter API key"));
        }

        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            stream: stream.then_some(true),
        };

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, stream, "openrouter request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("{status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let raw = self.post(request, false).await?.text().await?;
        tracing::debug!(raw = %raw, "openrouter raw response");

        // A body without choices is shown as-is rather than swallowed.
        Ok(extract_content(&raw)?.unwrap_or(raw))
    }

    fn stream<'a>(&'a self, request: &'a ChatRequest) -> BoxStream<'a, StreamEvent> {
        Box::pin(stream! {
            let response = match self.post(request, true).await {
                Ok(r) => r,
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                    return;
                }
            };

            let events = sse_events(response.bytes_stream());
            futures::pin_mut!(events);

            while let Some(result) = events.next().await {
                match result {
                    Ok(event) => {
                        if event.data.trim() == DONE_SENTINEL {
                            yield StreamEvent::Done;
                            return;
                        }
                        for stream_event in process_chunk(&event.data) {
                            let terminal = stream_event.is_terminal();
                            yield stream_event;
                            if terminal {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield StreamEvent::Error(format!("Stream error: {e}"));
                        return;
                    }
                }
            }

            // Some proxies close the stream without the sentinel.
            yield StreamEvent::Done;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client =
            OpenRouterClient::new(DEFAULT_ENDPOINT, "", DEFAULT_MODEL, Duration::from_secs(5))
                .unwrap();
        let err = client
            .complete(&ChatRequest::from_prompt("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn missing_key_streams_error() {
        let client =
            OpenRouterClient::new(DEFAULT_ENDPOINT, "", DEFAULT_MODEL, Duration::from_secs(5))
                .unwrap();
        let request = ChatRequest::from_prompt("q");
        let events: Vec<_> = client.stream(&request).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error(ref m) if m.contains("not configured")));
    }

    #[test]
    fn accessors() {
        let client = OpenRouterClient::new(
            "http://localhost:9/v1/chat/completions",
            "k",
            "meta/llama",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.model(), "meta/llama");
        assert_eq!(client.endpoint(), "http://localhost:9/v1/chat/completions");
        assert_eq!(client.name(), "openrouter");
    }
}
