//! The provider-neutral backend interface.

use async_stream::stream;
use async_trait::async_trait;
use cz_protocol::{ChatRequest, StreamEvent};
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// A chat completion provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short provider name, used in logs and metric labels.
    fn name(&self) -> &str;

    /// Send the request and wait for the full answer.
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError>;

    /// Send the request and stream the answer.
    ///
    /// Providers without a streaming API get this default, which emits the
    /// whole answer as one text delta.
    fn stream<'a>(&'a self, request: &'a ChatRequest) -> BoxStream<'a, StreamEvent> {
        Box::pin(stream! {
            match self.complete(request).await {
                Ok(text) => {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta(text);
                    }
                    yield StreamEvent::Done;
                }
                Err(e) => yield StreamEvent::Error(e.to_string()),
            }
        })
    }
}
