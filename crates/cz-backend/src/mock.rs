//! Mock backend for testing.
//!
//! Produces the same `StreamEvent` sequence as the HTTP adapters, so the
//! service and command layers are tested without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use cz_protocol::{ChatRequest, StreamEvent};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::time::sleep;

use crate::backend::{BackendError, ChatBackend};

/// One scripted step of a mock reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit a thinking delta.
    Thinking { content: String },
    /// Emit a text delta.
    Text { content: String },
    /// Emit usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },
    /// Emit an error. Ends the reply.
    Error { message: String },
    /// Delay before the next step.
    Delay { ms: u64 },
}

/// A scripted reply: the steps answering one request.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub responses: Vec<MockResponse>,
    /// Optional delay between each step (ms).
    pub chunk_delay_ms: Option<u64>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }
}

/// Create a stream of events from a scripted reply.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = StreamEvent> {
    stream! {
        for response in config.responses {
            if let Some(delay_ms) = config.chunk_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match response {
                MockResponse::Thinking { content } => {
                    yield StreamEvent::ThinkingDelta(content);
                }
                MockResponse::Text { content } => {
                    yield StreamEvent::TextDelta(content);
                }
                MockResponse::Usage { input_tokens, output_tokens } => {
                    yield StreamEvent::Usage { input_tokens, output_tokens };
                }
                MockResponse::Error { message } => {
                    yield StreamEvent::Error(message);
                    return;
                }
                MockResponse::Delay { ms } => {
                    sleep(Duration::from_millis(ms)).await;
                }
            }
        }

        yield StreamEvent::Done;
    }
}

/// A backend that answers each request with the next scripted reply.
pub struct MockBackend {
    name: String,
    replies: Mutex<VecDeque<MockConfig>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a scripted reply.
    pub fn with_reply(self, reply: MockConfig) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }

    /// Queue a reply that is a single text chunk.
    pub fn with_text(self, text: &str) -> Self {
        self.with_reply(fixtures::streaming_text(&[text]))
    }

    /// Queue a reply that fails immediately.
    pub fn with_error(self, message: &str) -> Self {
        self.with_reply(MockConfig::new().with_responses(vec![MockResponse::Error {
            message: message.to_string(),
        }]))
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last user message of every request received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self, request: &ChatRequest) -> Option<MockConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = request.messages.last() {
            self.prompts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(last.content.clone());
        }
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let reply = self
            .next_reply(request)
            .ok_or_else(|| BackendError::Api("mock script exhausted".to_string()))?;

        let mut text = String::new();
        let events = mock_stream(reply);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::TextDelta(t) => text.push_str(&t),
                StreamEvent::Error(message) => return Err(BackendError::Api(message)),
                _ => {}
            }
        }
        Ok(text)
    }

    fn stream<'a>(&'a self, request: &'a ChatRequest) -> BoxStream<'a, StreamEvent> {
        match self.next_reply(request) {
            Some(reply) => Box::pin(mock_stream(reply)),
            None => Box::pin(futures::stream::once(async {
                StreamEvent::Error("mock script exhausted".to_string())
            })),
        }
    }
}

/// Built-in replies for common scenarios.
pub mod fixtures {
    use super::*;

    /// A reply that streams text in the given chunks.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let responses = chunks
            .iter()
            .map(|chunk| MockResponse::Text {
                content: (*chunk).to_string(),
            })
            .collect();

        MockConfig::new().with_responses(responses)
    }

    /// A reply from a reasoning model that inlines its thoughts.
    pub fn inline_think(thinking: &str, answer: &str) -> MockConfig {
        streaming_text(&["<think>", thinking, "</think>\n\n", answer])
    }

    /// A reply that errors after some text.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: text_before.to_string(),
            },
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }
}
