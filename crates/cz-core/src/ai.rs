//! The AI service: the DigitalOcean agent when configured, OpenRouter
//! otherwise or when the agent fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cz_backend::{sanitize, AgentClient, BackendError, ChatBackend, OpenRouterClient, ThinkFilter};
use cz_protocol::{ChatRequest, StreamEvent};
use futures::StreamExt;
use thiserror::Error;

use crate::config::Config;
use crate::metrics::Metrics;

#[derive(Debug, Error)]
pub enum AiError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{backend}: {message}")]
    Stream { backend: String, message: String },
}

pub struct AiService {
    primary: Option<Box<dyn ChatBackend>>,
    fallback: Box<dyn ChatBackend>,
    metrics: Arc<Metrics>,
}

impl AiService {
    pub fn new(
        primary: Option<Box<dyn ChatBackend>>,
        fallback: Box<dyn ChatBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            primary,
            fallback,
            metrics,
        }
    }

    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Result<Self, BackendError> {
        let timeout = Duration::from_secs(config.openrouter.timeout_secs);

        let primary: Option<Box<dyn ChatBackend>> = if config.agent.is_enabled() {
            let url = config.agent.url.as_deref().unwrap_or_default();
            let key = config.agent.key.clone().unwrap_or_default();
            tracing::info!(url, "DigitalOcean agent enabled");
            Some(Box::new(AgentClient::new(url, key, timeout)?))
        } else {
            tracing::info!("DigitalOcean agent disabled; using OpenRouter only");
            None
        };

        let api_key = config.openrouter.resolve_api_key().unwrap_or_default();
        if api_key.is_empty() {
            tracing::debug!("no OpenRouter API key resolved");
        }
        let fallback = OpenRouterClient::new(
            &config.openrouter.endpoint,
            api_key,
            &config.openrouter.model,
            timeout,
        )?;
        tracing::debug!(
            model = fallback.model(),
            endpoint = fallback.endpoint(),
            "OpenRouter fallback configured"
        );

        Ok(Self::new(primary, Box::new(fallback), metrics))
    }

    /// Ask and wait for the whole answer.
    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest::from_prompt(prompt);
        if let Some(answer) = self.ask_primary(&request).await {
            return Ok(answer);
        }

        let backend = self.fallback.as_ref();
        let started = Instant::now();
        let result = backend.complete(&request).await;
        self.metrics
            .record_ai_request(backend.name(), started.elapsed());

        match result {
            Ok(text) => Ok(sanitize(&text)),
            Err(e) => {
                self.metrics.record_ai_failure(backend.name());
                tracing::error!(backend = backend.name(), error = %e, "AI request failed");
                Err(e.into())
            }
        }
    }

    /// Ask and hand visible answer text to `sink` as it arrives.
    ///
    /// Only the fallback streams; an agent answer arrives in one piece.
    /// Returns the full visible answer.
    pub async fn ask_streaming(
        &self,
        prompt: &str,
        mut sink: impl FnMut(&str),
    ) -> Result<String, AiError> {
        let request = ChatRequest::from_prompt(prompt);
        if let Some(answer) = self.ask_primary(&request).await {
            sink(&answer);
            return Ok(answer);
        }

        let backend = self.fallback.as_ref();
        let started = Instant::now();
        let mut filter = ThinkFilter::new();
        let mut answer = String::new();
        let mut failure = None;

        let mut emit = |text: String| {
            if !text.is_empty() {
                sink(&text);
                answer.push_str(&text);
            }
        };

        let mut events = backend.stream(&request);
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::TextDelta(text) => emit(filter.push(&text)),
                StreamEvent::ThinkingDelta(_) => {}
                StreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    tracing::debug!(input_tokens, output_tokens, "token usage");
                }
                StreamEvent::Done => break,
                StreamEvent::Error(message) => {
                    failure = Some(message);
                    break;
                }
            }
        }
        drop(events);
        emit(filter.finish());

        self.metrics
            .record_ai_request(backend.name(), started.elapsed());

        if let Some(message) = failure {
            self.metrics.record_ai_failure(backend.name());
            tracing::error!(backend = backend.name(), error = %message, "AI stream failed");
            return Err(AiError::Stream {
                backend: backend.name().to_string(),
                message,
            });
        }

        Ok(answer)
    }

    /// Try the agent. `None` means fall back.
    async fn ask_primary(&self, request: &ChatRequest) -> Option<String> {
        let primary = self.primary.as_deref()?;
        let started = Instant::now();
        let result = primary.complete(request).await;
        self.metrics
            .record_ai_request(primary.name(), started.elapsed());

        match result {
            Ok(text) => {
                let text = sanitize(&text);
                if !text.is_empty() {
                    return Some(text);
                }
                tracing::warn!(
                    backend = primary.name(),
                    "empty answer, falling back to {}",
                    self.fallback.name()
                );
            }
            Err(e) => {
                self.metrics.record_ai_failure(primary.name());
                tracing::warn!(
                    backend = primary.name(),
                    error = %e,
                    "request failed, falling back to {}",
                    self.fallback.name()
                );
            }
        }

        self.metrics.record_fallback();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cz_backend::mock::fixtures;
    use cz_backend::MockBackend;

    fn service(
        primary: Option<MockBackend>,
        fallback: MockBackend,
    ) -> (AiService, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let primary = primary.map(|p| Box::new(p) as Box<dyn ChatBackend>);
        (
            AiService::new(primary, Box::new(fallback), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn agent_answer_wins() {
        let (svc, metrics) = service(
            Some(MockBackend::new("agent").with_text("<think>hm</think>\n use sudo ")),
            MockBackend::new("openrouter").with_text("unused"),
        );
        assert_eq!(svc.ask("q").await.unwrap(), "use sudo");
        assert_eq!(metrics.ai_request_count("agent"), 1);
        assert_eq!(metrics.ai_request_count("openrouter"), 0);
        assert_eq!(metrics.fallback_count(), 0);
    }

    #[tokio::test]
    async fn agent_error_falls_back() {
        let (svc, metrics) = service(
            Some(MockBackend::new("agent").with_error("503")),
            MockBackend::new("openrouter").with_text("try again"),
        );
        assert_eq!(svc.ask("q").await.unwrap(), "try again");
        assert_eq!(metrics.ai_failure_count("agent"), 1);
        assert_eq!(metrics.fallback_count(), 1);
        assert_eq!(metrics.ai_request_count("openrouter"), 1);
    }

    #[tokio::test]
    async fn empty_agent_answer_falls_back() {
        let (svc, metrics) = service(
            Some(MockBackend::new("agent").with_text("<think>only thoughts</think>")),
            MockBackend::new("openrouter").with_text("answer"),
        );
        assert_eq!(svc.ask("q").await.unwrap(), "answer");
        assert_eq!(metrics.ai_failure_count("agent"), 0);
        assert_eq!(metrics.fallback_count(), 1);
    }

    #[tokio::test]
    async fn no_agent_uses_openrouter_sanitized() {
        let fallback = MockBackend::new("openrouter")
            .with_reply(fixtures::inline_think("reasoning", "chmod +x run.sh"));
        let (svc, metrics) = service(None, fallback);
        assert_eq!(svc.ask("q").await.unwrap(), "chmod +x run.sh");
        assert_eq!(metrics.fallback_count(), 0);
    }

    #[tokio::test]
    async fn openrouter_failure_is_error() {
        let (svc, metrics) = service(None, MockBackend::new("openrouter").with_error("401"));
        let err = svc.ask("q").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(metrics.ai_failure_count("openrouter"), 1);
    }

    #[tokio::test]
    async fn streaming_filters_think_spans() {
        let fallback = MockBackend::new("openrouter")
            .with_reply(fixtures::inline_think("let me see", "Run `npm ci`."));
        let (svc, _) = service(None, fallback);

        let mut seen = String::new();
        let answer = svc
            .ask_streaming("q", |chunk| seen.push_str(chunk))
            .await
            .unwrap();
        assert_eq!(answer, "Run `npm ci`.");
        assert_eq!(seen, "Run `npm ci`.");
    }

    #[tokio::test]
    async fn streaming_uses_agent_answer_whole() {
        let (svc, _) = service(
            Some(MockBackend::new("agent").with_text("whole answer")),
            MockBackend::new("openrouter"),
        );
        let mut chunks = Vec::new();
        let answer = svc
            .ask_streaming("q", |c| chunks.push(c.to_string()))
            .await
            .unwrap();
        assert_eq!(answer, "whole answer");
        assert_eq!(chunks, ["whole answer"]);
    }

    #[tokio::test]
    async fn streaming_error_mid_stream() {
        let fallback = MockBackend::new("openrouter")
            .with_reply(fixtures::error_mid_stream("partial ", "connection reset"));
        let (svc, metrics) = service(None, fallback);

        let mut seen = String::new();
        let err = svc
            .ask_streaming("q", |c| seen.push_str(c))
            .await
            .unwrap_err();
        // Trailing whitespace is only shown once more text follows it.
        assert_eq!(seen, "partial");
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(metrics.ai_failure_count("openrouter"), 1);
    }
}
