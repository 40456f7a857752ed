//! OpenAI-compatible chat completion wire types.
//!
//! Both OpenRouter and the DigitalOcean agent speak this dialect, so the
//! request bodies and the response extraction live here.

use cz_protocol::{ChatMessage, StreamEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for `POST .../chat/completions` on OpenRouter.
#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Body for the DigitalOcean agent endpoint.
///
/// The agent has a fixed model, so no `model` field; the `include_*`
/// switches keep retrieval and guardrail metadata out of the answer.
#[derive(Debug, Serialize)]
pub(crate) struct AgentCompletionRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub include_functions_info: bool,
    pub include_retrieval_info: bool,
    pub include_guardrails_info: bool,
}

impl<'a> AgentCompletionRequest<'a> {
    pub fn new(messages: &'a [ChatMessage]) -> Self {
        Self {
            messages,
            stream: false,
            include_functions_info: false,
            include_retrieval_info: false,
            include_guardrails_info: false,
        }
    }
}

/// Pull `choices[0].message.content` out of a raw completion body.
///
/// Returns `Ok(None)` when the body has no choices, so callers can fall back
/// to showing the raw body. A choice without textual content yields an empty
/// string.
pub fn extract_content(raw: &str) -> Result<Option<String>, serde_json::Error> {
    let root: Value = serde_json::from_str(raw)?;
    let first = match root.get("choices").and_then(Value::as_array) {
        Some(choices) if !choices.is_empty() => &choices[0],
        _ => return Ok(None),
    };
    let content = first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(Some(content.to_string()))
}

/// One `data:` payload of an OpenAI-style streaming response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamChunk {
    choices: Vec<ChunkChoice>,
    usage: Option<ChunkUsage>,
    error: Option<ChunkError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkDelta {
    content: Option<String>,
    reasoning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkError {
    message: String,
}

/// Translate one streaming chunk into protocol events.
///
/// Unparseable chunks are dropped; providers interleave keep-alive payloads
/// that are not completion chunks.
pub fn process_chunk(data: &str) -> Vec<StreamEvent> {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let mut events = Vec::new();

    if let Some(error) = chunk.error {
        events.push(StreamEvent::Error(error.message));
        return events;
    }

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(reasoning) = choice.delta.reasoning.filter(|r| !r.is_empty()) {
            events.push(StreamEvent::ThinkingDelta(reasoning));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::TextDelta(content));
        }
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Use sudo."}},{"message":{"content":"ignored"}}]}"#;
        assert_eq!(extract_content(raw).unwrap().as_deref(), Some("Use sudo."));
    }

    #[test]
    fn extract_without_choices_is_none() {
        assert_eq!(extract_content(r#"{"id":"x"}"#).unwrap(), None);
        assert_eq!(extract_content(r#"{"choices":[]}"#).unwrap(), None);
    }

    #[test]
    fn extract_null_content_is_empty() {
        let raw = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(extract_content(raw).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn extract_invalid_json_errors() {
        assert!(extract_content("<html>502</html>").is_err());
    }

    #[test]
    fn openrouter_body_shape() {
        let messages = vec![ChatMessage::user("hello")];
        let body = CompletionRequest {
            model: "openai/gpt-4o-mini",
            messages: &messages,
            stream: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "openai/gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn agent_body_disables_extras() {
        let messages = vec![ChatMessage::user("hello")];
        let json = serde_json::to_value(AgentCompletionRequest::new(&messages)).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["include_functions_info"], false);
        assert_eq!(json["include_retrieval_info"], false);
        assert_eq!(json["include_guardrails_info"], false);
        assert!(json.get("model").is_none());
    }

    #[test]
    fn chunk_with_content() {
        let events = process_chunk(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#);
        assert_eq!(events, vec![StreamEvent::TextDelta("Hel".to_string())]);
    }

    #[test]
    fn chunk_with_reasoning_and_content() {
        let events = process_chunk(
            r#"{"choices":[{"delta":{"reasoning":"hmm","content":"ok"}}]}"#,
        );
        assert_eq!(
            events,
            vec![
                StreamEvent::ThinkingDelta("hmm".to_string()),
                StreamEvent::TextDelta("ok".to_string())
            ]
        );
    }

    #[test]
    fn chunk_with_usage() {
        let events = process_chunk(
            r#"{"choices":[{"delta":{}}],"usage":{"prompt_tokens":12,"completion_tokens":40}}"#,
        );
        assert_eq!(
            events,
            vec![StreamEvent::Usage {
                input_tokens: 12,
                output_tokens: 40
            }]
        );
    }

    #[test]
    fn chunk_with_error() {
        let events = process_chunk(r#"{"error":{"message":"rate limited","code":429}}"#);
        assert_eq!(events, vec![StreamEvent::Error("rate limited".to_string())]);
    }

    #[test]
    fn garbage_chunk_is_dropped() {
        assert!(process_chunk("not json").is_empty());
    }
}
