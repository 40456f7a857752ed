//! Streaming events emitted by backends.

/// Events emitted during a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of reasoning text from the model.
    ThinkingDelta(String),

    /// A chunk of response text.
    TextDelta(String),

    /// Token usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Stream has completed successfully.
    Done,

    /// An error occurred during streaming.
    Error(String),
}

impl StreamEvent {
    /// True for events after which no more events follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error("boom".to_string()).is_terminal());
        assert!(!StreamEvent::TextDelta("x".to_string()).is_terminal());
        assert!(!StreamEvent::Usage {
            input_tokens: 1,
            output_tokens: 2
        }
        .is_terminal());
    }
}
