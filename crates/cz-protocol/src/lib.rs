//! cz-protocol: Shared types and message definitions for CmdZen.
//!
//! This crate defines the chat types passed from the command layer to the
//! LLM backends, and the events the backends stream back.

pub mod chat;
pub mod message;

pub use chat::{ChatMessage, ChatRequest, Role};
pub use message::StreamEvent;
