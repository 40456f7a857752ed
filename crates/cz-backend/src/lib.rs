//! cz-backend: LLM provider adapters for CmdZen.
//!
//! Every provider implements [`ChatBackend`], so the command layer can
//! chain a primary agent with a fallback without knowing which HTTP API
//! sits behind either one.

pub mod agent;
pub mod backend;
pub mod completion;
pub mod mock;
pub mod openrouter;
pub mod sanitize;
pub mod sse;

pub use agent::AgentClient;
pub use backend::{BackendError, ChatBackend};
pub use mock::{MockBackend, MockConfig, MockResponse};
pub use openrouter::OpenRouterClient;
pub use sanitize::{sanitize, ThinkFilter};
