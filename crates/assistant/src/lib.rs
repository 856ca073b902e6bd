//! Staff assistant: a Groq chat model allowed to call station lookup tools.
//!
//! [`Assistant::respond`] runs a bounded loop. Each round asks the model for a
//! reply; tool calls in that reply are executed through a [`ToolBox`] and their
//! output is fed back until the model answers in plain text.

mod assistant;
mod groq;
pub mod messages;
mod tools;

use thiserror::Error;

pub use assistant::{
    validate_history, Assistant, AssistantReply, ConversationTurn, UserContext, FALLBACK_REPLY,
    MAX_HISTORY_MESSAGES, MAX_MESSAGE_CHARS,
};
pub use groq::{parse_retry_hint, retry_delay, ChatModel, GroqClient, DEFAULT_BACKOFF};
pub use messages::{ChatMessage, FunctionCall, Role, ToolCall, ToolDefinition};
pub use tools::{ToolBox, ToolError};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant is not configured")]
    NotConfigured,
    #[error("invalid conversation: {0}")]
    InvalidHistory(String),
    #[error("assistant is rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("assistant API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode assistant response: {0}")]
    Decode(String),
    #[error("assistant returned an empty response")]
    EmptyResponse,
}
