//! Error types for the AI module

use thiserror::Error;
use toasttalk_traits::ToolError;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    /// The completion endpoint answered with a non-success status.
    #[error("LLM request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Conversation did not settle within {0} model requests")]
    ConversationLoopLimitExceeded(usize),

    #[error("Conversation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Whether the error came from reaching the model endpoint at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_) | Self::Stream(_))
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
