//! Error types for tools and external collaborators.

use thiserror::Error;

/// Failures surfaced by tool lookup, argument parsing and execution.
///
/// The orchestrator never propagates these; each one becomes the content of
/// a tool-role turn so the model can react to it.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Tool {name} timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed(reason.into())
    }
}

impl From<CollaboratorError> for ToolError {
    fn from(err: CollaboratorError) -> Self {
        Self::ExecutionFailed(err.to_string())
    }
}

/// Failures reported by location and routing collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no stop found near ({latitude}, {longitude})")]
    NoNearbyStop { latitude: f64, longitude: f64 },
}

/// Result type alias for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;
