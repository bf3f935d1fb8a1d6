//! Toast Talk AI - streamed, tool-using conversation engine
//!
//! This crate provides:
//! - OpenAI-compatible streaming chat client and SSE event decoder
//! - Tool-call reassembly from streamed fragments
//! - Conversation orchestrator that runs tools and `run_` code blocks
//!   until the model settles on an answer
//! - Built-in public transit route tool backed by transport.rest

pub mod agent;
pub mod error;
mod http_client;
pub mod llm;
pub mod prompt;
pub mod tools;

// Re-export commonly used types
pub use agent::{
    ChannelSink, ConversationEvent, ConversationOrchestrator, ConversationSink, ConversationState,
    NullSink, OrchestratorConfig, ToolExecution, TurnOutcome, run_conversation,
};
pub use error::{AiError, Result};
pub use llm::{CompletionRequest, LlmClient, Message, OpenAIClient, Role, StreamEvent};
#[cfg(any(test, feature = "test-utils"))]
pub use llm::{MockLlmClient, MockStep};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use tools::{TransitRouteTool, TransportRestClient, default_registry};
