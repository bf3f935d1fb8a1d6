//! LLM module - streaming chat-completion client abstraction

mod client;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod openai;
mod sse;

pub use client::{ByteStream, CompletionRequest, LlmClient, Message, Role};
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIClient};
pub use sse::{EventStream, StreamEvent, StreamEventDecoder, ToolCallDelta, decode_events};
