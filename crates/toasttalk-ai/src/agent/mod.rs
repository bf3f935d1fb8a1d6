//! Agent module - the streamed conversation loop
//!
//! 1. Stream - send the history and tool descriptions, forward text live
//! 2. Act - execute finished tool calls, or `run_` code blocks in the answer
//! 3. Observe - append the results to the history
//! 4. Repeat until the model answers in plain text or the turn limit hits

mod accumulator;
mod orchestrator;
mod stream;

pub use accumulator::{DeltaOutcome, ToolCallAccumulator};
pub use orchestrator::{
    ConversationOrchestrator, ConversationState, DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT,
    OrchestratorConfig, ToolExecution, TurnOutcome, run_conversation,
};
pub use stream::{ChannelSink, ConversationEvent, ConversationSink, NullSink};
