//! Conversation orchestrator: streams a model response, executes the tool
//! calls or `run_` code blocks it asks for, feeds the results back and
//! repeats until the model answers in plain text.

mod config;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toasttalk_sandbox::{CodeRunner, ExecutionResult, extract_code_blocks, format_feedback};
use toasttalk_traits::{ToolCallRecord, ToolError, ToolRegistry};
use uuid::Uuid;

pub use config::{DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT, OrchestratorConfig};

use crate::agent::accumulator::{DeltaOutcome, ToolCallAccumulator};
use crate::agent::stream::ConversationSink;
use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, StreamEvent, decode_events};
use crate::tools::summarize_tool_result;

const TOOL_CALLS_FINISH: &str = "tool_calls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Streaming,
    ExecutingTools,
    ExecutingCode,
}

/// One tool call and what came of it.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub call: ToolCallRecord,
    pub success: bool,
    /// Content of the tool-role turn appended for this call.
    pub content: String,
    pub summary: String,
}

/// Everything that happened while answering one user message.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub final_text: String,
    /// Streamed model requests issued.
    pub iterations: usize,
    pub tool_executions: Vec<ToolExecution>,
    pub code_results: Vec<ExecutionResult>,
    /// Full payloads tools attached for a display layer, in call order.
    pub presentations: Vec<Value>,
}

struct StreamedTurn {
    text: String,
    tool_calls: Vec<ToolCallRecord>,
}

/// Drives one conversation. Each instance owns its own history; run several
/// instances for independent sessions.
pub struct ConversationOrchestrator {
    session_id: Uuid,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    runner: Arc<CodeRunner>,
    config: OrchestratorConfig,
    history: Vec<Message>,
    state: ConversationState,
    last_presentation: Option<Value>,
    stop: CancellationToken,
}

impl ConversationOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        runner: Arc<CodeRunner>,
        config: OrchestratorConfig,
    ) -> Self {
        let history = vec![Message::system(config.system_prompt.clone())];
        Self {
            session_id: Uuid::new_v4(),
            llm,
            tools,
            runner,
            config,
            history,
            state: ConversationState::Idle,
            last_presentation: None,
            stop: CancellationToken::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Most recent full tool payload for a display layer.
    pub fn last_presentation(&self) -> Option<&Value> {
        self.last_presentation.as_ref()
    }

    /// Token that stops the `send` in flight: the stream read, the running
    /// tool and the running subprocess. A fresh token is issued once a
    /// stopped `send` returns, so fetch the handle per message.
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Drop everything but the system turn.
    pub fn reset(&mut self) {
        self.history.truncate(1);
        self.last_presentation = None;
        self.state = ConversationState::Idle;
        tracing::info!(
            category = "conversation",
            session = %self.session_id,
            "Conversation reset"
        );
    }

    /// Answer one user message, running tools and code until the model
    /// settles on a plain-text reply.
    pub async fn send(
        &mut self,
        content: impl Into<String>,
        sink: &mut dyn ConversationSink,
    ) -> Result<TurnOutcome> {
        if self.stop.is_cancelled() {
            self.stop = CancellationToken::new();
        }
        let cancel = self.stop.clone();
        let content = content.into();

        tracing::info!(
            category = "conversation",
            session = %self.session_id,
            chars = content.len(),
            "User message received"
        );
        self.history.push(Message::user(content));
        let checkpoint = self.history.len();

        let mut outcome = TurnOutcome::default();
        let result = self.drive(&cancel, sink, &mut outcome).await;
        self.state = ConversationState::Idle;

        match result {
            Ok(()) => {
                tracing::info!(
                    category = "conversation",
                    session = %self.session_id,
                    iterations = outcome.iterations,
                    tools = outcome.tool_executions.len(),
                    code_blocks = outcome.code_results.len(),
                    "Conversation settled"
                );
                Ok(outcome)
            }
            Err(AiError::Cancelled) => {
                // Keep the history valid for the next request: no dangling
                // tool calls without results.
                self.history.truncate(checkpoint);
                self.stop = CancellationToken::new();
                tracing::info!(category = "conversation", session = %self.session_id, "Stopped by user");
                Err(AiError::Cancelled)
            }
            Err(err) => {
                tracing::error!(
                    category = "conversation",
                    session = %self.session_id,
                    error = %err,
                    "Conversation turn failed"
                );
                Err(err)
            }
        }
    }

    async fn drive(
        &mut self,
        cancel: &CancellationToken,
        sink: &mut dyn ConversationSink,
        outcome: &mut TurnOutcome,
    ) -> Result<()> {
        loop {
            if outcome.iterations >= self.config.max_turns {
                return Err(AiError::ConversationLoopLimitExceeded(self.config.max_turns));
            }
            outcome.iterations += 1;

            self.state = ConversationState::Streaming;
            let turn = self.stream_turn(cancel, sink).await?;

            if !turn.tool_calls.is_empty() {
                self.state = ConversationState::ExecutingTools;
                self.history
                    .push(Message::assistant_with_tool_calls("", turn.tool_calls.clone()));

                for call in turn.tool_calls {
                    let (execution, presentation) = self.execute_tool(call, cancel, sink).await?;
                    self.history.push(Message::tool_result(
                        execution.call.id.clone(),
                        execution.content.clone(),
                    ));
                    if let Some(payload) = presentation {
                        self.last_presentation = Some(payload.clone());
                        outcome.presentations.push(payload);
                    }
                    outcome.tool_executions.push(execution);
                }
                continue;
            }

            let blocks = if self.config.execute_code {
                extract_code_blocks(&turn.text)
            } else {
                Vec::new()
            };

            if !blocks.is_empty() {
                self.state = ConversationState::ExecutingCode;
                self.history.push(Message::assistant(turn.text));

                tracing::info!(
                    category = "code_execution",
                    session = %self.session_id,
                    blocks = blocks.len(),
                    "Executing code blocks from response"
                );
                let results = self
                    .runner
                    .execute_all(&blocks, self.config.code_timeout, cancel)
                    .await;
                if cancel.is_cancelled() {
                    return Err(AiError::Cancelled);
                }

                for result in &results {
                    sink.on_code_executed(result).await;
                    if !result.is_success() {
                        sink.on_notice(&format!(
                            "{} block exited with code {}",
                            result.language, result.exit_code
                        ))
                        .await;
                    }
                }
                self.history.push(Message::user(format_feedback(&results)));
                outcome.code_results.extend(results);
                continue;
            }

            self.history.push(Message::assistant(turn.text.clone()));
            outcome.final_text = turn.text;
            return Ok(());
        }
    }

    async fn stream_turn(
        &self,
        cancel: &CancellationToken,
        sink: &mut dyn ConversationSink,
    ) -> Result<StreamedTurn> {
        let request = CompletionRequest::new(self.history.clone())
            .with_tools(self.tools.describe())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        tracing::debug!(
            category = "stream",
            session = %self.session_id,
            model = self.llm.model(),
            turns = request.messages.len(),
            "Requesting completion"
        );

        let body = tokio::select! {
            body = self.llm.stream_completion(request) => body?,
            _ = cancel.cancelled() => return Err(AiError::Cancelled),
        };
        let mut events = decode_events(body);

        let mut text = String::new();
        let mut accumulator = ToolCallAccumulator::new();
        let mut finalized = Vec::new();

        loop {
            let next = tokio::select! {
                next = events.next() => next,
                _ = cancel.cancelled() => return Err(AiError::Cancelled),
            };
            let Some(event) = next else {
                break;
            };

            match event? {
                StreamEvent::TextDelta(delta) => {
                    sink.on_chunk(&delta).await;
                    text.push_str(&delta);
                }
                StreamEvent::ToolCallDelta(delta) => {
                    if let DeltaOutcome::Opened(record) = accumulator.apply(&delta) {
                        sink.on_tool_call_observed(&record).await;
                    }
                }
                StreamEvent::FinishReason(reason) => {
                    tracing::debug!(category = "stream", %reason, "Finish reason");
                    if reason == TOOL_CALLS_FINISH {
                        finalized.extend(accumulator.finalize());
                    }
                }
            }
        }

        if !accumulator.is_empty() {
            tracing::warn!(
                category = "stream",
                pending = accumulator.len(),
                "Stream ended with unfinished tool calls; finalizing them"
            );
            finalized.extend(accumulator.finalize());
        }

        for record in &finalized {
            sink.on_tool_call_observed(record).await;
        }

        Ok(StreamedTurn {
            text,
            tool_calls: finalized,
        })
    }

    async fn execute_tool(
        &self,
        call: ToolCallRecord,
        cancel: &CancellationToken,
        sink: &mut dyn ConversationSink,
    ) -> Result<(ToolExecution, Option<Value>)> {
        let limit = self.config.tool_timeout;
        let result = tokio::select! {
            result = tokio::time::timeout(limit, self.tools.execute_call(&call)) => result,
            _ = cancel.cancelled() => return Err(AiError::Cancelled),
        };

        let (success, content, presentation) = match result {
            Ok(Ok(output)) => {
                let content = output.conversation_content();
                (output.success, content, output.presentation)
            }
            Ok(Err(err)) => (false, format!("Error: {err}"), None),
            Err(_) => {
                let err = ToolError::Timeout {
                    name: call.name.clone(),
                    secs: limit.as_secs(),
                };
                (false, format!("Error: {err}"), None)
            }
        };

        if !success {
            tracing::warn!(
                category = "tool",
                tool = %call.name,
                call_id = %call.id,
                %content,
                "Tool call failed"
            );
            sink.on_notice(&format!("Tool {} failed: {}", call.name, content))
                .await;
        }

        let summary = summarize_tool_result(&content);
        sink.on_tool_executed(&call.id, &summary, success).await;

        Ok((
            ToolExecution {
                call,
                success,
                content,
                summary,
            },
            presentation,
        ))
    }
}

/// Feed utterances from `rx` through the orchestrator one at a time, in
/// arrival order, until the sender side closes.
///
/// Failures are reported to the sink as notices and do not stop the loop.
/// Returns how many utterances were answered successfully.
pub async fn run_conversation(
    orchestrator: &mut ConversationOrchestrator,
    mut rx: mpsc::Receiver<String>,
    sink: &mut dyn ConversationSink,
) -> usize {
    let mut answered = 0;
    while let Some(utterance) = rx.recv().await {
        let utterance = utterance.trim().to_string();
        if utterance.is_empty() {
            continue;
        }
        match orchestrator.send(utterance, sink).await {
            Ok(_) => answered += 1,
            Err(err) => sink.on_notice(&format!("Error: {err}")).await,
        }
    }
    answered
}
