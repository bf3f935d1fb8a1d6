//! Deterministic mock LLM client for orchestrator tests.
//!
//! Each scripted step is rendered into an OpenAI-style SSE body and cut into
//! small byte chunks, so the real decoder and accumulator run against it.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{ByteStream, CompletionRequest, LlmClient, Role};

const CHUNK_BYTES: usize = 7;
const ARGUMENT_FRAGMENT_CHARS: usize = 5;

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Stream a plain assistant message.
    Text(String),
    /// Stream tool calls `(id, name, arguments)` with fragmented arguments.
    ToolCalls(Vec<(String, String, String)>),
    /// Stream these `data:` payloads verbatim, then `[DONE]`.
    Frames(Vec<String>),
    /// Fail before streaming with this status and body.
    Error { status: u16, body: String },
    /// Open a stream that never yields.
    Hang,
}

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    fn of(kind: MockStepKind) -> Self {
        Self { delay_ms: 0, kind }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::of(MockStepKind::Text(content.into()))
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::tool_call_raw(id, name, arguments.to_string())
    }

    /// Tool call with arguments passed through untouched, valid JSON or not.
    pub fn tool_call_raw(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::of(MockStepKind::ToolCalls(vec![(
            id.into(),
            name.into(),
            arguments.into(),
        )]))
    }

    pub fn tool_calls(calls: Vec<(String, String, Value)>) -> Self {
        Self::of(MockStepKind::ToolCalls(
            calls
                .into_iter()
                .map(|(id, name, args)| (id, name, args.to_string()))
                .collect(),
        ))
    }

    pub fn frames(frames: Vec<String>) -> Self {
        Self::of(MockStepKind::Frames(frames))
    }

    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self::of(MockStepKind::Error {
            status,
            body: body.into(),
        })
    }

    pub fn hang() -> Self {
        Self::of(MockStepKind::Hang)
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock LLM client driven by scripted steps.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining_steps(&self) -> usize {
        self.script.lock().await.len()
    }

    async fn next_step(&self) -> Option<MockStep> {
        self.script.lock().await.pop_front()
    }

    fn fallback_step(request: &CompletionRequest) -> MockStep {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());
        MockStep::text(text)
    }
}

fn frame(delta: Value, finish_reason: Option<&str>) -> String {
    json!({
        "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }]
    })
    .to_string()
}

fn text_frames(text: &str) -> Vec<String> {
    let mut frames: Vec<String> = text
        .split_inclusive(' ')
        .map(|word| frame(json!({ "content": word }), None))
        .collect();
    frames.push(frame(json!({}), Some("stop")));
    frames
}

fn tool_call_frames(calls: &[(String, String, String)]) -> Vec<String> {
    let mut frames = Vec::new();
    for (index, (id, name, arguments)) in calls.iter().enumerate() {
        frames.push(frame(
            json!({ "tool_calls": [{
                "index": index,
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": "" }
            }]}),
            None,
        ));

        let chars: Vec<char> = arguments.chars().collect();
        for piece in chars.chunks(ARGUMENT_FRAGMENT_CHARS) {
            let fragment: String = piece.iter().collect();
            frames.push(frame(
                json!({ "tool_calls": [{
                    "index": index,
                    "function": { "arguments": fragment }
                }]}),
                None,
            ));
        }
    }
    frames.push(frame(json!({}), Some("tool_calls")));
    frames
}

fn render_body(frames: &[String]) -> Vec<u8> {
    let mut body = String::new();
    for payload in frames {
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn chunked(body: Vec<u8>) -> ByteStream {
    let chunks: Vec<Result<Vec<u8>>> = body
        .chunks(CHUNK_BYTES)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    Box::pin(stream::iter(chunks))
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<ByteStream> {
        let step = match self.next_step().await {
            Some(step) => step,
            None => Self::fallback_step(&request),
        };
        self.requests.lock().await.push(request);

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        let frames = match step.kind {
            MockStepKind::Text(text) => text_frames(&text),
            MockStepKind::ToolCalls(calls) => tool_call_frames(&calls),
            MockStepKind::Frames(frames) => frames,
            MockStepKind::Error { status, body } => {
                return Err(AiError::Transport { status, body });
            }
            MockStepKind::Hang => return Ok(Box::pin(stream::pending::<Result<Vec<u8>>>())),
        };

        Ok(chunked(render_body(&frames)))
    }
}
