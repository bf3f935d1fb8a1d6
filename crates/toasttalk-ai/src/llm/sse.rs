//! Server-sent-event decoding for streamed chat completions.
//!
//! The decoder is fed raw body chunks and yields [`StreamEvent`]s as soon as
//! each `data:` line is complete. Chunk boundaries may fall anywhere,
//! including inside a UTF-8 sequence; lines are only decoded once their
//! terminating newline has arrived.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::Result;
use crate::llm::client::ByteStream;

const DONE_MARKER: &str = "[DONE]";

/// Incremental fragment of a tool call, tagged by its position in the response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallDelta(ToolCallDelta),
    FinishReason(String),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Deserialize, Debug)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize, Debug)]
struct StreamToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Deserialize, Debug)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Line-oriented SSE decoder. One instance per response.
#[derive(Debug, Default)]
pub struct StreamEventDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl StreamEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` terminator has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one body chunk; returns the events of every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut events);
            if self.done {
                self.pending.clear();
                break;
            }
        }
        events
    }

    /// Decode a trailing line that never received its newline.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.decode_line(&line, &mut events);
        }
        self.done = true;
        events
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches('\r');

        let Some(data) = line.strip_prefix("data:") else {
            // Blank separators, `event:`/`id:` fields and `:` keep-alive comments.
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data).trim();
        if data.is_empty() {
            return;
        }
        if data == DONE_MARKER {
            self.done = true;
            return;
        }

        match serde_json::from_str::<StreamFrame>(data) {
            Ok(frame) => frame_events(frame, events),
            Err(e) => {
                tracing::debug!(
                    category = "stream",
                    error = %e,
                    frame_len = data.len(),
                    "Skipping malformed frame"
                );
            }
        }
    }
}

/// Text first, then tool deltas, then the finish reason.
fn frame_events(frame: StreamFrame, events: &mut Vec<StreamEvent>) {
    let Some(choice) = frame.choices.into_iter().next() else {
        return;
    };
    let delta = choice.delta.unwrap_or_default();

    if let Some(content) = delta.content
        && !content.is_empty()
    {
        events.push(StreamEvent::TextDelta(content));
    }

    for tc in delta.tool_calls.unwrap_or_default() {
        let (name, arguments) = match tc.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        events.push(StreamEvent::ToolCallDelta(ToolCallDelta {
            index: tc.index,
            id: tc.id.filter(|id| !id.is_empty()),
            name: name.filter(|name| !name.is_empty()),
            arguments: arguments.filter(|args| !args.is_empty()),
        }));
    }

    if let Some(reason) = choice.finish_reason {
        events.push(StreamEvent::FinishReason(reason));
    }
}

/// Decode a response body into a lazy, finite event stream.
///
/// The stream ends at `[DONE]` or when the body closes. A transport error
/// while reading is yielded once and ends the stream.
pub fn decode_events(mut body: ByteStream) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut decoder = StreamEventDecoder::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield Ok(event);
                    }
                    if decoder.is_done() {
                        return;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for event in decoder.finish() {
            yield Ok(event);
        }
    })
}
