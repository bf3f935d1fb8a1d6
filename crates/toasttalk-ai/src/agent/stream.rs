use async_trait::async_trait;
use tokio::sync::mpsc;
use toasttalk_sandbox::ExecutionResult;
use toasttalk_traits::ToolCallRecord;

/// Live view of a conversation for a display layer.
#[async_trait]
pub trait ConversationSink: Send {
    async fn on_chunk(&mut self, text: &str);

    /// Fires when a call opens (empty arguments) and again once finalized.
    async fn on_tool_call_observed(&mut self, record: &ToolCallRecord);

    async fn on_tool_executed(&mut self, id: &str, summary: &str, success: bool);

    async fn on_code_executed(&mut self, _result: &ExecutionResult) {}

    /// Inline notice about a failure that did not end the conversation.
    async fn on_notice(&mut self, _notice: &str) {}
}

pub struct NullSink;

#[async_trait]
impl ConversationSink for NullSink {
    async fn on_chunk(&mut self, _text: &str) {}
    async fn on_tool_call_observed(&mut self, _record: &ToolCallRecord) {}
    async fn on_tool_executed(&mut self, _id: &str, _summary: &str, _success: bool) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    Chunk(String),
    ToolCallObserved(ToolCallRecord),
    ToolExecuted {
        id: String,
        summary: String,
        success: bool,
    },
    CodeExecuted(ExecutionResult),
    Notice(String),
}

/// Forwards every callback as a [`ConversationEvent`]. A closed receiver is
/// ignored.
pub struct ChannelSink {
    tx: mpsc::Sender<ConversationEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ConversationEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ConversationSink for ChannelSink {
    async fn on_chunk(&mut self, text: &str) {
        let _ = self.tx.send(ConversationEvent::Chunk(text.to_string())).await;
    }

    async fn on_tool_call_observed(&mut self, record: &ToolCallRecord) {
        let _ = self
            .tx
            .send(ConversationEvent::ToolCallObserved(record.clone()))
            .await;
    }

    async fn on_tool_executed(&mut self, id: &str, summary: &str, success: bool) {
        let _ = self
            .tx
            .send(ConversationEvent::ToolExecuted {
                id: id.to_string(),
                summary: summary.to_string(),
                success,
            })
            .await;
    }

    async fn on_code_executed(&mut self, result: &ExecutionResult) {
        let _ = self
            .tx
            .send(ConversationEvent::CodeExecuted(result.clone()))
            .await;
    }

    async fn on_notice(&mut self, notice: &str) {
        let _ = self
            .tx
            .send(ConversationEvent::Notice(notice.to_string()))
            .await;
    }
}
