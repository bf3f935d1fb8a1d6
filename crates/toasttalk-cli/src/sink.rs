//! Terminal rendering of a live conversation.

use std::io::Write;

use async_trait::async_trait;
use colored::Colorize;
use toasttalk_ai::ConversationSink;
use toasttalk_sandbox::ExecutionResult;
use toasttalk_traits::ToolCallRecord;

/// Streams answer text to stdout and tool / code activity as dimmed status
/// lines. Notices go to stderr.
#[derive(Default)]
pub struct TerminalSink {
    mid_line: bool,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate a partially printed answer line.
    pub fn finish_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }

    fn status(&mut self, line: String) {
        self.finish_line();
        println!("{line}");
    }
}

#[async_trait]
impl ConversationSink for TerminalSink {
    async fn on_chunk(&mut self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
        self.mid_line = !text.ends_with('\n');
    }

    async fn on_tool_call_observed(&mut self, record: &ToolCallRecord) {
        // Opened records carry no arguments yet; finalized ones repeat the call.
        if record.arguments.is_empty() {
            self.status(format!("  {} {}", "->".cyan(), record.name.dimmed()));
        }
    }

    async fn on_tool_executed(&mut self, _id: &str, summary: &str, success: bool) {
        let mark = if success { "ok".green() } else { "failed".red() };
        self.status(format!("  {} {}", mark, summary.dimmed()));
    }

    async fn on_code_executed(&mut self, result: &ExecutionResult) {
        self.status(format!("{}", result.formatted().dimmed()));
    }

    async fn on_notice(&mut self, notice: &str) {
        self.finish_line();
        eprintln!("  {} {}", "!".yellow().bold(), notice.yellow());
    }
}
