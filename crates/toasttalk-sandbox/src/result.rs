use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::CodeLanguage;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Exited,
    TimedOut,
    Cancelled,
    SpawnFailed,
}

/// Outcome of executing one code block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub language: CodeLanguage,
    pub source: String,
    pub stdout: String,
    /// `None` when the process wrote nothing to stderr.
    pub stderr: Option<String>,
    /// Process exit code; `128 + signal` for signal deaths, `-1` when the
    /// interpreter could not be started.
    pub exit_code: i32,
    pub duration_secs: f64,
    pub started_at: DateTime<Utc>,
    pub termination: Termination,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.termination == Termination::Exited && self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.termination == Termination::TimedOut
    }

    /// Render the result as text suitable for feeding back to the model.
    pub fn formatted(&self) -> String {
        let mut out = format!(
            "{} execution:\n```\n{}\n```\n",
            self.language.display_name(),
            self.stdout.trim_end()
        );

        if let Some(stderr) = self.stderr.as_deref().map(str::trim_end)
            && !stderr.is_empty()
        {
            out.push_str(&format!("error: {stderr}\n"));
        }

        match self.termination {
            Termination::TimedOut => out.push_str("status: terminated after timeout\n"),
            Termination::Cancelled => out.push_str("status: cancelled\n"),
            Termination::SpawnFailed => out.push_str("status: interpreter could not be started\n"),
            Termination::Exited => {}
        }
        out.push_str(&format!(
            "exit code: {}, duration: {:.2}s",
            self.exit_code, self.duration_secs
        ));
        out
    }
}

/// Build the user-role feedback turn that reports code results to the model.
pub fn format_feedback(results: &[ExecutionResult]) -> String {
    let mut feedback = String::from("Code execution results:\n");
    for (index, result) in results.iter().enumerate() {
        feedback.push_str(&format!("\n[{}] {}\n", index + 1, result.formatted()));
    }
    feedback.push_str("\nUse these results to answer the user's question.");
    feedback
}
