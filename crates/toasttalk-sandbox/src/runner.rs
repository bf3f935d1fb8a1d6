use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::extract::{CodeBlock, extract_code_blocks};
use crate::language::{CodeLanguage, InterpreterConfig};
use crate::process::{Ending, ProcessRequest, run_process};
use crate::python::prepare_python_source;
use crate::result::{ExecutionResult, Termination};
use crate::safety::SafetyChecker;

pub const DEFAULT_CODE_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_MAX_OUTPUT_BYTES: usize = 100_000;

/// Executes extracted code blocks one at a time and keeps a history of
/// results.
pub struct CodeRunner {
    interpreters: InterpreterConfig,
    timeout: Duration,
    max_output_bytes: usize,
    safety: SafetyChecker,
    history: Mutex<Vec<ExecutionResult>>,
}

impl Default for CodeRunner {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl CodeRunner {
    pub fn new(interpreters: InterpreterConfig) -> Self {
        Self {
            interpreters,
            timeout: DEFAULT_CODE_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            safety: SafetyChecker,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interpreters(&self) -> &InterpreterConfig {
        &self.interpreters
    }

    /// Execute one block with the runner's default timeout.
    pub async fn execute(&self, block: &CodeBlock) -> ExecutionResult {
        self.execute_with(block, self.timeout, &CancellationToken::new())
            .await
    }

    /// Execute one block. Never fails: spawn errors, timeouts and
    /// cancellation are all reported through the result.
    pub async fn execute_with(
        &self,
        block: &CodeBlock,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let report = self.safety.check(block);
        if !report.is_safe {
            tracing::warn!(
                category = "code_execution",
                violations = ?report.violations,
                "unsafe code block"
            );
        }

        let source = match block.language {
            CodeLanguage::Python => prepare_python_source(&block.source),
            _ => block.source.trim().to_string(),
        };
        let program = self.interpreters.program_for(block.language);
        let started_at = Utc::now();
        let clock = Instant::now();

        tracing::info!(
            category = "code_execution",
            language = %block.language,
            program,
            line = block.line_number,
            "executing code block"
        );

        let outcome = run_process(
            ProcessRequest {
                program,
                args: vec![block.language.inline_flag(), &source],
                env: self.interpreters.env_for(block.language),
                timeout,
                max_output_bytes: self.max_output_bytes,
            },
            cancel,
        )
        .await;

        let result = match outcome {
            Ok(outcome) => {
                let termination = match outcome.ending {
                    Ending::Exited => Termination::Exited,
                    Ending::TimedOut => Termination::TimedOut,
                    Ending::Cancelled => Termination::Cancelled,
                };
                let stdout = outcome.stdout.trim_end().to_string();
                let stderr = outcome.stderr.trim_end();
                ExecutionResult {
                    language: block.language,
                    source,
                    stdout,
                    stderr: (!stderr.is_empty()).then(|| stderr.to_string()),
                    exit_code: outcome.exit_code,
                    duration_secs: clock.elapsed().as_secs_f64(),
                    started_at,
                    termination,
                }
            }
            Err(error) => {
                tracing::error!(
                    category = "code_execution",
                    program,
                    %error,
                    "failed to start interpreter"
                );
                ExecutionResult {
                    language: block.language,
                    source,
                    stdout: String::new(),
                    stderr: Some(format!("failed to start {program}: {error}")),
                    exit_code: -1,
                    duration_secs: clock.elapsed().as_secs_f64(),
                    started_at,
                    termination: Termination::SpawnFailed,
                }
            }
        };

        tracing::debug!(
            category = "code_execution",
            exit_code = result.exit_code,
            termination = ?result.termination,
            duration_secs = result.duration_secs,
            "code block finished"
        );

        self.history.lock().push(result.clone());
        result
    }

    /// Execute blocks serially in the given order.
    ///
    /// Stops early if `cancel` fires; blocks after the cancelled one are not
    /// run.
    pub async fn execute_all(
        &self,
        blocks: &[CodeBlock],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(blocks.len());
        for block in blocks {
            if cancel.is_cancelled() {
                break;
            }
            results.push(self.execute_with(block, timeout, cancel).await);
        }
        results
    }

    /// Extract and execute every `run_` block in a model response.
    pub async fn process_response(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        let blocks = extract_code_blocks(text);
        if blocks.is_empty() {
            return Vec::new();
        }
        self.execute_all(&blocks, self.timeout, cancel).await
    }

    /// Snapshot of every result produced by this runner, oldest first.
    pub fn history(&self) -> Vec<ExecutionResult> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}
