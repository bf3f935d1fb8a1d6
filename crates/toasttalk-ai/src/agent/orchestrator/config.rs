use std::time::Duration;

use toasttalk_sandbox::DEFAULT_CODE_TIMEOUT;

use crate::prompt::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_MAX_TURNS: usize = 8;
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Streamed model requests allowed per user message.
    pub max_turns: usize,
    /// Ceiling on a single tool execution.
    pub tool_timeout: Duration,
    /// Ceiling on a single code block execution.
    pub code_timeout: Duration,
    /// Execute `run_` fenced blocks found in final answers.
    pub execute_code: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            code_timeout: DEFAULT_CODE_TIMEOUT,
            execute_code: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_code_timeout(mut self, timeout: Duration) -> Self {
        self.code_timeout = timeout;
        self
    }

    pub fn with_code_execution(mut self, enabled: bool) -> Self {
        self.execute_code = enabled;
        self
    }
}
