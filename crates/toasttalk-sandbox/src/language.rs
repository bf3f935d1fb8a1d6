use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SandboxError;

/// Languages a `run_` fence may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Python,
    Shell,
    JavaScript,
}

impl CodeLanguage {
    /// Resolve a fence tag (without the `run_` prefix).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Some(Self::Python),
            "bash" | "sh" | "shell" => Some(Self::Shell),
            "javascript" | "js" | "node" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Shell => "Bash",
            Self::JavaScript => "JavaScript",
        }
    }

    /// Interpreter flag that takes the script source as its argument.
    pub(crate) fn inline_flag(self) -> &'static str {
        match self {
            Self::Python | Self::Shell => "-c",
            Self::JavaScript => "-e",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CodeLanguage {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| SandboxError::UnsupportedLanguage(s.to_string()))
    }
}

/// Interpreter executables per language. Bare names are looked up on PATH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    pub python: String,
    pub shell: String,
    pub javascript: String,
    /// Force a non-interactive matplotlib backend so plotting code cannot
    /// block on a GUI window.
    pub headless_plotting: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            shell: "bash".to_string(),
            javascript: "node".to_string(),
            headless_plotting: true,
        }
    }
}

impl InterpreterConfig {
    pub fn program_for(&self, language: CodeLanguage) -> &str {
        match language {
            CodeLanguage::Python => &self.python,
            CodeLanguage::Shell => &self.shell,
            CodeLanguage::JavaScript => &self.javascript,
        }
    }

    /// Extra environment variables layered over the inherited environment.
    pub(crate) fn env_for(&self, language: CodeLanguage) -> Vec<(&'static str, &'static str)> {
        match language {
            CodeLanguage::Python => {
                let mut env = vec![("PYTHONUNBUFFERED", "1")];
                if self.headless_plotting {
                    env.push(("MPLBACKEND", "Agg"));
                }
                env
            }
            _ => Vec::new(),
        }
    }
}
