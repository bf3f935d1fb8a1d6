//! CLI configuration file support
//!
//! Loads configuration from ~/.config/toasttalk/config.toml

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toasttalk_ai::OrchestratorConfig;
use toasttalk_sandbox::InterpreterConfig;
use toasttalk_traits::{Coordinate, FixedLocation, LocationResolver, UnavailableLocation};

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default settings
    #[serde(default)]
    pub default: DefaultConfig,
    /// API key settings
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    /// Interpreter programs for code blocks
    #[serde(default)]
    pub interpreters: InterpretersConfig,
    /// Fixed answer for "current location"
    #[serde(default)]
    pub location: Option<LocationConfig>,
}

/// Default configuration values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_turns: Option<usize>,
    pub tool_timeout_secs: Option<u64>,
    pub code_timeout_secs: Option<u64>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// OpenAI (or compatible) API key
    pub openai: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpretersConfig {
    pub python: Option<String>,
    pub shell: Option<String>,
    pub javascript: Option<String>,
    pub headless_plotting: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl CliConfig {
    /// Load configuration from a specific path. A missing or unreadable
    /// file yields the defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Cannot read config file");
                Self::default()
            }
        }
    }

    fn parse(content: &str, path: &Path) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("toasttalk").join("config.toml"))
    }

    /// `OPENAI_API_KEY` wins over the config file.
    pub fn openai_api_key(&self) -> Option<String> {
        std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_keys.openai.clone())
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        let mut config = InterpreterConfig::default();
        if let Some(python) = &self.interpreters.python {
            config.python = python.clone();
        }
        if let Some(shell) = &self.interpreters.shell {
            config.shell = shell.clone();
        }
        if let Some(javascript) = &self.interpreters.javascript {
            config.javascript = javascript.clone();
        }
        if let Some(headless) = self.interpreters.headless_plotting {
            config.headless_plotting = headless;
        }
        config
    }

    pub fn location_resolver(&self) -> Arc<dyn LocationResolver> {
        match self.location {
            Some(loc) => Arc::new(FixedLocation(Coordinate::new(loc.latitude, loc.longitude))),
            None => Arc::new(UnavailableLocation),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let d = &self.default;
        let mut config = OrchestratorConfig::default();
        if let Some(temperature) = d.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = d.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(max_turns) = d.max_turns {
            config = config.with_max_turns(max_turns);
        }
        if let Some(secs) = d.tool_timeout_secs {
            config = config.with_tool_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = d.code_timeout_secs {
            config = config.with_code_timeout(Duration::from_secs(secs));
        }
        config
    }
}
