use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "toasttalk")]
#[command(version, about = "Toast Talk - a streaming assistant that runs tools and code")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.config/toasttalk/config.toml)
    #[arg(long, global = true, env = "TOASTTALK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model name sent to the completion endpoint
    #[arg(long, global = true, env = "TOASTTALK_MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "TOASTTALK_BASE_URL")]
    pub base_url: Option<String>,

    /// Model requests allowed per message
    #[arg(long, global = true)]
    pub max_turns: Option<usize>,

    /// Show run_ code blocks instead of executing them
    #[arg(long, global = true)]
    pub no_code: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive conversation (default). Reads one message per line;
    /// piped input is answered line by line.
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Execute the run_ code blocks in a markdown file
    Exec {
        /// Markdown file containing fenced run_python / run_bash / run_javascript blocks
        file: PathBuf,

        /// Per-block timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}
