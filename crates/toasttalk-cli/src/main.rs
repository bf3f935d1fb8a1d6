mod cli;
mod commands;
mod config;
mod error;
mod setup;
mod sink;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose);

    let config = CliConfig::load_from_path(cli.config.clone().or_else(CliConfig::default_path));

    if let Err(err) = run(cli, config).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<()> {
    match cli.command {
        Some(Commands::Exec {
            ref file,
            timeout_secs,
        }) => commands::exec::run(setup::build_runner(&config), file, timeout_secs).await,
        Some(Commands::Ask { ref prompt }) => {
            let orchestrator = setup::build_orchestrator(&cli, &config)?;
            commands::ask::run(orchestrator, prompt.clone()).await
        }
        Some(Commands::Chat) | None => {
            let orchestrator = setup::build_orchestrator(&cli, &config)?;
            commands::chat::run(orchestrator).await
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("toasttalk")
        .join("logs")
}

/// Always log to a daily file so terminal output stays clean.
fn init_logging(verbose: bool) -> WorkerGuard {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "toasttalk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    guard
}
