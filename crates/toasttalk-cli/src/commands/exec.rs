use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use toasttalk_sandbox::CodeRunner;

pub async fn run(runner: CodeRunner, file: &Path, timeout_secs: Option<u64>) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let runner = match timeout_secs {
        Some(secs) => runner.with_timeout(Duration::from_secs(secs)),
        None => runner,
    };

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let results = runner.process_response(&text, &cancel).await;
    watcher.abort();

    if results.is_empty() {
        println!("{}", "No run_ code blocks found.".dimmed());
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{} {}", format!("[{}]", i + 1).bold(), result.formatted());
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{failed} of {} code blocks failed", results.len());
    }
    Ok(())
}
