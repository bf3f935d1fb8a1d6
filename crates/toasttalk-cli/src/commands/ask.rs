use anyhow::Result;
use toasttalk_ai::ConversationOrchestrator;

use crate::sink::TerminalSink;

pub async fn run(mut orchestrator: ConversationOrchestrator, prompt: Vec<String>) -> Result<()> {
    let question = prompt.join(" ");
    let mut sink = TerminalSink::new();

    let stop = orchestrator.stop_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let result = orchestrator.send(question, &mut sink).await;
    watcher.abort();
    sink.finish_line();

    result?;
    Ok(())
}
