//! Interactive conversation. A terminal gets a REPL with slash commands;
//! piped input is fed through the utterance channel one line at a time.

use std::future::Future;
use std::io::{IsTerminal, Write};

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use toasttalk_ai::{AiError, ConversationOrchestrator, Role, run_conversation};

use crate::sink::TerminalSink;

const UTTERANCE_BUFFER: usize = 16;
const HISTORY_PREVIEW_CHARS: usize = 80;

enum ReplCommand {
    Quit,
    Reset,
    History,
    Help,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<ReplCommand> {
    let command = line.strip_prefix('/')?;
    Some(match command.trim() {
        "quit" | "exit" | "q" => ReplCommand::Quit,
        "reset" => ReplCommand::Reset,
        "history" => ReplCommand::History,
        "help" => ReplCommand::Help,
        other => ReplCommand::Unknown(other.to_string()),
    })
}

pub async fn run(orchestrator: ConversationOrchestrator) -> Result<()> {
    if std::io::stdin().is_terminal() {
        repl(orchestrator).await
    } else {
        piped(orchestrator).await
    }
}

async fn piped(mut orchestrator: ConversationOrchestrator) -> Result<()> {
    let (tx, rx) = mpsc::channel(UTTERANCE_BUFFER);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut sink = TerminalSink::new();
    let answered = run_conversation(&mut orchestrator, rx, &mut sink).await;
    sink.finish_line();
    reader.await.ok();

    tracing::info!(category = "conversation", answered, "Input closed");
    Ok(())
}

/// Next line typed at the prompt, or `None` once input closes or
/// `interrupt` resolves first.
async fn next_prompt_line<R, F>(
    lines: &mut Lines<R>,
    interrupt: F,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

async fn repl(mut orchestrator: ConversationOrchestrator) -> Result<()> {
    println!(
        "{} {}",
        "Toast Talk".bold(),
        "(type /help for commands, Ctrl-C stops an answer)".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sink = TerminalSink::new();

    loop {
        print!("{} ", "you>".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = next_prompt_line(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_command(line) {
            match command {
                ReplCommand::Quit => break,
                ReplCommand::Reset => {
                    orchestrator.reset();
                    println!("{}", "Conversation cleared.".dimmed());
                }
                ReplCommand::History => print_history(&orchestrator),
                ReplCommand::Help => print_help(),
                ReplCommand::Unknown(name) => {
                    println!("{} /{}", "Unknown command:".yellow(), name);
                }
            }
            continue;
        }

        let stop = orchestrator.stop_handle();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.cancel();
            }
        });

        let result = orchestrator.send(line, &mut sink).await;
        watcher.abort();
        sink.finish_line();

        match result {
            Ok(_) => {}
            Err(AiError::Cancelled) => println!("{}", "(stopped)".dimmed()),
            Err(err) => eprintln!("{} {}", "Error:".red().bold(), err),
        }
    }

    Ok(())
}

fn print_history(orchestrator: &ConversationOrchestrator) {
    for message in orchestrator.history().iter().skip(1) {
        let role = match message.role {
            Role::System => "system",
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let text = match &message.tool_calls {
            Some(calls) => calls
                .iter()
                .map(|c| format!("{}({})", c.name, c.arguments))
                .collect::<Vec<_>>()
                .join(", "),
            None => message.content.replace('\n', " "),
        };
        let preview: String = text.chars().take(HISTORY_PREVIEW_CHARS).collect();
        println!("{} {}", format!("{role:>9}").bold(), preview);
    }
}

fn print_help() {
    println!("  /reset    start over, keeping the system prompt");
    println!("  /history  show the conversation so far");
    println!("  /quit     leave");
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(matches!(parse_command("/quit"), Some(ReplCommand::Quit)));
        assert!(matches!(parse_command("/reset "), Some(ReplCommand::Reset)));
        assert!(matches!(
            parse_command("/nope"),
            Some(ReplCommand::Unknown(name)) if name == "nope"
        ));
        assert!(parse_command("what time is it?").is_none());
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_ends_input() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let line = next_prompt_line(&mut lines, std::future::ready(()))
            .await
            .unwrap();
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn test_prompt_line_read_without_interrupt() {
        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"hello there\n").await.unwrap();
        let mut lines = BufReader::new(reader).lines();

        let line = next_prompt_line(&mut lines, std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(line.as_deref(), Some("hello there"));
    }
}
