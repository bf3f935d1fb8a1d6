//! Builds the conversation stack from flags and the config file.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use toasttalk_ai::{
    ConversationOrchestrator, LlmClient, OpenAIClient, TransportRestClient, default_registry,
};
use toasttalk_sandbox::CodeRunner;

use crate::cli::Cli;
use crate::config::CliConfig;

pub fn build_runner(config: &CliConfig) -> CodeRunner {
    let orchestrator = config.orchestrator_config();
    CodeRunner::new(config.interpreter_config()).with_timeout(orchestrator.code_timeout)
}

pub fn build_orchestrator(cli: &Cli, config: &CliConfig) -> Result<ConversationOrchestrator> {
    let base_url = cli.base_url.clone().or_else(|| config.default.base_url.clone());
    let api_key = match config.openai_api_key() {
        Some(key) => key,
        // Local OpenAI-compatible servers usually need no key.
        None if base_url.is_some() => String::new(),
        None => bail!("OpenAI API key not found"),
    };

    let mut llm = OpenAIClient::new(api_key).context("Failed to build HTTP client")?;
    if let Some(model) = cli.model.clone().or_else(|| config.default.model.clone()) {
        llm = llm.with_model(model);
    }
    if let Some(url) = base_url {
        llm = llm.with_base_url(url);
    }

    let routes = TransportRestClient::new().context("Failed to build HTTP client")?;
    let tools = default_registry(config.location_resolver(), Arc::new(routes));

    let mut orchestrator_config = config.orchestrator_config();
    if let Some(max_turns) = cli.max_turns {
        orchestrator_config = orchestrator_config.with_max_turns(max_turns);
    }
    if cli.no_code {
        orchestrator_config = orchestrator_config.with_code_execution(false);
    }

    tracing::info!(
        category = "conversation",
        model = llm.model(),
        max_turns = orchestrator_config.max_turns,
        "Conversation stack ready"
    );

    Ok(ConversationOrchestrator::new(
        Arc::new(llm),
        Arc::new(tools),
        Arc::new(build_runner(config)),
        orchestrator_config,
    ))
}

