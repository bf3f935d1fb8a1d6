use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set your API key with:");
        eprintln!("  {} export OPENAI_API_KEY=<value>", "$".dimmed());
        eprintln!("  or add it under [api_keys] in ~/.config/toasttalk/config.toml");
    }

    if msg.contains("status 401") || msg.contains("status 403") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  The API rejected the key. Check OPENAI_API_KEY and --base-url.");
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
