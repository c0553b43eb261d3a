mod cli;
mod repl;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use parla_client::{ChatSession, HttpTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stderr keeps log lines out of streamed replies
    let default_filter = if cli.verbose { "parla_client=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            std::process::exit(2);
        }
    };

    let transport = HttpTransport::new(&cli.server);
    tracing::info!(endpoint = transport.endpoint(), "Using chat endpoint");
    repl::run(ChatSession::new(settings), &transport).await
}
