//! SoilScope CLI: rule-based soil and crop advice assistant.
//!
//! Serves the chat API, answers one-off questions from the terminal, and
//! manages the knowledge base and its database.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
