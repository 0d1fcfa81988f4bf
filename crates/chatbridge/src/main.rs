//! chatbridge - chat backend CLI
//!
//! Sends messages through the same orchestration the server runs and
//! inspects stored conversations.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("chatbridge=warn".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::Config::load()?.with_backend_url(cli.backend_url);

    // Execute command
    match cli.command {
        Commands::Send(args) => commands::send::execute(args, &config).await,
        Commands::History(args) => commands::history::execute(args, &config).await,
        Commands::Doctor => commands::doctor::execute(&config).await,
        Commands::Version => {
            println!("chatbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
