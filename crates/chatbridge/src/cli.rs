//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand};

/// chatbridge - talk to a chat backend from the terminal
#[derive(Parser, Debug)]
#[command(name = "chatbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend REST API base URL (overrides the config file)
    #[arg(long, global = true, env = "CHATBRIDGE_BACKEND_URL")]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message and print the assistant's reply
    Send(SendArgs),

    /// Print the turns of a caller's active thread
    History(HistoryArgs),

    /// Run diagnostics
    Doctor,

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Caller identity (e.g. a Telegram user id)
    #[arg(short, long)]
    pub identity: String,

    /// Model to run inference with
    #[arg(short, long)]
    pub model: Option<String>,

    /// Continue this thread instead of the caller's first one
    #[arg(short, long)]
    pub thread: Option<String>,

    /// Print the full delivery as JSON
    #[arg(long)]
    pub json: bool,

    /// Message text
    pub content: String,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Caller identity
    #[arg(short, long)]
    pub identity: String,

    /// Show this thread instead of the caller's first one
    #[arg(short, long)]
    pub thread: Option<String>,
}
