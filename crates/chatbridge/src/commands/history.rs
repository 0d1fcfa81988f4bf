//! Print a caller's conversation without creating anything.

use anyhow::{Context, Result};
use chatbridge_core::{BackendClient, ChatBackend, ChatMessage, IdentityHint, Role, ThreadId};
use colored::Colorize;

use crate::cli::HistoryArgs;
use crate::config::Config;

/// What `history` found for a caller
#[derive(Debug, PartialEq)]
pub enum Lookup {
    NoAccount,
    NoThread,
    Thread {
        thread: ThreadId,
        messages: Vec<ChatMessage>,
    },
}

pub async fn execute(args: HistoryArgs, config: &Config) -> Result<()> {
    let client = BackendClient::new(config.client_config())
        .context("Failed to create backend client")?;

    let identity = IdentityHint::new(args.identity);
    if identity.is_blank() {
        anyhow::bail!("Identity must not be empty");
    }

    match lookup(&client, &identity, args.thread.map(ThreadId::new)).await? {
        Lookup::NoAccount => {
            println!("{}", format!("No account for identity {}", identity).yellow());
        }
        Lookup::NoThread => {
            println!("{}", format!("No conversation yet for identity {}", identity).yellow());
        }
        Lookup::Thread { thread, messages } => {
            println!("{} {}", "Thread".cyan().bold(), thread);
            println!("{}", "─".repeat(50));
            if messages.is_empty() {
                println!("  {}", "(empty)".dimmed());
            }
            for message in &messages {
                print_message(message);
            }
        }
    }

    Ok(())
}

/// Read-only walk of account -> thread -> history.
pub async fn lookup<B: ChatBackend>(
    backend: &B,
    identity: &IdentityHint,
    thread: Option<ThreadId>,
) -> Result<Lookup> {
    let account = match backend
        .get_account(identity)
        .await
        .context("Failed to look up account")?
    {
        Some(account) => account,
        None => return Ok(Lookup::NoAccount),
    };

    let thread = match thread {
        Some(thread) => thread,
        None => {
            let threads = backend
                .list_threads(account)
                .await
                .context("Failed to list threads")?;
            match threads.into_iter().next() {
                Some(first) => first.thread_id,
                None => return Ok(Lookup::NoThread),
            }
        }
    };

    // The backend answers 404 for a thread without messages
    let messages = match backend.get_history(&thread).await {
        Ok(messages) => messages,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to fetch history")),
    };

    Ok(Lookup::Thread { thread, messages })
}

fn print_message(message: &ChatMessage) {
    let label = match message.role {
        Role::User => "user".green().bold(),
        Role::Assistant => "assistant".blue().bold(),
        Role::System => "system".dimmed(),
    };
    println!("{}: {}", label, message.content);
}
