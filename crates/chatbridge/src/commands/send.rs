//! Send a message through the orchestrator.

use anyhow::{Context, Result};
use chatbridge_core::{BackendClient, Delivery, MessageRequest, Orchestrator, ThreadId};
use colored::Colorize;

use crate::cli::SendArgs;
use crate::config::Config;

pub async fn execute(args: SendArgs, config: &Config) -> Result<()> {
    let client = BackendClient::new(config.client_config())
        .context("Failed to create backend client")?;
    let orchestrator = Orchestrator::with_config(client, config.orchestrator_config());

    let as_json = args.json;
    let delivery = orchestrator
        .handle_message(build_request(args))
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&delivery)?);
    } else {
        print_delivery(&delivery);
    }

    Ok(())
}

fn build_request(args: SendArgs) -> MessageRequest {
    let mut request = MessageRequest::new(args.identity, args.content);
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if let Some(thread) = args.thread {
        request = request.with_thread(ThreadId::new(thread));
    }
    request
}

fn print_delivery(delivery: &Delivery) {
    println!("{}", delivery.reply.reply);

    if !delivery.persisted {
        eprintln!();
        eprintln!(
            "{}",
            "⚠ Reply was not saved to the conversation history".yellow()
        );
    }
}
