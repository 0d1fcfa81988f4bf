//! Diagnostics command.

use anyhow::Result;
use chatbridge_core::BackendClient;
use colored::Colorize;

use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    println!("{}", "chatbridge Doctor".cyan().bold());
    println!("{}", "─".repeat(50));
    println!();

    let mut issues = Vec::new();

    // Check config file
    print!("  Config file: ");
    let config_path = Config::config_path();
    if config_path.exists() {
        println!("{}", format!("✓ {}", config_path.display()).green());
    } else {
        println!("{}", "○ not found (using defaults)".yellow());
    }

    print!("  Backend token: ");
    if config.backend.token.is_some() {
        println!("{}", "✓ set".green());
    } else {
        println!("{}", "○ not set".yellow());
    }

    // Check backend connectivity
    print!("  Backend ({}):", config.backend.url);
    match BackendClient::new(config.client_config()) {
        Ok(client) => match client.health_check().await {
            Ok(true) => println!(" {}", "✓ reachable".green()),
            Ok(false) => {
                println!(" {}", "✗ server error".red());
                issues.push("Backend answered /health with a 5xx status");
            }
            Err(e) => {
                println!(" {}", format!("✗ {}", e).red());
                issues.push("Cannot reach the chat backend");
            }
        },
        Err(e) => {
            println!(" {}", format!("✗ {}", e).red());
            issues.push("Failed to build the backend client");
        }
    }

    println!();
    println!("  {}", "Defaults:".cyan());
    println!("    model: {}", config.chat.default_model);
    println!("    new thread title: {}", config.chat.default_thread_title);
    println!("    timeout: {}s", config.backend.timeout_secs);

    // Summary
    println!();
    if issues.is_empty() {
        println!("{}", "✓ All checks passed".green().bold());
    } else {
        println!("{}", format!("✗ {} issue(s) found:", issues.len()).red().bold());
        for issue in &issues {
            println!("  • {}", issue);
        }
    }

    Ok(())
}
