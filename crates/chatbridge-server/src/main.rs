//! chatbridge-server - chat front door
//!
//! Accepts caller messages over HTTP and runs them through the orchestrator
//! against the configured chat backend.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod routes;
mod state;

use config::{BackendMode, Config, LogFormat};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    init_tracing(config.server.log_format)?;

    info!("chatbridge-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Config loaded from {:?}", Config::config_path());
    match config.backend.mode {
        BackendMode::Http => info!("Backend: {}", config.backend.url),
        BackendMode::Memory => info!("Backend: in-memory (conversations are not durable)"),
    }

    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new("chatbridge_server=info,chatbridge_core=info,tower_http=info")
    })?;

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
