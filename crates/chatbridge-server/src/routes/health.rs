//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: bool,
    pub in_flight: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    // The in-memory backend is always reachable
    let backend_healthy = match state.health_client {
        Some(ref client) => client.health_check().await.unwrap_or_else(|e| {
            debug!("Backend health check failed: {}", e);
            false
        }),
        None => true,
    };

    let status = if backend_healthy { "healthy" } else { "degraded" };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend: backend_healthy,
        in_flight: state.in_flight(),
    })
}
