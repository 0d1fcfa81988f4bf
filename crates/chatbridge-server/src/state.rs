//! Application state.

use chatbridge_core::{BackendClient, ChatBackend, InMemoryBackend, Orchestrator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{BackendMode, Config};

/// Orchestrator over whichever backend the config selected
pub type SharedOrchestrator = Orchestrator<Arc<dyn ChatBackend>>;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    pub orchestrator: SharedOrchestrator,
    /// REST client used for health checks (None for the in-memory backend)
    pub health_client: Option<BackendClient>,
    /// Server start time
    pub start_time: Instant,
    /// Chat requests currently being orchestrated
    pub active_requests: Arc<AtomicUsize>,
}

impl AppState {
    /// Build state from config, constructing the configured backend
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        match config.backend.mode {
            BackendMode::Http => {
                let client = BackendClient::new(config.client_config())?;
                let backend: Arc<dyn ChatBackend> = Arc::new(client.clone());
                Ok(Self::with_backend(config, backend, Some(client)))
            }
            BackendMode::Memory => {
                let backend: Arc<dyn ChatBackend> = Arc::new(InMemoryBackend::new());
                Ok(Self::with_backend(config, backend, None))
            }
        }
    }

    pub fn with_backend(
        config: Config,
        backend: Arc<dyn ChatBackend>,
        health_client: Option<BackendClient>,
    ) -> Self {
        let orchestrator = Orchestrator::with_config(backend, config.orchestrator_config());
        Self {
            config: Arc::new(config),
            orchestrator,
            health_client,
            start_time: Instant::now(),
            active_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count a request as in flight until the guard drops
    pub fn track_request(&self) -> InFlight {
        self.active_requests.fetch_add(1, Ordering::SeqCst);
        InFlight {
            counter: self.active_requests.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.active_requests.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter on drop, including when the request future is cancelled
pub struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
