//! chatbridge-core - Core library for chatbridge
//!
//! This crate provides the conversation flow shared by the chatbridge server
//! and CLI:
//!
//! - **types**: identities, threads, turns and inference replies
//! - **backend**: the `ChatBackend` seam plus an in-memory implementation
//! - **client**: REST client for the remote chat backend
//! - **orchestrator**: one user message in, one reply out

pub mod backend;
#[cfg(feature = "client")]
pub mod client;
pub mod error;
pub mod orchestrator;
pub mod types;

// Re-export commonly used types
pub use backend::{ChatBackend, InMemoryBackend};
#[cfg(feature = "client")]
pub use client::{BackendClient, ClientConfig};
pub use error::{Error, Result};
pub use orchestrator::{MessageRequest, OrchestrationError, Orchestrator, OrchestratorConfig};
pub use types::{AccountId, ChatMessage, Delivery, IdentityHint, InferenceReply, Role, ThreadId, ThreadSummary};
