//! Orchestration failures.
//!
//! One variant per abort point of the message flow. Each carries the backend
//! error that caused it, so the upstream status survives to the caller.

use thiserror::Error;

use crate::error::Error;

/// Status used when a failure carries no upstream status
pub const GENERIC_SERVER_ERROR: u16 = 500;

/// A terminal failure of [`super::Orchestrator::handle_message`]
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("identity hint is missing")]
    CallerInputMissing,

    #[error("failed to resolve account: {0}")]
    AccountResolutionFailed(#[source] Error),

    #[error("failed to create thread: {0}")]
    ThreadResolutionFailed(#[source] Error),

    #[error("failed to persist user message: {0}")]
    MessagePersistFailed(#[source] Error),

    #[error("failed to fetch history: {0}")]
    HistoryFetchFailed(#[source] Error),

    /// `body` is the upstream error text, verbatim
    #[error("inference failed ({status}): {body}")]
    InferenceFailed { status: u16, body: String },
}

impl OrchestrationError {
    /// Machine-readable kind for the caller-facing error payload
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CallerInputMissing => "CALLER_INPUT_MISSING",
            Self::AccountResolutionFailed(_) => "ACCOUNT_RESOLUTION_FAILED",
            Self::ThreadResolutionFailed(_) => "THREAD_RESOLUTION_FAILED",
            Self::MessagePersistFailed(_) => "MESSAGE_PERSIST_FAILED",
            Self::HistoryFetchFailed(_) => "HISTORY_FETCH_FAILED",
            Self::InferenceFailed { .. } => "INFERENCE_FAILED",
        }
    }

    /// HTTP-style status: mirrors upstream when known, else 500
    pub fn status(&self) -> u16 {
        match self {
            Self::CallerInputMissing => 400,
            Self::AccountResolutionFailed(e)
            | Self::ThreadResolutionFailed(e)
            | Self::MessagePersistFailed(e)
            | Self::HistoryFetchFailed(e) => e.status().unwrap_or(GENERIC_SERVER_ERROR),
            Self::InferenceFailed { status, .. } => *status,
        }
    }

    /// Human-readable detail for the caller. Inference failures return the
    /// upstream body untouched.
    pub fn detail(&self) -> String {
        match self {
            Self::InferenceFailed { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Build an inference failure from whatever the backend returned
    pub(crate) fn inference(err: Error) -> Self {
        match err {
            Error::Api { status, body } => Self::InferenceFailed { status, body },
            other => Self::InferenceFailed {
                status: other.status().unwrap_or(GENERIC_SERVER_ERROR),
                body: other.to_string(),
            },
        }
    }
}
