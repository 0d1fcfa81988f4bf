//! Error types for chatbridge-core.

use thiserror::Error;

/// Result type alias using chatbridge-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors
    #[cfg(feature = "client")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Non-success response; `body` is the upstream text, untouched
    #[error("Backend error {status}: {body}")]
    Api { status: u16, body: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a non-success backend response
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Upstream HTTP status, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            #[cfg(feature = "client")]
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::NotFound(_) => Some(404),
            Error::Api { status, .. } => Some(*status),
            Error::Serialization(_) | Error::Other(_) => None,
        }
    }

    /// Check if this error is the backend's distinguished not-found answer
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
