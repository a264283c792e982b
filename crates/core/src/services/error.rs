use thiserror::Error;

use crate::command::CommandError;

/// Errors from service clients and configurators.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API request failed ({method} {url}): HTTP {status}: {body}")]
    Http {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Schema not found: {0}")]
    Schema(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to access {path}: {message}")]
    Io { path: String, message: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl ServiceError {
    /// Failures of a single call that a freshly started container may stop
    /// producing: connection errors, timeouts and any non-2xx status.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::ConnectionFailed(_) | ServiceError::Timeout(_) | ServiceError::Http { .. }
        )
    }

    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        ServiceError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
