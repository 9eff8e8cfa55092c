//! Server error types.

use std::io;

use calmerge_core::IcsError;
use calmerge_providers::ProviderError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (cache directory, cache file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Calendar parsing or query error.
    #[error("Calendar error: {0}")]
    Calendar(#[from] IcsError),

    /// Source configuration or fetch error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The service has been shut down.
    #[error("Service is shut down")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
