//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Invalid command arguments.
    Usage(String),
    /// Calendar service error.
    Service(String),
    /// IO error.
    Io(std::io::Error),
    /// Output could not be encoded.
    Output(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Usage(msg) => write!(f, "invalid arguments: {}", msg),
            Self::Service(msg) => write!(f, "calendar service error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Output(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err)
    }
}

impl From<calmerge_providers::ProviderError> for ClientError {
    fn from(err: calmerge_providers::ProviderError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<calmerge_server::ServerError> for ClientError {
    fn from(err: calmerge_server::ServerError) -> Self {
        Self::Service(err.to_string())
    }
}

impl From<calmerge_core::IcsError> for ClientError {
    fn from(err: calmerge_core::IcsError) -> Self {
        Self::Usage(err.to_string())
    }
}
