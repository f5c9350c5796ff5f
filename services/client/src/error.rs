//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use godam_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Represents a standard Input/Output error (e.g., reading the storage file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected the session (401/403). The token has already been
    /// cleared and the login redirect issued.
    #[error("Authentication required")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// A convenience type alias for `Result<T, ClientError>`.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for PortError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => PortError::Unauthorized,
            ClientError::Port(inner) => inner,
            ClientError::Status { status: 404, message } => PortError::NotFound(message),
            other => PortError::Unexpected(other.to_string()),
        }
    }
}
