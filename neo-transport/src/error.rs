//! Error types for the HTTP transport

use thiserror::Error;

/// Errors that can occur while exchanging a message with the device
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The exchange did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The device answered with a non-success HTTP status
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The transport could not be built from its configuration
    #[error("Transport configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else if let Some(status) = error.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}
