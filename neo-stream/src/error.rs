//! Error types for the neo-stream crate.

use neo_api::ApiError;

/// Errors from the polling loop, sinks and session runner.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Invalid polling configuration; nothing was sent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A protocol exchange failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The receiving end of a channel sink has gone away
    #[error("Event sink closed")]
    SinkClosed,

    /// Writing to an output sink failed
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for results that can return a StreamError
pub type Result<T> = std::result::Result<T, StreamError>;
