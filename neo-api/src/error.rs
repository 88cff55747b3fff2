use neo_transport::TransportError;
use thiserror::Error;

/// High-level API errors for neo protocol exchanges
///
/// This enum separates failures by where they happened: the exchange never
/// completed (`Transport`), the device answered with a rejection (`Auth`,
/// `Subscription`, `Rejected`), or the answer could not be understood
/// (`MalformedResponse`). `InvalidState` and `InvalidParameter` are raised
/// before anything is sent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or HTTP-level failure
    ///
    /// Connection-establishment failures have already been retried by the
    /// transport by the time this surfaces.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device rejected the login
    ///
    /// `code` and `message` are the device's own reason code and text, e.g.
    /// `Unknown_Error` / "Number of sessions exceeded the maximum of 8.".
    #[error("Login rejected ({code}): {message}")]
    Auth { code: String, message: String },

    /// The device rejected a subscription add or remove
    #[error("Subscription rejected ({code}): {message}")]
    Subscription { code: String, message: String },

    /// The device rejected some other command (logout, get event)
    #[error("{operation} rejected ({code}): {message}")]
    Rejected {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// Response XML could not be parsed or lacked a required field
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The operation is not valid in the client's current state
    ///
    /// Nothing was sent to the device.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A request parameter has an invalid value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The request could not be serialized
    #[error("Codec error: {0}")]
    Codec(String),
}

impl ApiError {
    /// Device reason code carried by a rejection, if any
    pub fn reason_code(&self) -> Option<&str> {
        match self {
            ApiError::Auth { code, .. }
            | ApiError::Subscription { code, .. }
            | ApiError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_conversion() {
        let api_error: ApiError = TransportError::Timeout("5s elapsed".to_string()).into();
        assert!(matches!(api_error, ApiError::Transport(TransportError::Timeout(_))));

        let api_error: ApiError = TransportError::Status(503).into();
        assert_eq!(format!("{}", api_error), "Transport error: Unexpected HTTP status 503");
    }

    #[test]
    fn test_auth_error_display_is_verbatim() {
        let error = ApiError::Auth {
            code: "Unknown_Error".to_string(),
            message: "Number of sessions exceeded the maximum of 8.".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Login rejected (Unknown_Error): Number of sessions exceeded the maximum of 8."
        );
        assert_eq!(error.reason_code(), Some("Unknown_Error"));
    }

    #[test]
    fn test_reason_code_absent_for_local_errors() {
        assert_eq!(ApiError::InvalidState("no session".to_string()).reason_code(), None);
        assert_eq!(ApiError::MalformedResponse("bad xml".to_string()).reason_code(), None);
    }
}
