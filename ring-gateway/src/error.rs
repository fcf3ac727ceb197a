//! Error types for gateway operations.

use thiserror::Error;

/// Errors that can occur when talking to the monitoring gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport failed mid-request
    #[error("http error: {0}")]
    Http(String),

    /// Connection to the gateway failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The gateway returned a non-success status for a data-path operation
    #[error("gateway returned {code}: {payload}")]
    Protocol {
        /// HTTP status code.
        code: u16,
        /// Response body, verbatim.
        payload: String,
    },

    /// A success response carried a payload the client could not interpret
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// A single-value get found zero or several values
    #[error("expected exactly one value, found {found}")]
    SingleValueExpected {
        /// Number of values the key actually held.
        found: usize,
    },
}

impl GatewayError {
    /// Whether a bounded client-side retry may resolve this error.
    ///
    /// Covers transport failures and non-success replies, the expected noise
    /// while nodes are being killed and respawned underneath the gateway.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Http(_)
                | GatewayError::ConnectionFailed(_)
                | GatewayError::Protocol { .. }
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            GatewayError::ConnectionFailed(e.to_string())
        } else {
            GatewayError::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = GatewayError::Protocol {
            code: 404,
            payload: "no such domain".into(),
        };
        assert_eq!(err.to_string(), "gateway returned 404: no such domain");
    }

    #[test]
    fn transient_classification() {
        assert!(GatewayError::ConnectionFailed("refused".into()).is_transient());
        assert!(GatewayError::Protocol {
            code: 503,
            payload: String::new()
        }
        .is_transient());
        assert!(!GatewayError::SingleValueExpected { found: 2 }.is_transient());
        assert!(!GatewayError::UnexpectedPayload("garbage".into()).is_transient());
    }
}
