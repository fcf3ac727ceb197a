//! Error types for ring identities.

use thiserror::Error;

/// Errors that can occur when parsing ring identities from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    /// Identity token has the wrong length (expected 32 hex chars)
    #[error("identity must be 32 hex chars, got {0}")]
    BadLength(usize),

    /// Identity token contains a non-hex character
    #[error("identity contains non-hex character: {0:?}")]
    BadChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = IdParseError::BadLength(7);
        assert_eq!(err.to_string(), "identity must be 32 hex chars, got 7");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IdParseError>();
    }
}
