//! Error types shared by the token service.
//!
//! Negative lookup and claim outcomes (unknown token, device mismatch) are not
//! errors; they are variants of [`crate::token::ValidationResult`] and
//! [`crate::token::ClaimResult`]. `TokenError` only covers requests that could
//! not be decided at all.

use std::time::Duration;

use thiserror::Error;

/// Failures that prevent the service from producing a decision.
#[derive(Debug, Error)]
pub enum TokenError {
    /// A required request field is missing or malformed.
    #[error("invalid input for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// The token store could not be reached or rejected the statement.
    #[error("token store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store operation did not complete within the configured bound.
    #[error("store operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The HTTP server could not start or stopped abnormally.
    #[error("server error: {0}")]
    ServerError(String),
}

impl TokenError {
    /// Shorthand for an [`TokenError::InvalidInput`] on `field`.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        TokenError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TokenError::InvalidInput { .. })
    }
}

/// Result alias used across the crate.
pub type TokenResult<T> = Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_display_names_field() {
        let err = TokenError::invalid_input("deviceId", "cannot be empty");
        assert_eq!(err.to_string(), "invalid input for 'deviceId': cannot be empty");
        assert!(err.is_client_error());
    }

    #[test]
    fn timeout_display_uses_millis() {
        let err = TokenError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "store operation timed out after 1500ms");
        assert!(!err.is_client_error());
    }
}
