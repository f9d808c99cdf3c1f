//! Standardized API error responses.
//!
//! # Response Format
//!
//! ```json
//! {
//!   "error": {
//!     "code": "MULTI_DEVICE_NOT_ALLOWED",
//!     "message": "Multi-device login not allowed",
//!     "details": null
//!   }
//! }
//! ```
//!
//! The `details` field is optional. For internal failures it is only filled in
//! when the server runs in development mode.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::TokenError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Request Errors (400) ===
    /// Request body is not valid JSON for the endpoint
    InvalidRequest,
    /// A required field is missing
    MissingField,
    /// A field value is invalid
    InvalidField,

    // === Token Errors (4xx) ===
    /// Token is unknown (or, for validation, inactive)
    TokenNotFound,
    /// Token is bound to a different device
    MultiDeviceNotAllowed,

    // === Server Errors (5xx) ===
    /// Store failure, store timeout or any other unexpected error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::MissingField | ErrorCode::InvalidField => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::MultiDeviceNotAllowed => StatusCode::FORBIDDEN,
            ErrorCode::TokenNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::MissingField => "A required field is missing",
            ErrorCode::InvalidField => "A field value is invalid",
            ErrorCode::TokenNotFound => "Token not found",
            ErrorCode::MultiDeviceNotAllowed => "Multi-device login not allowed",
            ErrorCode::InternalError => "Internal Server Error",
        }
    }
}

/// The inner error object containing code, message, and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new API error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    /// Creates a new API error with a custom message and details.
    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    // === Convenience constructors ===

    /// Validation outcome for unknown and inactive tokens alike.
    pub fn token_not_found_or_inactive() -> Self {
        Self::with_message(ErrorCode::TokenNotFound, "Token not found or inactive")
    }

    /// Claim outcome for unknown tokens.
    pub fn token_not_found() -> Self {
        Self::new(ErrorCode::TokenNotFound)
    }

    /// Claim outcome for a token bound to another device.
    pub fn multi_device_not_allowed() -> Self {
        Self::new(ErrorCode::MultiDeviceNotAllowed)
    }

    /// Missing required field error.
    pub fn missing_field(field: &str) -> Self {
        Self::with_details(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
            serde_json::json!({ "field": field }),
        )
    }

    /// Invalid field value error.
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::with_details(
            ErrorCode::InvalidField,
            format!("Invalid value for '{}': {}", field, reason),
            serde_json::json!({ "field": field }),
        )
    }

    /// Map a service error to its response.
    ///
    /// Internal error text is attached only when `expose_details` is set
    /// (development mode).
    pub fn from_token_error(err: TokenError, expose_details: bool) -> Self {
        let internal = |code: ErrorCode, err: &TokenError| {
            if expose_details {
                Self::with_details(
                    code,
                    code.default_message(),
                    serde_json::Value::String(err.to_string()),
                )
            } else {
                Self::new(code)
            }
        };

        match err {
            TokenError::InvalidInput { field, message } => Self::invalid_field(&field, &message),
            // A slow store and an unreachable one look the same to callers.
            TokenError::Timeout(_)
            | TokenError::StoreUnavailable(_)
            | TokenError::ConfigError(_)
            | TokenError::ServerError(_) => internal(ErrorCode::InternalError, &err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}
