//! Request validation utilities.
//!
//! Token identifiers are only checked for presence. Their format is reported
//! for diagnostics but never used to reject a request: a malformed identifier
//! resolves through the same store lookup as an unregistered one.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::TokenError;

/// Longest accepted device descriptor field.
pub const MAX_DEVICE_FIELD_LEN: usize = 255;

lazy_static! {
    static ref TOKEN_FORMAT: Regex =
        Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{4}$").expect("token format regex is valid");
}

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for TokenError {
    fn from(err: ValidationError) -> Self {
        TokenError::InvalidInput {
            field: err.field,
            message: err.message,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Whether `value` looks like a `NNNN-NNNN-NNNN-NNNN` token number.
///
/// # Example
/// ```
/// use ukasir::server::validation::matches_token_format;
///
/// assert!(matches_token_format("9999-0000-1111-2222"));
/// assert!(!matches_token_format("ABCD-0000-1111-2222"));
/// ```
pub fn matches_token_format(value: &str) -> bool {
    TOKEN_FORMAT.is_match(value)
}

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use ukasir::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "name").is_ok());
/// assert!(validate_not_empty("", "name").is_err());
/// assert!(validate_not_empty("   ", "name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate string length is within bounds.
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at least {} characters", min),
        })
    } else if len > max {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {} characters", max),
        })
    } else {
        Ok(())
    }
}

/// Validate an optional descriptive field: absent is fine, present must fit.
pub fn validate_optional_length(
    value: Option<&str>,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    match value {
        Some(v) => validate_length(v, 0, max, field_name),
        None => Ok(()),
    }
}

/// Validate a device identifier: present, non-blank and bounded.
pub fn validate_device_id(value: &str, field_name: &str) -> ValidationResult<()> {
    validate_not_empty(value, field_name)?;
    validate_length(value, 1, MAX_DEVICE_FIELD_LEN, field_name)
}
