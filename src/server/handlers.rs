//! HTTP handlers for token validation and device claims.
//!
//! # Endpoints
//!
//! - `GET /` - Service banner
//! - `GET /health` - Health check with database connectivity
//! - `POST /api/validate-token` - Check a token exists and is active
//! - `POST /api/claim-device` - Bind a device to a token or verify the binding

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::server::api_error::{ApiError, ErrorCode};
use crate::server::arbiter::BindingArbiter;
use crate::server::database::Database;
use crate::server::logging::HealthResponse;
use crate::token::{ClaimResult, Device, TokenSummary, ValidationResult};

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub arbiter: Arc<BindingArbiter>,
    pub db: Arc<Database>,
    /// Attach internal error text to 5xx responses (development mode only).
    pub expose_errors: bool,
}

impl AppState {
    pub fn new(db: Arc<Database>, arbiter: BindingArbiter, expose_errors: bool) -> Self {
        Self {
            arbiter: Arc::new(arbiter),
            db,
            expose_errors,
        }
    }

    fn api_error(&self, err: crate::errors::TokenError) -> ApiError {
        ApiError::from_token_error(err, self.expose_errors)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to validate a token.
#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Response from a successful validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub data: TokenSummary,
}

/// Request to claim (or re-confirm) a token for a device.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDeviceRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

/// Response from a successful claim.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimDeviceResponse {
    pub success: bool,
    /// "registered" or "verified"
    pub status: String,
    pub message: String,
}

/// Service banner.
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Ukasir Offline API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check. Always 200; a failed database probe reports "degraded".
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.db.ping().await;
    Json(HealthResponse::new(connected, state.db.db_type()))
}

/// Validate a token.
///
/// # Behavior
/// - Missing or blank `token` is rejected before the store is touched
/// - Unknown and inactive tokens both answer 404 "Token not found or inactive"
/// - Active tokens answer with id, registration date and active flag
pub async fn validate_token_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateTokenRequest>, JsonRejection>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    let Json(req) = payload.map_err(reject_body)?;
    let token = required(req.token, "token")?;

    match state
        .arbiter
        .validate(&token)
        .await
        .map_err(|e| state.api_error(e))?
    {
        ValidationResult::Valid(data) => Ok(Json(ValidateTokenResponse { valid: true, data })),
        ValidationResult::NotFound => Err(ApiError::token_not_found_or_inactive()),
    }
}

/// Claim a token for a device, or verify an existing claim.
///
/// # Behavior
/// - Unbound token: bound to the device, "device registered"
/// - Bound to this device: "device verified"
/// - Bound to another device: 403 MULTI_DEVICE_NOT_ALLOWED
/// - Unknown token: 404 TOKEN_NOT_FOUND
pub async fn claim_device_handler(
    State(state): State<AppState>,
    payload: Result<Json<ClaimDeviceRequest>, JsonRejection>,
) -> Result<Json<ClaimDeviceResponse>, ApiError> {
    let Json(req) = payload.map_err(reject_body)?;
    let token = required(req.token, "token")?;
    let device = Device {
        device_id: required(req.device_id, "deviceId")?,
        device_name: req.device_name,
        device_type: req.device_type,
    };

    let result = state
        .arbiter
        .claim_or_verify(&token, &device)
        .await
        .map_err(|e| state.api_error(e))?;

    match result {
        ClaimResult::Registered => Ok(Json(ClaimDeviceResponse {
            success: true,
            status: "registered".to_string(),
            message: "Device registered".to_string(),
        })),
        ClaimResult::Verified => Ok(Json(ClaimDeviceResponse {
            success: true,
            status: "verified".to_string(),
            message: "Device verified".to_string(),
        })),
        ClaimResult::Rejected => Err(ApiError::multi_device_not_allowed()),
        ClaimResult::TokenNotFound => Err(ApiError::token_not_found()),
    }
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> (StatusCode, Json<ApiError>) {
    let err = ApiError::with_message(ErrorCode::InvalidRequest, "Unknown endpoint");
    (StatusCode::NOT_FOUND, Json(err))
}

// ============================================================================
// Helpers
// ============================================================================

/// A required field must be present and not blank.
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    ApiError::with_message(ErrorCode::InvalidRequest, rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert_eq!(required(Some("D1".to_string()), "deviceId").unwrap(), "D1");
        let err = required(None, "token").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MissingField);
        let err = required(Some("  ".to_string()), "token").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MissingField);
    }

    #[test]
    fn claim_request_reads_camel_case() {
        let req: ClaimDeviceRequest = serde_json::from_str(
            r#"{"token":"9999-0000-1111-2222","deviceId":"D1","deviceName":"Kasir"}"#,
        )
        .unwrap();
        assert_eq!(req.device_id.as_deref(), Some("D1"));
        assert_eq!(req.device_name.as_deref(), Some("Kasir"));
        assert!(req.device_type.is_none());
    }
}
