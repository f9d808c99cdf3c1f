//! Request logging middleware and structured domain events.
//!
//! - Unique request ID per call, echoed in the `X-Request-Id` header
//! - Request timing
//! - Token validation and device binding events for auditing
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use ukasir::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/health", get(health_handler))
//!     .layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Token and binding event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    /// Token exists and is active
    Validated,
    /// Token is unknown or inactive
    ValidationFailed,
    /// First claim bound the token to a device
    Registered,
    /// Bound device re-confirmed ownership
    Verified,
    /// Claim from a device other than the bound one
    Rejected,
    /// Claim for an unknown token
    ClaimFailed,
}

impl TokenEvent {
    fn is_denial(self) -> bool {
        matches!(
            self,
            TokenEvent::ValidationFailed | TokenEvent::Rejected | TokenEvent::ClaimFailed
        )
    }
}

impl std::fmt::Display for TokenEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenEvent::Validated => "validated",
            TokenEvent::ValidationFailed => "validation_failed",
            TokenEvent::Registered => "registered",
            TokenEvent::Verified => "verified",
            TokenEvent::Rejected => "rejected",
            TokenEvent::ClaimFailed => "claim_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log a token event. Denials are logged at `warn`.
pub fn log_token_event(event: TokenEvent, token_id: &str, details: Option<&str>) {
    let span = info_span!(
        "token_event",
        event = %event,
        token_id = %token_id,
    );
    let _enter = span.enter();

    match (event.is_denial(), details) {
        (true, Some(d)) => warn!(reason = %d, "Token event occurred"),
        (true, None) => warn!("Token event occurred"),
        (false, Some(d)) => info!(details = %d, "Token event occurred"),
        (false, None) => info!("Token event occurred"),
    }
}

/// Log the outcome of a device claim against a token.
pub fn log_binding_event(
    event: TokenEvent,
    token_id: &str,
    device_id: &str,
    device_name: Option<&str>,
) {
    let span = info_span!(
        "token_binding",
        event = %event,
        token_id = %token_id,
        device_id = %device_id,
    );
    let _enter = span.enter();

    let device_name = device_name.unwrap_or("-");
    if event.is_denial() {
        warn!(device_name = %device_name, "Token binding event occurred");
    } else {
        info!(device_name = %device_name, "Token binding event occurred");
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// Everything the handler logs is recorded inside the request span.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Database connectivity status
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    /// Whether the database answered a probe
    pub connected: bool,
    /// Database type (sqlite or postgres)
    pub db_type: String,
}

impl HealthResponse {
    pub fn new(db_connected: bool, db_type: &str) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
                db_type: db_type.to_string(),
            },
        }
    }
}
