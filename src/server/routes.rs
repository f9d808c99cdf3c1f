use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::server::handlers::{
    claim_device_handler, health_handler, not_found_handler, root_handler,
    validate_token_handler, AppState,
};
use crate::server::logging::request_logging_middleware;

/// Build the application router.
///
/// # Routes
///
/// - `GET /` - Service banner
/// - `GET /health` - Health check
/// - `POST /api/validate-token` - Validate a token
/// - `POST /api/claim-device` - Claim or verify a device binding
///
/// Every route is wrapped in request logging and a permissive CORS policy.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/validate-token", post(validate_token_handler))
        .route("/api/claim-device", post(claim_device_handler))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
