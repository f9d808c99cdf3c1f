// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `database`    → token store over SQLite/Postgres
//! - `arbiter`     → validation and the claim-or-verify protocol
//! - `handlers`    → Axum HTTP handlers
//! - `routes`      → Router builder
//! - `api_error`   → error envelope and HTTP status mapping
//! - `logging`     → request middleware and token events
//! - `validation`  → request validation utilities
//! - `bootstrap`   → `migrate` / `seed` maintenance commands

pub mod api_error;
pub mod arbiter;
pub mod bootstrap;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod validation;

pub use api_error::{ApiError, ErrorCode};
pub use arbiter::BindingArbiter;
pub use database::Database;
pub use handlers::{
    claim_device_handler, health_handler, root_handler, validate_token_handler, AppState,
    ClaimDeviceRequest, ClaimDeviceResponse, ValidateTokenRequest, ValidateTokenResponse,
};
pub use routes::build_router;
