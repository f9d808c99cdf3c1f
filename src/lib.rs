//! Ukasir token service - license token validation with single-device binding.
//!
//! A token is validated by existence and activity. The first device that
//! claims a token becomes its permanent owner; later claims from that device
//! are verified and claims from any other device are rejected.
//!
//! # Features
//!
//! - `server` - HTTP handlers, router and the sqlx token store. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//!
//! # Example
//!
//! ```toml
//! # Defaults (server + sqlite)
//! ukasir-token = { path = "." }
//!
//! # Server with PostgreSQL
//! ukasir-token = { path = ".", default-features = false, features = ["server", "postgres"] }
//! ```

pub mod config;
pub mod errors;
pub mod token;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
