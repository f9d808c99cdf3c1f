//! Shared helpers for token service tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

use ukasir::errors::{TokenError, TokenResult};
use ukasir::server::{BindingArbiter, Database};

pub const SEED_TOKEN: &str = "9999-0000-1111-2222";
pub const UNKNOWN_TOKEN: &str = "0000-0000-0000-0000";

/// Single-connection in-memory SQLite pool, so every query sees the same database.
pub async fn memory_pool() -> TokenResult<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| TokenError::StoreUnavailable(format!("db connect failed: {e}")))
}

/// File-backed SQLite store with a pool of `max_connections`, so statements
/// from different tasks really run side by side. Keep the returned directory
/// alive for as long as the store is used.
pub async fn setup_file_db(max_connections: u32) -> TokenResult<(TempDir, Arc<Database>)> {
    let dir = tempfile::tempdir()
        .map_err(|e| TokenError::StoreUnavailable(format!("tempdir failed: {e}")))?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ukasir.db").display());

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .map_err(|e| TokenError::StoreUnavailable(format!("db connect failed: {e}")))?;
    let db = Arc::new(Database::SQLite(pool));
    db.ensure_schema().await?;
    Ok((dir, db))
}

/// In-memory store with the token table created.
pub async fn setup_in_memory_db() -> TokenResult<Arc<Database>> {
    let pool = memory_pool().await?;
    let db = Arc::new(Database::SQLite(pool));
    db.ensure_schema().await?;
    Ok(db)
}

/// Arbiter with a generous timeout over `db`.
pub fn arbiter(db: &Arc<Database>) -> BindingArbiter {
    BindingArbiter::new(db.clone(), Duration::from_secs(5))
}
