//! Token store over SQLite or PostgreSQL.
//!
//! All state of the service lives in the `ukasir_token` table. The device
//! columns are only ever written by [`Database::bind_device`], whose update
//! carries the `device_id IS NULL` precondition. Concurrent claims for the same
//! unbound token therefore serialize on the row: one update affects it, every
//! other one affects nothing and observes the winner's binding.

use chrono::{NaiveDateTime, Utc};
use sqlx::{query, query_as, FromRow};
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
#[cfg(feature = "postgres")]
use std::str::FromStr;

use crate::config::{DatabaseConfig, Environment};
use crate::errors::{TokenError, TokenResult};
use crate::token::{BindOutcome, Device, Token};

/// Row layout of the `ukasir_token` table.
#[derive(Debug, Clone, FromRow)]
struct TokenRow {
    token_number: String,
    register_date: NaiveDateTime,
    status_active: bool,
    device_id: Option<String>,
    device_name: Option<String>,
    device_type: Option<String>,
    device_bound_at: Option<NaiveDateTime>,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        // The table CHECK keeps name/type NULL whenever device_id is NULL.
        let device = row.device_id.map(|device_id| Device {
            device_id,
            device_name: row.device_name,
            device_type: row.device_type,
        });

        Token {
            id: row.token_number,
            registered_at: row.register_date,
            active: row.status_active,
            device,
            bound_at: row.device_bound_at,
        }
    }
}

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS ukasir_token (
        token_number    TEXT PRIMARY KEY,
        register_date   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        status_active   INTEGER NOT NULL DEFAULT 1,
        device_id       TEXT,
        device_name     TEXT,
        device_type     TEXT,
        device_bound_at TEXT,
        CHECK (
            device_id IS NOT NULL
            OR (device_name IS NULL AND device_type IS NULL AND device_bound_at IS NULL)
        )
    )
"#;

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ukasir_token (
        token_number    VARCHAR(255) PRIMARY KEY,
        register_date   TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        status_active   BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    // Tables created before device binding existed only have the three
    // columns above, and there both of them accept NULL.
    "UPDATE ukasir_token SET register_date = CURRENT_TIMESTAMP WHERE register_date IS NULL",
    "UPDATE ukasir_token SET status_active = TRUE WHERE status_active IS NULL",
    "ALTER TABLE ukasir_token ALTER COLUMN register_date SET NOT NULL",
    "ALTER TABLE ukasir_token ALTER COLUMN status_active SET NOT NULL",
    "ALTER TABLE ukasir_token ADD COLUMN IF NOT EXISTS device_id TEXT",
    "ALTER TABLE ukasir_token ADD COLUMN IF NOT EXISTS device_name TEXT",
    "ALTER TABLE ukasir_token ADD COLUMN IF NOT EXISTS device_type TEXT",
    "ALTER TABLE ukasir_token ADD COLUMN IF NOT EXISTS device_bound_at TIMESTAMP",
    r#"
    DO $$
    BEGIN
        IF NOT EXISTS (
            SELECT 1 FROM pg_constraint WHERE conname = 'ukasir_token_device_complete'
        ) THEN
            ALTER TABLE ukasir_token ADD CONSTRAINT ukasir_token_device_complete CHECK (
                device_id IS NOT NULL
                OR (device_name IS NULL AND device_type IS NULL AND device_bound_at IS NULL)
            );
        END IF;
    END
    $$
    "#,
];

/// Conditional updates tried per claim before giving up.
const BIND_ATTEMPTS: usize = 2;

/// Decide a claim whose conditional update matched no row.
///
/// Returns `None` when the re-read token is unbound, i.e. the update should
/// be tried again.
fn classify_missed_bind(token: Option<&Token>, device: &Device) -> Option<BindOutcome> {
    match token {
        None => Some(BindOutcome::NotFound),
        Some(token) => match token.bound_device_id() {
            None => None,
            Some(id) if id == device.device_id => Some(BindOutcome::AlreadyBoundSame),
            Some(_) => Some(BindOutcome::AlreadyBoundDifferent),
        },
    }
}

/// Log a driver failure and turn it into a [`TokenError::StoreUnavailable`].
fn store_error(backend: &str, operation: &str, e: sqlx::Error) -> TokenError {
    error!("{backend} {operation} failed: {e}");
    TokenError::StoreUnavailable(format!("database error: {e}"))
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Open a connection pool for the configured backend.
    ///
    /// In production PostgreSQL connections require TLS.
    pub async fn connect(
        config: &DatabaseConfig,
        environment: Environment,
    ) -> TokenResult<Arc<Self>> {
        match config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.connect_timeout())
                    .connect(&config.sqlite_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        TokenError::StoreUnavailable(format!("failed to connect to SQLite: {e}"))
                    })?;

                info!("Connected to SQLite at {}", config.sqlite_url);
                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(TokenError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let mut options = PgConnectOptions::from_str(&config.postgres_url)
                    .map_err(|e| TokenError::ConfigError(format!("invalid postgres url: {e}")))?;
                if environment.is_production() {
                    options = options.ssl_mode(PgSslMode::Require);
                }

                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.connect_timeout())
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        TokenError::StoreUnavailable(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                info!("Connected to PostgreSQL ({environment})");
                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => {
                let _ = environment;
                Err(TokenError::ConfigError(
                    "PostgreSQL support not compiled in. Enable the 'postgres' feature."
                        .to_string(),
                ))
            }
            other => Err(TokenError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Backend name, for health reporting.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the token table if it does not exist yet.
    pub async fn ensure_schema(&self) -> TokenResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(SQLITE_SCHEMA)
                    .execute(pool)
                    .await
                    .map_err(|e| store_error("SQLite", "ensure_schema", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                for statement in POSTGRES_SCHEMA {
                    query(*statement)
                        .execute(pool)
                        .await
                        .map_err(|e| store_error("Postgres", "ensure_schema", e))?;
                }
            }
        }

        Ok(())
    }

    /// Quick connectivity probe.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await,
        };
        result.is_ok()
    }

    /// Fetch a token by its identifier.
    ///
    /// Returns:
    /// - `Ok(Some(Token))` if found
    /// - `Ok(None)` if not found
    /// - `Err(TokenError::StoreUnavailable)` on DB failure
    pub async fn get_token(&self, token_id: &str) -> TokenResult<Option<Token>> {
        let row = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_as::<_, TokenRow>("SELECT * FROM ukasir_token WHERE token_number = ?")
                    .bind(token_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| store_error("SQLite", "get_token", e))?
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, TokenRow>("SELECT * FROM ukasir_token WHERE token_number = $1")
                    .bind(token_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| store_error("Postgres", "get_token", e))?
            }
        };

        Ok(row.map(Token::from))
    }

    /// Bind `device` to the token if, and only if, the token is unbound.
    ///
    /// The write is one conditional `UPDATE`. When it affects no row the token
    /// is re-read to see the binding that defeated the update (or no row at
    /// all). If the re-read finds the token unbound again, its binding was
    /// cleared out of band in between and the update is tried once more.
    pub async fn bind_device(&self, token_id: &str, device: &Device) -> TokenResult<BindOutcome> {
        for _ in 0..BIND_ATTEMPTS {
            if self.conditional_bind(token_id, device).await? > 0 {
                return Ok(BindOutcome::Bound);
            }

            let token = self.get_token(token_id).await?;
            match classify_missed_bind(token.as_ref(), device) {
                Some(outcome) => return Ok(outcome),
                None => warn!(token_id = %token_id, "Binding cleared during claim, retrying"),
            }
        }

        Err(TokenError::StoreUnavailable(format!(
            "binding of token {token_id} kept changing during claim"
        )))
    }

    /// The single conditional write. Returns the number of rows updated.
    async fn conditional_bind(&self, token_id: &str, device: &Device) -> TokenResult<u64> {
        let now = Utc::now().naive_utc();

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE ukasir_token \
                     SET device_id = ?, device_name = ?, device_type = ?, device_bound_at = ? \
                     WHERE token_number = ? AND device_id IS NULL",
            )
            .bind(&device.device_id)
            .bind(&device.device_name)
            .bind(&device.device_type)
            .bind(now)
            .bind(token_id)
            .execute(pool)
            .await
            .map_err(|e| store_error("SQLite", "bind_device", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE ukasir_token \
                     SET device_id = $1, device_name = $2, device_type = $3, device_bound_at = $4 \
                     WHERE token_number = $5 AND device_id IS NULL",
            )
            .bind(&device.device_id)
            .bind(&device.device_name)
            .bind(&device.device_type)
            .bind(now)
            .bind(token_id)
            .execute(pool)
            .await
            .map_err(|e| store_error("Postgres", "bind_device", e))?
            .rows_affected(),
        };

        Ok(rows_affected)
    }

    /// Provision a token, leaving an existing row untouched.
    ///
    /// Returns `true` if a new row was inserted.
    pub async fn insert_token(&self, token_id: &str, active: bool) -> TokenResult<bool> {
        let now = Utc::now().naive_utc();

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "INSERT INTO ukasir_token (token_number, register_date, status_active) \
                     VALUES (?, ?, ?) \
                     ON CONFLICT(token_number) DO NOTHING",
            )
            .bind(token_id)
            .bind(now)
            .bind(active)
            .execute(pool)
            .await
            .map_err(|e| store_error("SQLite", "insert_token", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "INSERT INTO ukasir_token (token_number, register_date, status_active) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (token_number) DO NOTHING",
            )
            .bind(token_id)
            .bind(now)
            .bind(active)
            .execute(pool)
            .await
            .map_err(|e| store_error("Postgres", "insert_token", e))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }
}
