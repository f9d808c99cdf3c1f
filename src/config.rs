//! Configuration system for the token service.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `UKASIR_SERVER_HOST` - Server bind address
//! - `UKASIR_SERVER_PORT` (or `PORT`) - Server port
//! - `UKASIR_ENV` - `development` or `production`
//! - `UKASIR_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `UKASIR_DATABASE_URL` - Database connection URL
//! - `UKASIR_DATABASE_MAX_CONNECTIONS` - Pool size
//! - `UKASIR_DATABASE_CONNECT_TIMEOUT_MS` - Pool acquire timeout
//! - `UKASIR_DATABASE_OPERATION_TIMEOUT_MS` - Per store operation timeout
//! - `UKASIR_DATABASE_AUTO_MIGRATE` - Create the schema on startup
//! - `UKASIR_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::errors::{TokenError, TokenResult};

/// Process-wide cache of the first successfully loaded configuration.
static CONFIG: OnceLock<ServiceConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Deployment mode. Only development mode leaks internal error text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Deployment mode
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: Environment::Development,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// How long to wait for a pooled connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Upper bound for a single store operation, in milliseconds
    pub operation_timeout_ms: u64,
    /// Create the token table on startup if it is missing
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://ukasir.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/ukasir".to_string(),
            max_connections: 10,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 5000,
            auto_migrate: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> TokenError {
    TokenError::ConfigError(e.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl ServiceConfig {
    /// Load configuration from file and environment, then validate it.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> TokenResult<Self> {
        let defaults = DatabaseConfig::default();

        let builder = Config::builder()
            .set_default("server.host", "127.0.0.1")
            .map_err(config_err)?
            .set_default("server.port", 3000)
            .map_err(config_err)?
            .set_default("server.environment", "development")
            .map_err(config_err)?
            .set_default("database.db_type", defaults.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.postgres_url)
            .map_err(config_err)?
            .set_default("database.max_connections", defaults.max_connections)
            .map_err(config_err)?
            .set_default("database.connect_timeout_ms", defaults.connect_timeout_ms)
            .map_err(config_err)?
            .set_default(
                "database.operation_timeout_ms",
                defaults.operation_timeout_ms,
            )
            .map_err(config_err)?
            .set_default("database.auto_migrate", defaults.auto_migrate)
            .map_err(config_err)?
            .set_default("logging.level", "info")
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("UKASIR_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option(
                "server.port",
                env_parsed::<i64>("UKASIR_SERVER_PORT").or_else(|| env_parsed::<i64>("PORT")),
            )
            .map_err(config_err)?
            .set_override_option(
                "server.environment",
                env::var("UKASIR_ENV").ok().map(|v| v.to_lowercase()),
            )
            .map_err(config_err)?
            .set_override_option("database.db_type", env::var("UKASIR_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("UKASIR_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("UKASIR_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.max_connections",
                env_parsed::<i64>("UKASIR_DATABASE_MAX_CONNECTIONS"),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.connect_timeout_ms",
                env_parsed::<i64>("UKASIR_DATABASE_CONNECT_TIMEOUT_MS"),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.operation_timeout_ms",
                env_parsed::<i64>("UKASIR_DATABASE_OPERATION_TIMEOUT_MS"),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.auto_migrate",
                env_parsed::<bool>("UKASIR_DATABASE_AUTO_MIGRATE"),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("UKASIR_LOG_LEVEL").ok())
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| TokenError::ConfigError(format!("failed to build config: {e}")))?;

        let config: ServiceConfig = settings
            .try_deserialize()
            .map_err(|e| TokenError::ConfigError(format!("failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> TokenResult<()> {
        if self.server.port == 0 {
            return Err(TokenError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(TokenError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(TokenError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.connect_timeout_ms == 0 || self.database.operation_timeout_ms == 0 {
            return Err(TokenError::ConfigError(
                "database timeouts must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(TokenError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Socket address string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the process-wide configuration.
///
/// Loads on first access and caches the result. Library components never call
/// this; the binary hands the relevant sections to them explicitly.
pub fn get_config() -> TokenResult<&'static ServiceConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = ServiceConfig::load()?;

    // Another thread may have won the race; either value is equivalent.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| TokenError::ConfigError("configuration cache is empty".to_string()))
}
