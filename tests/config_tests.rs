use std::env;

use serial_test::serial;

use ukasir::config::{Environment, ServiceConfig};

const VARS: &[&str] = &[
    "UKASIR_SERVER_HOST",
    "UKASIR_SERVER_PORT",
    "PORT",
    "UKASIR_ENV",
    "UKASIR_DATABASE_TYPE",
    "UKASIR_DATABASE_URL",
    "UKASIR_DATABASE_OPERATION_TIMEOUT_MS",
    "UKASIR_LOG_LEVEL",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_load_without_environment() {
    clear_env();

    let config = ServiceConfig::load().expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.environment, Environment::Development);
    assert_eq!(config.database.db_type, "sqlite");
    assert_eq!(config.database.connect_timeout_ms, 5000);
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    env::set_var("UKASIR_SERVER_PORT", "4123");
    env::set_var("UKASIR_ENV", "Production");
    env::set_var("UKASIR_DATABASE_URL", "postgres://db.internal/ukasir");
    env::set_var("UKASIR_DATABASE_OPERATION_TIMEOUT_MS", "750");

    let config = ServiceConfig::load().expect("overrides should load");
    assert_eq!(config.server.port, 4123);
    assert!(config.server.environment.is_production());
    assert_eq!(config.database.postgres_url, "postgres://db.internal/ukasir");
    assert_eq!(config.database.operation_timeout_ms, 750);
    assert_eq!(config.bind_address(), "127.0.0.1:4123");

    clear_env();
}

#[test]
#[serial]
fn plain_port_variable_is_honoured() {
    clear_env();
    env::set_var("PORT", "8088");

    let config = ServiceConfig::load().expect("PORT should load");
    assert_eq!(config.server.port, 8088);

    clear_env();
}

#[test]
#[serial]
fn invalid_database_type_is_rejected() {
    clear_env();
    env::set_var("UKASIR_DATABASE_TYPE", "mysql");

    let err = ServiceConfig::load().unwrap_err();
    assert!(err.to_string().contains("database.db_type"));

    clear_env();
}
