use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ukasir::config::{get_config, ServiceConfig};
use ukasir::errors::{TokenError, TokenResult};
use ukasir::server::bootstrap::{execute_command, parse_command, Command, USAGE};
use ukasir::server::{build_router, AppState, BindingArbiter, Database};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(&args);
    if let Command::Invalid(other) = &command {
        eprintln!("unknown command '{other}'\n{USAGE}");
        return ExitCode::FAILURE;
    }

    match run(config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &ServiceConfig, command: Command) -> TokenResult<()> {
    let environment = config.server.environment;
    let db = Database::connect(&config.database, environment).await?;

    if execute_command(&db, &command).await? {
        return Ok(());
    }

    if config.database.auto_migrate {
        db.ensure_schema().await?;
    }

    let arbiter = BindingArbiter::new(db.clone(), config.database.operation_timeout());
    let state = AppState::new(db, arbiter, !environment.is_production());
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| TokenError::ServerError(format!("failed to bind {addr}: {e}")))?;

    info!("Server is running on http://{addr} ({environment})");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TokenError::ServerError(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
