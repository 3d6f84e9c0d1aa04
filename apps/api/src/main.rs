//! # Tillbook API server
//!
//! Binary entry point: logging, configuration, database, router, serve.
//!
//! ```text
//! browser / client ───► HTTP (5000) ───► axum router ───► tillbook-db ───► SQLite
//! ```

use anyhow::Context;
use tillbook_api::{build_router, ApiConfig, AppState};
use tillbook_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Tillbook API server...");

    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        address = %config.bind_address(),
        database = %config.database_path.display(),
        mode = config.environment.as_str(),
        "Configuration loaded"
    );

    let db_config = DbConfig::new(config.database_path.clone()).max_connections(config.database_max_connections);
    let db = Database::new(db_config)
        .await
        .context("Failed to open database")?;

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    let state = AppState::new(db.clone(), config);
    let app = build_router(state);

    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise info with debug for our own crates.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillbook_api=debug,tillbook_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
