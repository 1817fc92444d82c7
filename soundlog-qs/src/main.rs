//! soundlog-qs (Query Service) - Main entry point
//!
//! Serves the windowed `/api/audio_logs` contract over the append-only
//! event store. This process never writes: the store belongs to the
//! external classifier pipeline, which must have created it already.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use soundlog_common::config::{database_path, resolve_root_folder, ROOT_FOLDER_ENV};
use soundlog_common::db::connect_readonly;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundlog_qs::{build_router, AppState};

/// Command-line arguments for soundlog-qs
#[derive(Parser, Debug)]
#[command(name = "soundlog-qs")]
#[command(about = "Windowed query service for acoustic classification events")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "SOUNDLOG_QS_PORT")]
    port: u16,

    /// Root folder containing soundlog.db
    #[arg(short, long, env = "SOUNDLOG_ROOT")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundlog_qs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    // Log build identification immediately after tracing init
    info!(
        "Starting soundlog Query Service (soundlog-qs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV)?;
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    // Read-only connection; fails fast when the pipeline has not
    // created the store yet
    let pool = connect_readonly(&db_path)
        .await
        .context("Failed to connect to event database")?;
    info!("Connected to event database (read-only)");

    let state = AppState::new(pool);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("soundlog-qs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
