//! lexdir-api - HTTP service for the law-firm directory portal
//!
//! User auth, firm/branch CRUD, the lead marketplace, notifications, and the
//! one-way push of firm data into the CMS and search index.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexdir_api::{build_router, AppState};
use lexdir_common::config;
use lexdir_common::db::init_database;

/// Command-line arguments for lexdir-api
#[derive(Parser, Debug)]
#[command(name = "lexdir-api")]
#[command(about = "Law-firm directory portal backend")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "LEXDIR_PORT")]
    port: u16,

    /// Root folder containing lexdir.db
    #[arg(short, long, env = "LEXDIR_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexdir_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting lexdir-api v{}", env!("CARGO_PKG_VERSION"));

    let root_folder =
        config::resolve_root_folder(args.root_folder.as_deref(), "LEXDIR_ROOT_FOLDER");
    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(pool);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("lexdir-api listening on http://{}", addr);
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
