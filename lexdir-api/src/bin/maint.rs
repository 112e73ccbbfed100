//! lexdir-maint - one-off maintenance commands
//!
//! Thin CLI over the library functions: reconcile every firm, import from
//! the CMS, collapse duplicate slugs, flush the email digest queue. Invoked
//! manually; there is no scheduler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexdir_api::db::firms;
use lexdir_api::services::{mailer, sync};
use lexdir_common::config;
use lexdir_common::db::init_database;

#[derive(Parser, Debug)]
#[command(name = "lexdir-maint")]
#[command(about = "Maintenance commands for the directory portal")]
#[command(version)]
struct Args {
    /// Root folder containing lexdir.db
    #[arg(short, long, env = "LEXDIR_ROOT_FOLDER")]
    root_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile every non-deleted firm with the CMS and search index
    SyncAll,
    /// Pull firm posts from the CMS and upsert them locally by slug
    ImportCms,
    /// Collapse duplicate firm slugs, keeping the oldest row
    DedupFirms,
    /// Send queued daily-summary emails
    FlushDigests,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexdir_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let root_folder =
        config::resolve_root_folder(args.root_folder.as_deref(), "LEXDIR_ROOT_FOLDER");
    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match args.command {
        Command::SyncAll => {
            let reports = sync::sync_all(&pool).await?;
            for (guid, report) in &reports {
                info!(firm = %guid, cms = ?report.cms, search = ?report.search, "Synced");
            }
            println!("Synced {} firms", reports.len());
        }
        Command::ImportCms => {
            let summary = sync::import_from_cms(&pool).await?;
            println!(
                "Import finished: {} created, {} updated",
                summary.created, summary.updated
            );
        }
        Command::DedupFirms => {
            let removed = firms::dedup_firms(&pool).await?;
            println!("Removed {} duplicate firm rows", removed);
        }
        Command::FlushDigests => {
            let flushed = mailer::flush_digests(&pool).await?;
            println!("Flushed {} digest entries", flushed);
        }
    }

    Ok(())
}
