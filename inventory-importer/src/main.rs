//! CLI binary for the inventory importer.

use std::path::PathBuf;

use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

mod core;

/// Inventory Importer - reconciles a normalized vehicle feed into the store.
#[derive(Parser, Debug)]
#[command(name = "inventory-importer")]
#[command(about = "Reconciles a normalized vehicle feed into the inventory store")]
struct Args {
    /// Path to the inventory SQLite database
    #[arg(long, default_value = "inventory.db")]
    database: PathBuf,

    /// Path to the normalized feed (NDJSON, one record per line)
    #[arg(long)]
    feed: PathBuf,

    /// Number of stored rows reconciled per page
    #[arg(long, default_value = "3")]
    chunk_size: usize,

    /// Directory receiving timestamped database backups
    #[arg(long, default_value = "database_backups")]
    backup_dir: PathBuf,

    /// Abort the run on the first failed page instead of continuing
    #[arg(long)]
    abort_on_page_failure: bool,

    /// Actor recorded in the audit columns
    #[arg(long, default_value = "inventory-importer")]
    modified_by: String,

    /// Number of store connection retries before giving up
    #[arg(long, default_value = "5")]
    connect_retries: u32,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args = Args::parse();
    if let Err(e) = core::run(args).await {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}
