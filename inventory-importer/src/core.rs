//! Orchestration of one import run: snapshot first, then reconcile.

use anyhow::Context;
use inventory::store::{StoreSession, backup};
use inventory::{PageFailurePolicy, ReconcileConfig, Reconciler, StoreConfig, feed};
use tracing::info;

use crate::Args;

pub async fn run(args: Args) -> anyhow::Result<()> {
    info!(
        database = %args.database.display(),
        feed = %args.feed.display(),
        chunk_size = args.chunk_size,
        "starting inventory import"
    );

    let batch = feed::read_feed(&args.feed)
        .await
        .context("reading normalized feed")?;
    info!(records = batch.len(), "feed loaded");

    let policy = if args.abort_on_page_failure {
        PageFailurePolicy::Abort
    } else {
        PageFailurePolicy::BestEffort
    };
    let config = ReconcileConfig::default()
        .with_chunk_size(args.chunk_size)
        .with_page_failure_policy(policy)
        .with_modified_by(args.modified_by.clone());
    config.validate()?;

    let store_config =
        StoreConfig::new(args.database.clone()).with_connect_retries(args.connect_retries);
    let mut session = StoreSession::connect(&store_config).await?;

    // No reconciliation without a successful snapshot.
    let handle = backup::snapshot(&mut session, &args.backup_dir).await?;
    info!(backup = %handle.path().display(), "store snapshot taken");

    let summary = Reconciler::new(config).reconcile(&mut session, batch).await?;

    info!(
        pages = summary.pages_processed,
        updated = summary.rows_updated,
        inserted = summary.rows_inserted,
        failed_pages = summary.failed_pages,
        "import completed"
    );

    session.close().await?;

    Ok(())
}
