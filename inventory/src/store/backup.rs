//! Pre-run snapshot of the store.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::{InventoryError, InventoryResult};
use crate::store::StoreSession;

/// Timestamp suffix of backup artifacts: `-YYYYMMDD-HHMMSS`.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Handle to a completed snapshot.
#[derive(Debug)]
pub struct BackupHandle {
    path: PathBuf,
}

impl BackupHandle {
    /// Returns the path of the backup artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Copies the store's database file to a timestamped backup artifact.
///
/// The copy runs under a reserved lock (`BEGIN IMMEDIATE`): concurrent
/// readers proceed, concurrent writers block until the bytes are copied and
/// the transaction is rolled back. The transaction exists only to hold the
/// lock — no data is mutated. The backup directory is created idempotently;
/// any other I/O failure is fatal, and no reconciliation may proceed without
/// a successful snapshot.
pub async fn snapshot(
    session: &mut StoreSession,
    backup_dir: &Path,
) -> InventoryResult<BackupHandle> {
    if session.is_in_memory() {
        return Err(InventoryError::Backup(
            "an in-memory store has no file to snapshot".to_string(),
        ));
    }

    tokio::fs::create_dir_all(backup_dir).await.map_err(|error| {
        InventoryError::Backup(format!(
            "could not create backup directory `{}`: {error}",
            backup_dir.display()
        ))
    })?;

    let file_name = session
        .database_path()
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            InventoryError::Backup(format!(
                "store path `{}` has no file name",
                session.database_path().display()
            ))
        })?;
    let stamp = Local::now().format(BACKUP_STAMP_FORMAT);
    let backup_path = backup_dir.join(format!("{file_name}-{stamp}"));

    sqlx::query("BEGIN IMMEDIATE")
        .execute(session.connection())
        .await?;

    let copied = tokio::fs::copy(session.database_path(), &backup_path).await;

    // Release the write block even when the copy failed.
    let released = sqlx::query("ROLLBACK").execute(session.connection()).await;

    copied.map_err(|error| {
        InventoryError::Backup(format!(
            "could not copy `{}` to `{}`: {error}",
            session.database_path().display(),
            backup_path.display()
        ))
    })?;
    released?;

    info!(path = %backup_path.display(), "backup created");

    Ok(BackupHandle { path: backup_path })
}
