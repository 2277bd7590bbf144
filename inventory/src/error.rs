//! Error types for the inventory crate.

use thiserror::Error;

/// Errors that can occur while reconciling a feed against the inventory store.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The store could not be reached after exhausting the retry budget.
    #[error("store connection failed after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// The incoming batch's columns do not align with the store's columns.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The incoming batch contains records sharing a natural key.
    #[error("duplicate natural keys in incoming batch: {}", vins.join(", "))]
    DuplicateNaturalKeys { vins: Vec<String> },

    /// An update targeted a column outside the canonical allow-list.
    #[error("column `{0}` is not an updatable inventory column")]
    DisallowedColumn(String),

    /// The two sides of a diff were not restricted to the same key set.
    #[error("record sets are not aligned on natural key `{0}`")]
    KeyAlignment(String),

    /// A record failed validation against the canonical schema.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The feed file could not be decoded.
    #[error("feed decode error: {0}")]
    Feed(String),

    /// The pre-run snapshot could not be taken.
    #[error("backup failed: {0}")]
    Backup(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from the underlying database driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
