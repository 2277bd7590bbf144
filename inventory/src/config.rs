//! Configuration for the reconciliation process.

use std::path::PathBuf;

use crate::error::{InventoryError, InventoryResult};

/// How the run reacts when a page's update transaction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFailurePolicy {
    /// Roll back the failed page, log it, and continue with the next page.
    ///
    /// The failed page's updates are dropped for this run; the records remain
    /// matched and are not re-queued as inserts. This is the default.
    #[default]
    BestEffort,
    /// Abort the whole run on the first failed page.
    Abort,
}

/// How duplicate natural keys in the incoming batch are resolved.
///
/// Only [`DuplicatePolicy::Reject`] is implemented: duplicates are reported
/// with the offending keys and the run stops before touching the store.
/// Automatic resolution (last-write-wins, merge) is a deliberate extension
/// point and has no defined semantics yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum DuplicatePolicy {
    /// Report the duplicated keys and refuse to reconcile.
    #[default]
    Reject,
}

/// Configuration for the reconciliation process.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Maximum number of stored rows fetched and reconciled per page.
    pub chunk_size: usize,

    /// Reaction to a failed page update transaction.
    pub page_failure_policy: PageFailurePolicy,

    /// Resolution policy for duplicate natural keys in the batch.
    pub duplicate_policy: DuplicatePolicy,

    /// Actor recorded in `last_modified_by` for every applied mutation.
    pub modified_by: String,
}

impl ReconcileConfig {
    /// Default number of stored rows per page.
    pub const DEFAULT_CHUNK_SIZE: usize = 3;

    /// Default actor recorded on mutations.
    pub const DEFAULT_MODIFIED_BY: &'static str = "inventory-importer";

    /// Sets the page size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the page failure policy.
    pub fn with_page_failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.page_failure_policy = policy;
        self
    }

    /// Sets the actor recorded on mutations.
    pub fn with_modified_by(mut self, modified_by: impl Into<String>) -> Self {
        self.modified_by = modified_by.into();
        self
    }

    /// Validates the configuration.
    ///
    /// Ensures the chunk size is non-zero and the actor name is non-empty.
    pub fn validate(&self) -> InventoryResult<()> {
        if self.chunk_size == 0 {
            return Err(InventoryError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.modified_by.is_empty() {
            return Err(InventoryError::Config(
                "modified_by must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            page_failure_policy: PageFailurePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            modified_by: Self::DEFAULT_MODIFIED_BY.to_string(),
        }
    }
}

/// Connection settings for the inventory store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file, or `:memory:` for an in-memory store.
    pub path: PathBuf,

    /// Number of additional connection attempts after the first failure.
    ///
    /// Retries are immediate; there is no backoff. Exhausting the budget is a
    /// fatal error surfaced to the caller.
    pub connect_retries: u32,

    /// Whether to create the database file when it does not exist.
    pub create_if_missing: bool,
}

impl StoreConfig {
    /// Default number of connection retries.
    pub const DEFAULT_CONNECT_RETRIES: u32 = 5;

    /// Creates connection settings for an existing store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connect_retries: Self::DEFAULT_CONNECT_RETRIES,
            create_if_missing: false,
        }
    }

    /// Sets the retry budget.
    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    /// Allows creating the database file when it does not exist.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReconcileConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, ReconcileConfig::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.page_failure_policy, PageFailurePolicy::BestEffort);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let config = ReconcileConfig::default().with_chunk_size(0);

        assert!(matches!(
            config.validate(),
            Err(InventoryError::Config(_))
        ));
    }

    #[test]
    fn test_empty_actor_is_rejected() {
        let config = ReconcileConfig::default().with_modified_by("");

        assert!(matches!(
            config.validate(),
            Err(InventoryError::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = ReconcileConfig::default()
            .with_chunk_size(100)
            .with_page_failure_policy(PageFailurePolicy::Abort)
            .with_modified_by("feed-runner");

        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.page_failure_policy, PageFailurePolicy::Abort);
        assert_eq!(config.modified_by, "feed-runner");
    }
}
