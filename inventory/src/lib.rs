//! Inventory reconciliation - merges a normalized vehicle feed into the
//! persistent inventory store.
//!
//! The store is a single-file SQLite database with one row per vehicle,
//! identified externally by its VIN (the natural key) and internally by a
//! store-assigned surrogate key. A run takes a timestamped backup, pages
//! through the store in bounded chunks, updates existing rows field-by-field
//! where the feed differs, and appends the remainder with fresh surrogate
//! keys — so memory stays constant regardless of store size and a matched
//! record can never be duplicated as an insert.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use inventory::store::{StoreSession, backup};
//! use inventory::{ReconcileConfig, Reconciler, StoreConfig, feed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let batch = feed::read_feed(Path::new("feed.ndjson")).await?;
//!
//!     let store_config = StoreConfig::new("inventory.db");
//!     let mut session = StoreSession::connect(&store_config).await?;
//!
//!     // Snapshot before any mutation.
//!     backup::snapshot(&mut session, Path::new("database_backups")).await?;
//!
//!     let reconciler = Reconciler::new(ReconcileConfig::default());
//!     let summary = reconciler.reconcile(&mut session, batch).await?;
//!     println!(
//!         "{} updated, {} inserted",
//!         summary.rows_updated, summary.rows_inserted
//!     );
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod diff;
mod error;
pub mod feed;
mod reconcile;
pub mod schema;
pub mod store;
pub mod types;

pub use config::{DuplicatePolicy, PageFailurePolicy, ReconcileConfig, StoreConfig};
pub use diff::{FieldChange, diff_records};
pub use error::{InventoryError, InventoryResult};
pub use reconcile::{ReconcileSummary, Reconciler};
