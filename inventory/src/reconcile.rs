//! Core reconciler: pages through the store and converges the incoming batch
//! into a minimal set of updates plus a tail of inserts.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{DuplicatePolicy, PageFailurePolicy, ReconcileConfig};
use crate::diff::diff_records;
use crate::error::{InventoryError, InventoryResult};
use crate::schema::StoreSchema;
use crate::store::StoreSession;
use crate::store::applier::MutationApplier;
use crate::store::reader::PageReader;
use crate::types::RecordBatch;

/// Outcome counts of a reconciliation run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileSummary {
    /// Number of store pages processed.
    pub pages_processed: usize,
    /// Distinct stored rows that received at least one field update.
    pub rows_updated: usize,
    /// Records appended to the store.
    pub rows_inserted: usize,
    /// Pages whose update transaction failed and was rolled back.
    pub failed_pages: usize,
}

/// Reconciles an incoming batch against the inventory store.
///
/// The store is paged through in surrogate-key order. For every page the
/// batch is split into "already present" and "still pending": matched records
/// are diffed field-by-field and the resulting changes applied in one
/// transaction per page, then removed from the batch. Whatever remains after
/// the last page is appended with fresh surrogate keys.
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Creates a reconciler with the given configuration.
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Runs one reconciliation pass and returns the outcome counts.
    ///
    /// Fails before any write when the batch carries duplicate natural keys
    /// or does not align with the store's columns. A matched record whose
    /// diff is empty still counts as "already present" and is never
    /// re-inserted. With [`PageFailurePolicy::BestEffort`] a failed page is
    /// rolled back, logged, and the run continues; with
    /// [`PageFailurePolicy::Abort`] the first failed page fails the run.
    pub async fn reconcile(
        &self,
        session: &mut StoreSession,
        mut batch: RecordBatch,
    ) -> InventoryResult<ReconcileSummary> {
        self.config.validate()?;

        match self.config.duplicate_policy {
            DuplicatePolicy::Reject => {
                let duplicates = batch.duplicate_vins();
                if !duplicates.is_empty() {
                    return Err(InventoryError::DuplicateNaturalKeys { vins: duplicates });
                }
            }
        }

        let mut summary = ReconcileSummary::default();

        if batch.is_empty() {
            info!("incoming batch is empty, nothing to reconcile");
            return Ok(summary);
        }

        let schema = StoreSchema::load(session).await?;
        for record in batch.records() {
            schema.ensure_aligned(record)?;
        }

        info!(
            records = batch.len(),
            chunk_size = self.config.chunk_size,
            "starting reconciliation"
        );

        let applier = MutationApplier::new(&schema, self.config.modified_by.clone());
        let mut reader = PageReader::new(&schema, self.config.chunk_size);

        let started = Instant::now();
        let mut rows_scanned = 0usize;
        let mut max_v_id = 0i64;

        while let Some(page) = reader.next_page(session).await? {
            rows_scanned += page.rows.len();
            max_v_id = page.last_v_id;

            let matched = {
                let incoming_by_vin = batch.by_vin();
                let stored_subset: BTreeMap<_, _> = page
                    .by_vin()
                    .into_iter()
                    .filter(|(vin, _)| incoming_by_vin.contains_key(vin))
                    .collect();

                if stored_subset.is_empty() {
                    BTreeSet::new()
                } else {
                    let incoming_subset: BTreeMap<_, _> = incoming_by_vin
                        .iter()
                        .filter(|(vin, _)| stored_subset.contains_key(*vin))
                        .map(|(vin, record)| (*vin, *record))
                        .collect();

                    let changes = diff_records(&stored_subset, &incoming_subset)?;
                    if changes.is_empty() {
                        debug!(
                            matches = stored_subset.len(),
                            "page matched with no differences"
                        );
                    } else {
                        match applier.apply_updates(session, &changes).await {
                            Ok(rows) => summary.rows_updated += rows,
                            Err(error)
                                if self.config.page_failure_policy
                                    == PageFailurePolicy::BestEffort =>
                            {
                                error!(
                                    %error,
                                    page = summary.pages_processed + 1,
                                    "page update failed, rolled back, continuing"
                                );
                                summary.failed_pages += 1;
                            }
                            Err(error) => return Err(error),
                        }
                    }

                    stored_subset
                        .keys()
                        .map(|vin| (*vin).to_string())
                        .collect()
                }
            };

            // Matched keys leave the batch even when their diff was empty or
            // their page failed, so a match can never turn into an insert.
            if !matched.is_empty() {
                batch.remove_vins(&matched);
            }

            summary.pages_processed += 1;
            info!(
                rows = rows_scanned,
                elapsed_secs = started.elapsed().as_secs(),
                "page reconciled"
            );
        }

        if !batch.is_empty() {
            let rows = batch.assign_surrogates(max_v_id + 1);
            summary.rows_inserted = applier.apply_inserts(session, &rows).await?;
        }

        info!(
            pages = summary.pages_processed,
            updated = summary.rows_updated,
            inserted = summary.rows_inserted,
            failed_pages = summary.failed_pages,
            elapsed_secs = started.elapsed().as_secs(),
            "reconciliation completed"
        );

        Ok(summary)
    }
}
