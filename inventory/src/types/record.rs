//! Canonical vehicle records and the incoming batch.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{InventoryError, InventoryResult};
use crate::schema::{self, NATURAL_KEY_COLUMN};
use crate::types::Cell;

/// A single cleansed vehicle record keyed by its natural key.
///
/// Fields are a name-to-cell map over the canonical data columns. The
/// constructor enforces the record-level invariants: the natural key is
/// present and non-empty, no store-managed column is supplied, and every
/// field name belongs to the canonical set. Cells are normalized so absent
/// values compare equal regardless of origin.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    vin: String,
    fields: BTreeMap<String, Cell>,
}

impl VehicleRecord {
    /// Builds a record from a field map, validating the canonical invariants.
    pub fn new(fields: BTreeMap<String, Cell>) -> InventoryResult<Self> {
        for name in fields.keys() {
            if schema::SYSTEM_COLUMNS.contains(&name.as_str()) {
                return Err(InventoryError::InvalidRecord(format!(
                    "store-managed column `{name}` must not be supplied by the feed"
                )));
            }
            if !schema::is_canonical_column(name) {
                return Err(InventoryError::InvalidRecord(format!(
                    "unknown column `{name}`"
                )));
            }
        }

        let vin = match fields.get(NATURAL_KEY_COLUMN) {
            Some(Cell::Text(vin)) if !vin.is_empty() => vin.clone(),
            Some(Cell::Null) | Some(Cell::Text(_)) | None => {
                return Err(InventoryError::InvalidRecord(
                    "natural key `vin` is missing or empty".to_string(),
                ));
            }
            Some(other) => {
                return Err(InventoryError::InvalidRecord(format!(
                    "natural key `vin` must be text, got `{other}`"
                )));
            }
        };

        let fields = fields
            .into_iter()
            .map(|(name, cell)| (name, cell.normalized()))
            .collect();

        Ok(Self { vin, fields })
    }

    /// Returns the natural key.
    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// Returns the cell stored under `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.fields.get(field)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.fields.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    /// Iterates field names in name order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A record destined for insertion, carrying its assigned surrogate key.
#[derive(Debug, Clone)]
pub struct InsertRecord {
    /// Surrogate key assigned for this run.
    pub v_id: i64,
    /// The record to insert.
    pub record: VehicleRecord,
}

/// The incoming batch of cleansed records.
///
/// The batch is consumed over the course of a run: records matched against a
/// store page are removed, so what remains at the end is exactly the
/// to-insert set.
#[derive(Debug, Default)]
pub struct RecordBatch {
    records: Vec<VehicleRecord>,
}

impl RecordBatch {
    /// Creates a batch from records in feed order.
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }

    /// Returns the number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no records remain.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the pending records in feed order.
    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    /// Returns a natural-key lookup over the pending records.
    pub fn by_vin(&self) -> BTreeMap<&str, &VehicleRecord> {
        self.records
            .iter()
            .map(|record| (record.vin(), record))
            .collect()
    }

    /// Returns the natural keys that appear more than once, in key order.
    pub fn duplicate_vins(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for record in &self.records {
            if !seen.insert(record.vin()) {
                duplicates.insert(record.vin().to_string());
            }
        }

        duplicates.into_iter().collect()
    }

    /// Drops every record whose natural key is in `vins`.
    pub fn remove_vins(&mut self, vins: &BTreeSet<String>) {
        self.records.retain(|record| !vins.contains(record.vin()));
    }

    /// Assigns strictly increasing surrogate keys to the remaining records.
    ///
    /// Keys start at `first_v_id` and follow batch order.
    pub fn assign_surrogates(self, first_v_id: i64) -> Vec<InsertRecord> {
        self.records
            .into_iter()
            .zip(first_v_id..)
            .map(|(record, v_id)| InsertRecord { v_id, record })
            .collect()
    }
}
