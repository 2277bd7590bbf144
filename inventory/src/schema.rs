//! Canonical inventory schema and the store-side column layout.
//!
//! The canonical column set is fixed: it is both the contract the cleansing
//! stage must produce and the hard allow-list consulted before any column
//! name is interpolated into an update statement. System columns (`v_id` and
//! the audit timestamps) are owned by the store side and never appear in an
//! incoming record.

use sqlx::Row;

use crate::error::{InventoryError, InventoryResult};
use crate::store::StoreSession;
use crate::types::VehicleRecord;

/// Name of the inventory table.
pub const INVENTORY_TABLE: &str = "inventory";

/// Natural key column: the vehicle identification number.
pub const NATURAL_KEY_COLUMN: &str = "vin";

/// Surrogate key column, assigned by the store side at insert time.
pub const SURROGATE_KEY_COLUMN: &str = "v_id";

/// Insert timestamp, never altered by updates.
pub const CREATED_TIME_COLUMN: &str = "created_time";

/// Timestamp of the last applied mutation.
pub const LAST_MODIFIED_TIME_COLUMN: &str = "last_modified_time";

/// Actor of the last applied mutation.
pub const LAST_MODIFIED_BY_COLUMN: &str = "last_modified_by";

/// Store-managed columns that never transit through the feed or the diff.
pub const SYSTEM_COLUMNS: &[&str] = &[
    SURROGATE_KEY_COLUMN,
    CREATED_TIME_COLUMN,
    LAST_MODIFIED_TIME_COLUMN,
    LAST_MODIFIED_BY_COLUMN,
];

/// The canonical data columns every cleansed record must carry.
pub const CANONICAL_DATA_COLUMNS: &[&str] = &[
    NATURAL_KEY_COLUMN,
    "d_id",
    "d_name",
    "stock_type",
    "stock_id",
    "year",
    "make",
    "model",
    "trim",
    "body_style",
    "doors",
    "exterior_colour",
    "interior_colour",
    "cylinders",
    "displacement",
    "transmission_description",
    "odometer",
    "price",
    "msrp",
    "description",
    "configuration",
    "fuel_type",
    "drivetrain",
    "exterior_colour_generic",
    "interior_colour_generic",
    "passengers",
];

/// Returns true when `name` is one of the canonical data columns.
pub fn is_canonical_column(name: &str) -> bool {
    CANONICAL_DATA_COLUMNS.contains(&name)
}

/// Returns true when `name` may appear as the target of an update statement.
///
/// The natural key is matched on, never rewritten, so it is excluded along
/// with everything outside the canonical set.
pub fn is_updatable_column(name: &str) -> bool {
    name != NATURAL_KEY_COLUMN && is_canonical_column(name)
}

/// The store's declared column layout for the inventory table.
///
/// Loaded once per run; insert statements follow this declared order and the
/// batch's unordered field sets are aligned against it by name.
#[derive(Debug, Clone)]
pub struct StoreSchema {
    /// All columns in declared order.
    columns: Vec<String>,
}

impl StoreSchema {
    /// Reads the declared column layout from the store.
    ///
    /// Fails with a schema mismatch when the table is absent or lacks the
    /// surrogate key, natural key, or audit columns.
    pub async fn load(session: &mut StoreSession) -> InventoryResult<Self> {
        let sql = format!("PRAGMA table_info({INVENTORY_TABLE})");
        let rows = sqlx::query(&sql).fetch_all(session.connection()).await?;

        if rows.is_empty() {
            return Err(InventoryError::SchemaMismatch(format!(
                "table `{INVENTORY_TABLE}` does not exist in the store"
            )));
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            columns.push(row.try_get::<String, _>("name")?);
        }

        for required in SYSTEM_COLUMNS
            .iter()
            .chain(std::iter::once(&NATURAL_KEY_COLUMN))
        {
            if !columns.iter().any(|column| column == required) {
                return Err(InventoryError::SchemaMismatch(format!(
                    "store is missing required column `{required}`"
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Returns all columns in declared order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the data columns in declared order, system columns excluded.
    pub fn data_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|column| !SYSTEM_COLUMNS.contains(column))
            .collect()
    }

    /// Checks that a record's field set aligns with the store's data columns.
    ///
    /// Alignment is by name on the exact column set; a missing or extra field
    /// is a fatal mismatch, never coerced.
    pub fn ensure_aligned(&self, record: &VehicleRecord) -> InventoryResult<()> {
        let data_columns = self.data_columns();

        for column in &data_columns {
            if record.get(column).is_none() {
                return Err(InventoryError::SchemaMismatch(format!(
                    "record `{}` is missing column `{column}`",
                    record.vin()
                )));
            }
        }

        if record.field_count() != data_columns.len() {
            let extra = record
                .field_names()
                .find(|field| !data_columns.contains(field))
                .unwrap_or_default();
            return Err(InventoryError::SchemaMismatch(format!(
                "record `{}` carries column `{extra}` unknown to the store",
                record.vin()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_key_is_canonical_but_not_updatable() {
        assert!(is_canonical_column(NATURAL_KEY_COLUMN));
        assert!(!is_updatable_column(NATURAL_KEY_COLUMN));
    }

    #[test]
    fn test_system_columns_are_not_updatable() {
        for column in SYSTEM_COLUMNS {
            assert!(!is_updatable_column(column));
        }
    }

    #[test]
    fn test_data_columns_are_updatable() {
        assert!(is_updatable_column("price"));
        assert!(is_updatable_column("odometer"));
        assert!(is_updatable_column("exterior_colour"));
    }

    #[test]
    fn test_unknown_columns_are_rejected() {
        assert!(!is_updatable_column("price; DROP TABLE inventory"));
        assert!(!is_updatable_column("colour"));
    }
}
