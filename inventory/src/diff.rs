//! Field-level diffing of stored records against incoming records.

use std::collections::BTreeMap;

use crate::error::{InventoryError, InventoryResult};
use crate::types::{Cell, VehicleRecord};

/// A single field difference between a stored and an incoming record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Natural key of the affected record.
    pub vin: String,
    /// Column the change applies to.
    pub field: String,
    /// Stored value.
    pub from: Cell,
    /// Incoming value.
    pub to: Cell,
}

/// Computes the per-field differences between two record sets.
///
/// Both sides are explicit natural-key maps and must already be restricted to
/// the same key set; the reconciler guarantees this by intersecting page keys
/// with batch keys before calling. Alignment is strictly key-to-key — row
/// order on either side is irrelevant.
///
/// Every aligned pair must expose the identical field-name set; a divergence
/// is a fatal schema mismatch, not a silently skipped column. Values are
/// compared by typed equality, so only true deltas are emitted: identical
/// fields and fully identical records produce nothing, and an empty result
/// means "matched, nothing to write".
pub fn diff_records(
    stored: &BTreeMap<&str, &VehicleRecord>,
    incoming: &BTreeMap<&str, &VehicleRecord>,
) -> InventoryResult<Vec<FieldChange>> {
    if let Some(vin) = stored.keys().find(|vin| !incoming.contains_key(*vin)) {
        return Err(InventoryError::KeyAlignment((*vin).to_string()));
    }
    if let Some(vin) = incoming.keys().find(|vin| !stored.contains_key(*vin)) {
        return Err(InventoryError::KeyAlignment((*vin).to_string()));
    }

    let mut changes = Vec::new();

    for (vin, old) in stored {
        let new = &incoming[vin];

        for (field, old_value) in old.fields() {
            let Some(new_value) = new.get(field) else {
                return Err(InventoryError::SchemaMismatch(format!(
                    "record `{vin}` is missing column `{field}` present on the stored side"
                )));
            };

            if old_value != new_value {
                changes.push(FieldChange {
                    vin: (*vin).to_string(),
                    field: field.to_string(),
                    from: old_value.clone(),
                    to: new_value.clone(),
                });
            }
        }

        if new.field_count() != old.field_count() {
            let extra = new
                .field_names()
                .find(|field| old.get(field).is_none())
                .unwrap_or_default();
            return Err(InventoryError::SchemaMismatch(format!(
                "record `{vin}` carries column `{extra}` absent on the stored side"
            )));
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(vin: &str, price: i64, odometer: i64) -> VehicleRecord {
        let fields = BTreeMap::from([
            ("vin".to_string(), Cell::Text(vin.to_string())),
            ("price".to_string(), Cell::I64(price)),
            ("odometer".to_string(), Cell::I64(odometer)),
        ]);

        VehicleRecord::new(fields).unwrap()
    }

    fn keyed(records: &[VehicleRecord]) -> BTreeMap<&str, &VehicleRecord> {
        records.iter().map(|r| (r.vin(), r)).collect()
    }

    #[test]
    fn test_identical_records_produce_no_changes() {
        let stored = vec![record("ABC123", 19999, 42000)];
        let incoming = vec![record("ABC123", 19999, 42000)];

        let changes = diff_records(&keyed(&stored), &keyed(&incoming)).unwrap();

        assert!(changes.is_empty());
    }

    #[test]
    fn test_single_field_difference_is_emitted() {
        let stored = vec![record("ABC123", 19999, 42000)];
        let incoming = vec![record("ABC123", 18999, 42000)];

        let changes = diff_records(&keyed(&stored), &keyed(&incoming)).unwrap();

        assert_eq!(
            changes,
            vec![FieldChange {
                vin: "ABC123".to_string(),
                field: "price".to_string(),
                from: Cell::I64(19999),
                to: Cell::I64(18999),
            }]
        );
    }

    #[test]
    fn test_alignment_is_by_key_not_position() {
        // Same key sets, opposite iteration orders on construction.
        let stored = vec![record("AAA", 1, 10), record("BBB", 2, 20)];
        let incoming = vec![record("BBB", 2, 99), record("AAA", 1, 10)];

        let changes = diff_records(&keyed(&stored), &keyed(&incoming)).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].vin, "BBB");
        assert_eq!(changes[0].field, "odometer");
        assert_eq!(changes[0].to, Cell::I64(99));
    }

    #[test]
    fn test_field_set_divergence_is_fatal() {
        let stored = vec![record("ABC123", 19999, 42000)];
        let incoming = vec![VehicleRecord::new(BTreeMap::from([
            ("vin".to_string(), Cell::Text("ABC123".to_string())),
            ("price".to_string(), Cell::I64(18999)),
        ]))
        .unwrap()];

        assert!(matches!(
            diff_records(&keyed(&stored), &keyed(&incoming)),
            Err(InventoryError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_unaligned_key_sets_are_rejected() {
        let stored = vec![record("AAA", 1, 10)];
        let incoming = vec![record("BBB", 1, 10)];

        assert!(matches!(
            diff_records(&keyed(&stored), &keyed(&incoming)),
            Err(InventoryError::KeyAlignment(_))
        ));
    }

    #[test]
    fn test_missing_value_representations_compare_equal() {
        let stored = vec![VehicleRecord::new(BTreeMap::from([
            ("vin".to_string(), Cell::Text("AAA".to_string())),
            ("trim".to_string(), Cell::Text(String::new())),
        ]))
        .unwrap()];
        let incoming = vec![VehicleRecord::new(BTreeMap::from([
            ("vin".to_string(), Cell::Text("AAA".to_string())),
            ("trim".to_string(), Cell::Null),
        ]))
        .unwrap()];

        let changes = diff_records(&keyed(&stored), &keyed(&incoming)).unwrap();

        assert!(changes.is_empty());
    }
}
