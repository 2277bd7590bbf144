//! Decoding of the normalized feed into a record batch.
//!
//! The cleansing stage upstream produces one JSON object per line with the
//! canonical field names and narrowed value types. This module only decodes —
//! renaming, unit parsing, and type narrowing happened before the feed was
//! written.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::types::{Cell, RecordBatch, VehicleRecord};

/// Parses normalized NDJSON content into a record batch.
///
/// Blank lines are skipped. Any malformed line, non-object value, or record
/// violating the canonical invariants fails the whole feed with the line
/// number attached.
pub fn parse_batch(contents: &str) -> InventoryResult<RecordBatch> {
    let mut records = Vec::new();

    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|error| InventoryError::Feed(format!("line {}: {error}", number + 1)))?;
        let serde_json::Value::Object(object) = value else {
            return Err(InventoryError::Feed(format!(
                "line {}: expected a JSON object",
                number + 1
            )));
        };

        let mut fields = BTreeMap::new();
        for (name, value) in &object {
            let cell = Cell::from_json(value).map_err(|error| {
                InventoryError::Feed(format!("line {}, field `{name}`: {error}", number + 1))
            })?;
            fields.insert(name.clone(), cell);
        }

        let record = VehicleRecord::new(fields)
            .map_err(|error| InventoryError::Feed(format!("line {}: {error}", number + 1)))?;
        records.push(record);
    }

    Ok(RecordBatch::new(records))
}

/// Reads and decodes a normalized feed file.
pub async fn read_feed(path: &Path) -> InventoryResult<RecordBatch> {
    let contents = tokio::fs::read_to_string(path).await?;
    let batch = parse_batch(&contents)?;

    debug!(records = batch.len(), path = %path.display(), "feed decoded");

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_decodes_typed_cells() {
        let contents = r#"
            {"vin": "ABC123", "price": 19999, "displacement": 3.5, "make": "Honda", "trim": null}
        "#;

        let batch = parse_batch(contents).unwrap();

        assert_eq!(batch.len(), 1);
        let record = &batch.records()[0];
        assert_eq!(record.vin(), "ABC123");
        assert_eq!(record.get("price"), Some(&Cell::I64(19999)));
        assert_eq!(record.get("displacement"), Some(&Cell::F64(3.5)));
        assert_eq!(record.get("trim"), Some(&Cell::Text(String::new())));
    }

    #[test]
    fn test_parse_batch_keeps_feed_order() {
        let contents = "{\"vin\": \"BBB\"}\n\n{\"vin\": \"AAA\"}\n";

        let batch = parse_batch(contents).unwrap();

        let vins: Vec<_> = batch.records().iter().map(|r| r.vin()).collect();
        assert_eq!(vins, vec!["BBB", "AAA"]);
    }

    #[test]
    fn test_parse_batch_reports_line_numbers() {
        let contents = "{\"vin\": \"AAA\"}\nnot json\n";

        let error = parse_batch(contents).unwrap_err();

        assert!(matches!(error, InventoryError::Feed(_)));
        assert!(error.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_batch_rejects_missing_natural_key() {
        let contents = "{\"price\": 19999}\n";

        assert!(matches!(
            parse_batch(contents),
            Err(InventoryError::Feed(_))
        ));
    }

    #[test]
    fn test_parse_batch_rejects_non_object_lines() {
        assert!(matches!(
            parse_batch("[1, 2, 3]\n"),
            Err(InventoryError::Feed(_))
        ));
    }
}
