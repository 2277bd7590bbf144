//! Typed cell values for inventory records.

use std::fmt;

use crate::error::{InventoryError, InventoryResult};

/// A single typed value in an inventory record.
///
/// The variants mirror the storage classes the store actually uses for
/// vehicle data: null, signed integer, real, and text. Comparison is typed —
/// `I64(4)` and `Text("4")` are different values, which is why the cleansing
/// stage must narrow numerics before records reach reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Absent value.
    Null,
    /// Signed integer value.
    I64(i64),
    /// Floating point value.
    F64(f64),
    /// Text value.
    Text(String),
}

impl Cell {
    /// Normalizes an absent value to the empty-text sentinel.
    ///
    /// Stored nulls and incoming nulls both collapse to `Text("")` so that
    /// "no value" compares equal regardless of which side it came from. The
    /// sentinel is turned back into SQL NULL when a cell is bound to a
    /// statement.
    pub fn normalized(self) -> Cell {
        match self {
            Cell::Null => Cell::Text(String::new()),
            other => other,
        }
    }

    /// Returns true when the cell carries no value.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Decodes a JSON value from the normalized feed into a cell.
    ///
    /// Booleans map to `0`/`1` integers, matching how the store represents
    /// them. Nested arrays and objects have no column representation and are
    /// rejected.
    pub fn from_json(value: &serde_json::Value) -> InventoryResult<Cell> {
        match value {
            serde_json::Value::Null => Ok(Cell::Null),
            serde_json::Value::Bool(value) => Ok(Cell::I64(i64::from(*value))),
            serde_json::Value::Number(value) => {
                if let Some(value) = value.as_i64() {
                    Ok(Cell::I64(value))
                } else if let Some(value) = value.as_f64() {
                    Ok(Cell::F64(value))
                } else {
                    Err(InventoryError::InvalidRecord(format!(
                        "number {value} is out of range for the store"
                    )))
                }
            }
            serde_json::Value::String(value) => Ok(Cell::Text(value.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
                InventoryError::InvalidRecord("nested JSON values are not supported".to_string()),
            ),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str(""),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
            Cell::Text(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_collapses_null_to_empty_text() {
        assert_eq!(Cell::Null.normalized(), Cell::Text(String::new()));
        assert_eq!(Cell::I64(7).normalized(), Cell::I64(7));
        assert_eq!(
            Cell::Text("x".to_string()).normalized(),
            Cell::Text("x".to_string())
        );
    }

    #[test]
    fn test_comparison_is_typed() {
        assert_ne!(Cell::I64(4), Cell::Text("4".to_string()));
        assert_ne!(Cell::I64(4), Cell::F64(4.0));
        assert_eq!(Cell::F64(1.5), Cell::F64(1.5));
    }

    #[test]
    fn test_missing_values_compare_equal_after_normalization() {
        let stored = Cell::Null.normalized();
        let incoming = Cell::Text(String::new()).normalized();

        assert_eq!(stored, incoming);
        assert!(stored.is_missing());
    }

    #[test]
    fn test_from_json_decoding() {
        use serde_json::json;

        assert_eq!(Cell::from_json(&json!(null)).unwrap(), Cell::Null);
        assert_eq!(Cell::from_json(&json!(19999)).unwrap(), Cell::I64(19999));
        assert_eq!(Cell::from_json(&json!(3.5)).unwrap(), Cell::F64(3.5));
        assert_eq!(Cell::from_json(&json!(true)).unwrap(), Cell::I64(1));
        assert_eq!(
            Cell::from_json(&json!("ABC123")).unwrap(),
            Cell::Text("ABC123".to_string())
        );
        assert!(Cell::from_json(&json!([1, 2])).is_err());
        assert!(Cell::from_json(&json!({"nested": 1})).is_err());
    }
}
