//! Paged reads of stored inventory rows.

use std::collections::BTreeMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::schema::{INVENTORY_TABLE, SURROGATE_KEY_COLUMN, StoreSchema};
use crate::store::StoreSession;
use crate::types::{Cell, VehicleRecord};

/// A stored row: the surrogate key plus the canonical data fields.
#[derive(Debug)]
pub struct StoredRow {
    /// Surrogate key of the row.
    pub v_id: i64,
    /// Canonical data fields, nulls normalized for comparison.
    pub record: VehicleRecord,
}

/// A bounded window of stored rows in surrogate-key order.
#[derive(Debug)]
pub struct StorePage {
    /// Rows of this page.
    pub rows: Vec<StoredRow>,
    /// Highest surrogate key in this page.
    pub last_v_id: i64,
}

impl StorePage {
    /// Returns a natural-key lookup over the page's records.
    pub fn by_vin(&self) -> BTreeMap<&str, &VehicleRecord> {
        self.rows
            .iter()
            .map(|row| (row.record.vin(), &row.record))
            .collect()
    }
}

/// Streams stored rows in fixed-size pages.
///
/// Pages follow surrogate-key order via keyset pagination, so memory use is
/// bounded by the chunk size regardless of store size. The sequence is finite
/// and not restartable — a run always begins from the first page.
pub struct PageReader {
    select_sql: String,
    data_columns: Vec<String>,
    chunk_size: usize,
    last_v_id: i64,
    finished: bool,
}

impl PageReader {
    /// Creates a reader over the store's data columns.
    ///
    /// Only the surrogate key and the canonical data columns are selected;
    /// audit columns never transit through the diff.
    pub fn new(schema: &StoreSchema, chunk_size: usize) -> Self {
        let data_columns: Vec<String> = schema
            .data_columns()
            .into_iter()
            .map(str::to_string)
            .collect();

        let select_list = data_columns
            .iter()
            .map(|column| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let select_sql = format!(
            "SELECT {SURROGATE_KEY_COLUMN}, {select_list} FROM {INVENTORY_TABLE} \
             WHERE {SURROGATE_KEY_COLUMN} > ?1 ORDER BY {SURROGATE_KEY_COLUMN} LIMIT ?2"
        );

        Self {
            select_sql,
            data_columns,
            chunk_size,
            last_v_id: 0,
            finished: false,
        }
    }

    /// Fetches the next page, or `None` once the store is exhausted.
    pub async fn next_page(
        &mut self,
        session: &mut StoreSession,
    ) -> InventoryResult<Option<StorePage>> {
        if self.finished {
            return Ok(None);
        }

        let rows = sqlx::query(&self.select_sql)
            .bind(self.last_v_id)
            .bind(self.chunk_size as i64)
            .fetch_all(session.connection())
            .await?;

        if rows.is_empty() {
            self.finished = true;
            return Ok(None);
        }
        if rows.len() < self.chunk_size {
            self.finished = true;
        }

        let mut page_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            page_rows.push(self.decode_row(row)?);
        }

        let last_v_id = page_rows
            .last()
            .map(|row| row.v_id)
            .unwrap_or(self.last_v_id);
        self.last_v_id = last_v_id;

        debug!(rows = page_rows.len(), last_v_id, "fetched store page");

        Ok(Some(StorePage {
            rows: page_rows,
            last_v_id,
        }))
    }

    fn decode_row(&self, row: &SqliteRow) -> InventoryResult<StoredRow> {
        let v_id: i64 = row.try_get(0)?;

        let mut fields = BTreeMap::new();
        for (index, name) in self.data_columns.iter().enumerate() {
            fields.insert(name.clone(), decode_cell(row, index + 1)?);
        }

        let record = VehicleRecord::new(fields).map_err(|error| {
            InventoryError::InvalidRecord(format!("stored row v_id {v_id}: {error}"))
        })?;

        Ok(StoredRow { v_id, record })
    }
}

/// Decodes a single column of a stored row into a typed cell.
fn decode_cell(row: &SqliteRow, index: usize) -> InventoryResult<Cell> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }

    let storage_class = raw.type_info().name().to_string();
    match storage_class.as_str() {
        "INTEGER" => Ok(Cell::I64(row.try_get(index)?)),
        "REAL" => Ok(Cell::F64(row.try_get(index)?)),
        _ => Ok(Cell::Text(row.try_get(index)?)),
    }
}
