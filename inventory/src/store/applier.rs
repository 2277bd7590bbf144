//! Transactional application of field updates and bulk inserts.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::Connection;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use tracing::debug;

use crate::diff::FieldChange;
use crate::error::{InventoryError, InventoryResult};
use crate::schema::{
    self, CREATED_TIME_COLUMN, INVENTORY_TABLE, LAST_MODIFIED_BY_COLUMN,
    LAST_MODIFIED_TIME_COLUMN, NATURAL_KEY_COLUMN, SURROGATE_KEY_COLUMN, StoreSchema,
};
use crate::store::StoreSession;
use crate::types::{Cell, InsertRecord};

/// Format of the audit timestamp columns.
const AUDIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Issues update and insert statements against the store.
///
/// Each call is one commit boundary: a page's updates either fully commit or
/// roll back together, and the tail insert is a single transaction.
pub struct MutationApplier<'a> {
    schema: &'a StoreSchema,
    modified_by: String,
}

impl<'a> MutationApplier<'a> {
    /// Creates an applier over the store's declared layout.
    pub fn new(schema: &'a StoreSchema, modified_by: impl Into<String>) -> Self {
        Self {
            schema,
            modified_by: modified_by.into(),
        }
    }

    /// Applies one page's changes in a single transaction.
    ///
    /// Every change targets its row by natural key and sets one column.
    /// Column names are checked against the canonical allow-list before any
    /// of them is interpolated into a statement; an unknown column fails the
    /// whole page. Rows with at least one change also get their audit columns
    /// stamped inside the same transaction. Returns the number of distinct
    /// rows updated.
    pub async fn apply_updates(
        &self,
        session: &mut StoreSession,
        changes: &[FieldChange],
    ) -> InventoryResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        for change in changes {
            if !schema::is_updatable_column(&change.field) {
                return Err(InventoryError::DisallowedColumn(change.field.clone()));
            }
        }

        let stamp = Utc::now().format(AUDIT_TIME_FORMAT).to_string();
        let mut touched = BTreeSet::new();

        let mut tx = session.connection().begin().await?;

        for change in changes {
            let sql = format!(
                "UPDATE {INVENTORY_TABLE} SET \"{field}\" = ?1 WHERE {NATURAL_KEY_COLUMN} = ?2",
                field = change.field
            );
            bind_cell(sqlx::query(&sql), &change.to)
                .bind(change.vin.as_str())
                .execute(&mut *tx)
                .await?;
            touched.insert(change.vin.as_str());
        }

        let audit_sql = format!(
            "UPDATE {INVENTORY_TABLE} SET {LAST_MODIFIED_TIME_COLUMN} = ?1, \
             {LAST_MODIFIED_BY_COLUMN} = ?2 WHERE {NATURAL_KEY_COLUMN} = ?3"
        );
        for vin in &touched {
            sqlx::query(&audit_sql)
                .bind(stamp.as_str())
                .bind(self.modified_by.as_str())
                .bind(*vin)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            rows = touched.len(),
            changes = changes.len(),
            "page updates committed"
        );

        Ok(touched.len())
    }

    /// Inserts whole rows in the store's declared column order, transactionally.
    ///
    /// `created_time` and the `last_modified_*` columns are stamped at insert
    /// time; the empty-text sentinel is persisted back as NULL.
    pub async fn apply_inserts(
        &self,
        session: &mut StoreSession,
        rows: &[InsertRecord],
    ) -> InventoryResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let columns = self.schema.columns();
        let column_list = columns
            .iter()
            .map(|column| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {INVENTORY_TABLE} ({column_list}) VALUES ({placeholders})");

        let stamp = Utc::now().format(AUDIT_TIME_FORMAT).to_string();

        let mut tx = session.connection().begin().await?;

        for row in rows {
            let mut query = sqlx::query(&sql);
            for column in columns {
                query = match column.as_str() {
                    SURROGATE_KEY_COLUMN => query.bind(row.v_id),
                    CREATED_TIME_COLUMN | LAST_MODIFIED_TIME_COLUMN => query.bind(stamp.as_str()),
                    LAST_MODIFIED_BY_COLUMN => query.bind(self.modified_by.as_str()),
                    data_column => match row.record.get(data_column) {
                        Some(cell) => bind_cell(query, cell),
                        None => {
                            return Err(InventoryError::SchemaMismatch(format!(
                                "record `{}` is missing column `{data_column}`",
                                row.record.vin()
                            )));
                        }
                    },
                };
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(rows = rows.len(), "insert batch committed");

        Ok(rows.len())
    }
}

/// Binds a cell to the next statement placeholder.
///
/// The empty-text sentinel stands for "no value" and is written as NULL.
fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &'q Cell,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match cell {
        Cell::Null => query.bind(None::<String>),
        Cell::I64(value) => query.bind(*value),
        Cell::F64(value) => query.bind(*value),
        Cell::Text(value) if value.is_empty() => query.bind(None::<String>),
        Cell::Text(value) => query.bind(value.as_str()),
    }
}
