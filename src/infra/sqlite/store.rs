use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;

use crate::infra::sqlite::schema::{init_schema, open_connection};
use crate::usecase::ports::store::{Filter, Row, StoreError, TableStore};

/// Local stand-in for the hosted table API. Filters are evaluated in Rust
/// over the decoded rows.
pub struct SqliteTableStore {
    conn: Mutex<Connection>,
}

impl SqliteTableStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_connection(db_path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Message("sqlite connection lock poisoned".into()))
    }
}

fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn load_rows(conn: &Connection, table: &str) -> Result<Vec<(i64, Row)>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, c.name, c.value
             FROM store_row r
             LEFT JOIN store_cell c ON c.row_id = r.id
             WHERE r.tbl = ?1
             ORDER BY r.id, c.col_idx",
        )
        .context("failed to prepare row select")?;
    let cells = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .context("failed to query rows")?;

    let mut rows: Vec<(i64, Row)> = Vec::new();
    for cell in cells {
        let (row_id, name, value) = cell.context("failed to read cell")?;
        if rows.last().map(|(id, _)| *id) != Some(row_id) {
            rows.push((row_id, Row::new()));
        }
        if let (Some(name), Some(value), Some((_, row))) = (name, value, rows.last_mut()) {
            row.insert(name, decode_value(&value));
        }
    }
    Ok(rows)
}

fn matching_rows(conn: &Connection, table: &str, filters: &[Filter]) -> Result<Vec<(i64, Row)>> {
    Ok(load_rows(conn, table)?
        .into_iter()
        .filter(|(_, row)| filters.iter().all(|filter| filter.matches(row)))
        .collect())
}

fn insert_row(tx: &Transaction<'_>, table: &str, row: &Row) -> Result<()> {
    tx.execute("INSERT INTO store_row(tbl) VALUES (?1)", params![table])
        .with_context(|| format!("failed to insert row into {table}"))?;
    let row_id = tx.last_insert_rowid();

    let mut insert_cell = tx
        .prepare("INSERT INTO store_cell(row_id, col_idx, name, value) VALUES (?1, ?2, ?3, ?4)")
        .context("failed to prepare cell insert")?;
    for (col_idx, (name, value)) in row.iter().enumerate() {
        insert_cell
            .execute(params![row_id, col_idx as i64, name, value.to_string()])
            .context("failed to insert cell")?;
    }
    Ok(())
}

fn patch_row(tx: &Transaction<'_>, row_id: i64, patch: &Row) -> Result<()> {
    for (name, value) in patch {
        let changed = tx
            .execute(
                "UPDATE store_cell SET value = ?3 WHERE row_id = ?1 AND name = ?2",
                params![row_id, name, value.to_string()],
            )
            .context("failed to update cell")?;
        if changed > 0 {
            continue;
        }
        let next_idx: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(col_idx) + 1, 0) FROM store_cell WHERE row_id = ?1",
                params![row_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read column count")?
            .unwrap_or(0);
        tx.execute(
            "INSERT INTO store_cell(row_id, col_idx, name, value) VALUES (?1, ?2, ?3, ?4)",
            params![row_id, next_idx, name, value.to_string()],
        )
        .context("failed to append cell")?;
    }
    Ok(())
}

impl TableStore for SqliteTableStore {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError> {
        let conn = self.lock()?;
        matching_rows(&conn, table, filters)
            .map(|rows| rows.into_iter().map(|(_, row)| row).collect())
            .map_err(|err| StoreError::Message(format!("{err:#}")))
    }

    fn insert(&self, table: &str, row: &Row) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let result = (|| -> Result<()> {
            let tx = conn.transaction().context("failed to start transaction")?;
            insert_row(&tx, table, row)?;
            tx.commit().context("failed to commit insert")
        })();
        result.map_err(|err| StoreError::Message(format!("{err:#}")))
    }

    fn update(&self, table: &str, filters: &[Filter], patch: &Row) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let result = (|| -> Result<usize> {
            let ids: Vec<i64> = matching_rows(&conn, table, filters)?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            let tx = conn.transaction().context("failed to start transaction")?;
            for row_id in &ids {
                patch_row(&tx, *row_id, patch)?;
            }
            tx.commit().context("failed to commit update")?;
            Ok(ids.len())
        })();
        result.map_err(|err| StoreError::Message(format!("{err:#}")))
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let result = (|| -> Result<usize> {
            let ids: Vec<i64> = matching_rows(&conn, table, filters)?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            let tx = conn.transaction().context("failed to start transaction")?;
            for row_id in &ids {
                tx.execute("DELETE FROM store_cell WHERE row_id = ?1", params![row_id])
                    .context("failed to delete cells")?;
                tx.execute("DELETE FROM store_row WHERE id = ?1", params![row_id])
                    .context("failed to delete row")?;
            }
            tx.commit().context("failed to commit delete")?;
            Ok(ids.len())
        })();
        result.map_err(|err| StoreError::Message(format!("{err:#}")))
    }
}
