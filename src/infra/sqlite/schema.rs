use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Rows of every logical table live in `store_row`; their cells, one per
/// column, in `store_cell` with the JSON-encoded value.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS store_row (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            tbl         TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS store_cell (
            row_id      INTEGER NOT NULL,
            col_idx     INTEGER NOT NULL,
            name        TEXT NOT NULL,
            value       TEXT NOT NULL,
            PRIMARY KEY (row_id, col_idx),
            FOREIGN KEY (row_id) REFERENCES store_row(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_store_row_tbl
            ON store_row(tbl, id);

        CREATE INDEX IF NOT EXISTS idx_store_cell_name
            ON store_cell(row_id, name);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}
