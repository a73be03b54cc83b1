//! Backing schema: three record sets for nodes, edges, and source references.
//!
//! Creation is idempotent. An existing database is accepted only if it was
//! stamped with our schema version (or never stamped) and every table that
//! already exists carries the columns we read and write.

use rusqlite::Connection;

use crate::error::StoreError;

/// Stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id          TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    properties  TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS edges (
    id             TEXT PRIMARY KEY,
    source_id      TEXT NOT NULL,
    target_id      TEXT NOT NULL,
    relation_type  TEXT NOT NULL,
    properties     TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS source_refs (
    node_id        TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    position       INTEGER NOT NULL,
    plugin_name    TEXT NOT NULL,
    table_name     TEXT NOT NULL,
    row_id         TEXT NOT NULL,
    content_hash   TEXT,
    segment_slice  TEXT,
    PRIMARY KEY (node_id, position)
);

CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_relation ON edges(relation_type);
CREATE INDEX IF NOT EXISTS idx_source_refs_origin
    ON source_refs(plugin_name, table_name, row_id);
";

/// Columns each table must have, in no particular order.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("nodes", &["id", "label", "properties"]),
    (
        "edges",
        &["id", "source_id", "target_id", "relation_type", "properties"],
    ),
    (
        "source_refs",
        &[
            "node_id",
            "position",
            "plugin_name",
            "table_name",
            "row_id",
            "content_hash",
            "segment_slice",
        ],
    ),
];

/// Create the schema if absent and verify an existing one.
///
/// Returns `StorageUnavailable` naming `location` when the database was
/// written by an incompatible schema.
pub fn ensure(conn: &Connection, location: &str) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version != 0 && version != SCHEMA_VERSION {
        return Err(StoreError::unavailable(
            location,
            format!("schema version {version} is not supported (expected {SCHEMA_VERSION})"),
        ));
    }

    for (table, required) in REQUIRED_COLUMNS {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            continue;
        }
        if let Some(missing) = required.iter().find(|c| !columns.iter().any(|have| have == *c)) {
            return Err(StoreError::unavailable(
                location,
                format!("table {table} is missing column {missing}"),
            ));
        }
    }

    conn.execute_batch(SCHEMA_SQL)?;

    if version == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}
