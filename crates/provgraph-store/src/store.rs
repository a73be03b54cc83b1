//! SQLite connection management and the scoped unit of work.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use provgraph_core::StoreConfig;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::StoreError;
use crate::schema;

/// Durable, queryable persistence of nodes, edges, and their provenance.
///
/// One connection sits behind a mutex, which gives every instance a
/// single-writer discipline. Every operation runs in its own transaction:
/// writes take the write lock up front (`IMMEDIATE`), reads share a
/// `DEFERRED` snapshot. Dropping the store closes the connection;
/// [`cleanup`](Self::cleanup) does the same but reports close errors.
pub struct GraphStore {
    conn: Mutex<Connection>,
    location: String,
}

impl GraphStore {
    /// Open or create the store described by `config` and ensure its schema.
    ///
    /// Any failure here is reported as `StorageUnavailable`.
    pub fn initialize(config: &StoreConfig) -> Result<Self, StoreError> {
        let location = config.db_path.display().to_string();

        let conn = if config.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.db_path)
        }
        .map_err(|e| StoreError::unavailable(&location, e))?;

        configure(&conn, config).map_err(|e| StoreError::unavailable(&location, e))?;

        schema::ensure(&conn, &location).map_err(|e| match e {
            StoreError::Sqlite(e) => StoreError::unavailable(&location, e),
            other => other,
        })?;

        tracing::info!(location = %location, "Graph store initialized");
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Where this store persists its data.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Release the backing connection.
    pub fn cleanup(self) -> Result<(), StoreError> {
        let conn = match self.conn.into_inner() {
            Ok(conn) => conn,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = conn.close().map_err(|(_, e)| StoreError::Sqlite(e));
        tracing::info!(location = %self.location, "Graph store closed");
        result
    }

    // ── Unit of work ─────────────────────────────────────────────

    /// Run `f` inside a write transaction, committing only if it succeeds.
    ///
    /// An error or panic inside `f` drops the transaction, which rolls back.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against a consistent read snapshot.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.finish()?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(location = %self.location, "Graph store mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn configure(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    if config.wal && !config.is_in_memory() {
        // journal_mode returns a row, so it cannot go through execute().
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    Ok(())
}
