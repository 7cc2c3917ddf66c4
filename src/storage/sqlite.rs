//! SQLite storage handle
//!
//! A [`Database`] is the one storage handle of the process. It is created once
//! and passed explicitly into every store, graph and pipeline.

use crate::storage::schema::initialize_schema;
use crate::storage::{StorageError, StorageResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the SQLite connection
///
/// Cloning is cheap; all clones use the same connection. Every statement runs
/// under the connection lock, so two callers never interleave inside one
/// statement or transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) a database file and initializes the schema
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Opened database at {}", path.display());

        Ok(Self::from_connection(conn))
    }

    /// Creates a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }

    /// Runs `f` against the connection outside of an explicit transaction
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside one transaction
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err` (or panics). No other caller observes its writes before
    /// the commit.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let value = f(&tx)?;

        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }
}
