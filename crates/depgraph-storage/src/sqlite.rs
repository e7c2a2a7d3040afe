//! SQLite implementation of [`MapStore`].
//!
//! [`SqliteStore`] keeps every named map in one `map_entries` table with WAL
//! mode and automatic schema migrations. Multi-statement writes run inside a
//! savepoint so each call is atomic on its own; `begin`/`commit` wrap a whole
//! integrate step in a single `BEGIN IMMEDIATE` transaction.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::traits::MapStore;

/// SQLite-backed implementation of [`MapStore`].
///
/// `rusqlite::Connection` is `!Sync`, so the connection sits behind a
/// `Mutex`; every call holds the lock for its full duration.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        tracing::debug!(path, "opened sqlite map store");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn insert_values(
    conn: &Connection,
    map: &str,
    key: &[u8],
    values: &[Vec<u8>],
) -> Result<(), StorageError> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO map_entries (map_name, entry_key, entry_value) VALUES (?1, ?2, ?3)",
    )?;
    for value in values {
        stmt.execute(params![map, key, value])?;
    }
    Ok(())
}

impl MapStore for SqliteStore {
    fn get(&self, map: &str, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT entry_value FROM map_entries WHERE map_name = ?1 AND entry_key = ?2 ORDER BY entry_value",
        )?;
        let rows = stmt.query_map(params![map, key], |row| row.get::<_, Vec<u8>>(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    fn contains_key(&self, map: &str, key: &[u8]) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM map_entries WHERE map_name = ?1 AND entry_key = ?2)",
            params![map, key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn keys(&self, map: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT entry_key FROM map_entries WHERE map_name = ?1 ORDER BY entry_key",
        )?;
        let rows = stmt.query_map(params![map], |row| row.get::<_, Vec<u8>>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn put(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let sp = conn.savepoint()?;
        sp.execute(
            "DELETE FROM map_entries WHERE map_name = ?1 AND entry_key = ?2",
            params![map, key],
        )?;
        insert_values(&sp, map, key, values)?;
        sp.commit()?;
        Ok(())
    }

    fn append(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let sp = conn.savepoint()?;
        insert_values(&sp, map, key, values)?;
        sp.commit()?;
        Ok(())
    }

    fn remove_values(
        &self,
        map: &str,
        key: &[u8],
        values: &[Vec<u8>],
    ) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let sp = conn.savepoint()?;
        {
            let mut stmt = sp.prepare_cached(
                "DELETE FROM map_entries WHERE map_name = ?1 AND entry_key = ?2 AND entry_value = ?3",
            )?;
            for value in values {
                stmt.execute(params![map, key, value])?;
            }
        }
        sp.commit()?;
        Ok(())
    }

    fn remove(&self, map: &str, key: &[u8]) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM map_entries WHERE map_name = ?1 AND entry_key = ?2",
            params![map, key],
        )?;
        Ok(())
    }

    fn begin(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            return Err(StorageError::TransactionActive);
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        tracing::debug!("sqlite transaction started");
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Err(StorageError::NoTransaction);
        }
        conn.execute_batch("COMMIT")?;
        tracing::debug!("sqlite transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Err(StorageError::NoTransaction);
        }
        conn.execute_batch("ROLLBACK")?;
        tracing::debug!("sqlite transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.conn
            .lock()
            .map(|conn| !conn.is_autocommit())
            .unwrap_or(false)
    }
}
