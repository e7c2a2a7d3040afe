//! The [`MapStore`] trait defining the backend contract for persistent maps.
//!
//! A backend holds any number of named maps. Each map associates a byte key
//! with a *set* of byte values: appending a value already present is a
//! no-op, and a key whose last value is removed disappears.
//!
//! All methods take `&self`; backends synchronize internally so one store
//! can be shared by every map of a graph. Writes made between `begin` and
//! `commit` become visible to a restarted process all at once or not at all.

use crate::error::StorageError;

/// Byte-level storage contract for named multi-valued maps.
pub trait MapStore: Send + Sync {
    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// Returns the values stored under `key`, empty if the key is absent.
    fn get(&self, map: &str, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError>;

    fn contains_key(&self, map: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Lists every key present in `map`.
    fn keys(&self, map: &str) -> Result<Vec<Vec<u8>>, StorageError>;

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Replaces the whole value set of `key`. An empty set removes the key.
    fn put(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError>;

    /// Adds `values` to the set of `key` without removing anything.
    fn append(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError>;

    /// Removes the given entries from the set of `key`.
    fn remove_values(&self, map: &str, key: &[u8], values: &[Vec<u8>])
        -> Result<(), StorageError>;

    /// Deletes `key` and all its values.
    fn remove(&self, map: &str, key: &[u8]) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------

    /// Opens a transaction spanning every map in the store.
    fn begin(&self) -> Result<(), StorageError>;

    fn commit(&self) -> Result<(), StorageError>;

    /// Discards every write made since `begin`.
    fn rollback(&self) -> Result<(), StorageError>;

    fn in_transaction(&self) -> bool;
}
