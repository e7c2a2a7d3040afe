//! In-memory implementation of [`MapStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests, per-round
//! changesets, and anywhere persistence isn't needed. It has identical
//! semantics to the SQLite backend. Transactions are implemented by
//! snapshotting every map at `begin` and restoring the snapshot on
//! `rollback`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StorageError;
use crate::traits::MapStore;

type Entries = HashMap<Vec<u8>, BTreeSet<Vec<u8>>>;
type Maps = HashMap<String, Entries>;

#[derive(Debug, Default)]
struct Inner {
    maps: Maps,
    /// State at `begin`, restored on rollback.
    snapshot: Option<Maps>,
}

impl Inner {
    fn entries_mut(&mut self, map: &str) -> &mut Entries {
        self.maps.entry(map.to_string()).or_default()
    }
}

/// In-memory implementation of [`MapStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl MapStore for InMemoryStore {
    fn get(&self, map: &str, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .maps
            .get(map)
            .and_then(|entries| entries.get(key))
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn contains_key(&self, map: &str, key: &[u8]) -> Result<bool, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .maps
            .get(map)
            .is_some_and(|entries| entries.contains_key(key)))
    }

    fn keys(&self, map: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let inner = self.read()?;
        let mut keys: Vec<Vec<u8>> = inner
            .maps
            .get(map)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    fn put(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let entries = inner.entries_mut(map);
        if values.is_empty() {
            entries.remove(key);
        } else {
            entries.insert(key.to_vec(), values.iter().cloned().collect());
        }
        Ok(())
    }

    fn append(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut inner = self.write()?;
        inner
            .entries_mut(map)
            .entry(key.to_vec())
            .or_default()
            .extend(values.iter().cloned());
        Ok(())
    }

    fn remove_values(
        &self,
        map: &str,
        key: &[u8],
        values: &[Vec<u8>],
    ) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let entries = inner.entries_mut(map);
        if let Some(set) = entries.get_mut(key) {
            for value in values {
                set.remove(value);
            }
            if set.is_empty() {
                entries.remove(key);
            }
        }
        Ok(())
    }

    fn remove(&self, map: &str, key: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        inner.entries_mut(map).remove(key);
        Ok(())
    }

    fn begin(&self) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        if inner.snapshot.is_some() {
            return Err(StorageError::TransactionActive);
        }
        inner.snapshot = Some(inner.maps.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        inner
            .snapshot
            .take()
            .map(|_| ())
            .ok_or(StorageError::NoTransaction)
    }

    fn rollback(&self) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let snapshot = inner.snapshot.take().ok_or(StorageError::NoTransaction)?;
        inner.maps = snapshot;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.inner
            .read()
            .map(|inner| inner.snapshot.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn append_is_set_union() {
        let store = InMemoryStore::new();
        store.append("m", b"k", &[v("a"), v("b")]).unwrap();
        store.append("m", b"k", &[v("b"), v("c")]).unwrap();
        assert_eq!(store.get("m", b"k").unwrap(), vec![v("a"), v("b"), v("c")]);
    }

    #[test]
    fn put_replaces_and_empty_put_removes() {
        let store = InMemoryStore::new();
        store.put("m", b"k", &[v("a"), v("b")]).unwrap();
        store.put("m", b"k", &[v("c")]).unwrap();
        assert_eq!(store.get("m", b"k").unwrap(), vec![v("c")]);

        store.put("m", b"k", &[]).unwrap();
        assert!(!store.contains_key("m", b"k").unwrap());
    }

    #[test]
    fn removing_last_value_removes_key() {
        let store = InMemoryStore::new();
        store.append("m", b"k", &[v("a")]).unwrap();
        store.remove_values("m", b"k", &[v("a")]).unwrap();
        assert!(!store.contains_key("m", b"k").unwrap());
        assert!(store.keys("m").unwrap().is_empty());
    }

    #[test]
    fn maps_are_isolated_by_name() {
        let store = InMemoryStore::new();
        store.append("one", b"k", &[v("a")]).unwrap();
        assert!(store.get("two", b"k").unwrap().is_empty());
        assert_eq!(store.keys("one").unwrap(), vec![b"k".to_vec()]);
    }

    #[test]
    fn rollback_restores_state_at_begin() {
        let store = InMemoryStore::new();
        store.append("m", b"k", &[v("a")]).unwrap();

        store.begin().unwrap();
        assert!(store.in_transaction());
        store.append("m", b"k", &[v("b")]).unwrap();
        store.remove("m", b"k").unwrap();
        store.append("m", b"other", &[v("x")]).unwrap();
        store.rollback().unwrap();

        assert!(!store.in_transaction());
        assert_eq!(store.get("m", b"k").unwrap(), vec![v("a")]);
        assert!(!store.contains_key("m", b"other").unwrap());
    }

    #[test]
    fn commit_keeps_writes() {
        let store = InMemoryStore::new();
        store.begin().unwrap();
        store.append("m", b"k", &[v("a")]).unwrap();
        store.commit().unwrap();
        assert_eq!(store.get("m", b"k").unwrap(), vec![v("a")]);
    }

    #[test]
    fn transaction_misuse_is_reported() {
        let store = InMemoryStore::new();
        assert!(matches!(store.commit(), Err(StorageError::NoTransaction)));
        assert!(matches!(store.rollback(), Err(StorageError::NoTransaction)));
        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(StorageError::TransactionActive)));
    }
}
