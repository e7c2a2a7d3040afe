//! Typed map handles over a [`MapStore`].
//!
//! [`PersistentMap`] holds at most one value per key; [`PersistentMultiMap`]
//! holds an unordered value set per key and implements the diff-driven
//! [`PersistentMultiMap::update`]. Both encode keys and values through
//! codecs and share one backend via [`MapFactory`].

use std::sync::Arc;

use depgraph_core::codec::{decode_from_slice, encode_to_vec};
use depgraph_core::{Codec, SetDiff};

use crate::error::StorageError;
use crate::traits::MapStore;

/// Creates typed maps that share one backend.
#[derive(Clone)]
pub struct MapFactory {
    store: Arc<dyn MapStore>,
}

impl MapFactory {
    pub fn new(store: Arc<dyn MapStore>) -> Self {
        MapFactory { store }
    }

    pub fn store(&self) -> &Arc<dyn MapStore> {
        &self.store
    }

    pub fn map<K, V>(
        &self,
        name: &str,
        key_codec: Arc<dyn Codec<K>>,
        value_codec: Arc<dyn Codec<V>>,
    ) -> PersistentMap<K, V> {
        PersistentMap {
            inner: self.multi_map(name, key_codec, value_codec),
        }
    }

    pub fn multi_map<K, V>(
        &self,
        name: &str,
        key_codec: Arc<dyn Codec<K>>,
        value_codec: Arc<dyn Codec<V>>,
    ) -> PersistentMultiMap<K, V> {
        PersistentMultiMap {
            store: Arc::clone(&self.store),
            name: name.to_string(),
            key_codec,
            value_codec,
        }
    }
}

/// A named key -> value-set map.
pub struct PersistentMultiMap<K, V> {
    store: Arc<dyn MapStore>,
    name: String,
    key_codec: Arc<dyn Codec<K>>,
    value_codec: Arc<dyn Codec<V>>,
}

impl<K, V> PersistentMultiMap<K, V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, key: &K) -> Result<Vec<u8>, StorageError> {
        Ok(encode_to_vec(self.key_codec.as_ref(), key)?)
    }

    fn encode_values<'v>(
        &self,
        values: impl IntoIterator<Item = &'v V>,
    ) -> Result<Vec<Vec<u8>>, StorageError>
    where
        V: 'v,
    {
        values
            .into_iter()
            .map(|v| Ok(encode_to_vec(self.value_codec.as_ref(), v)?))
            .collect()
    }

    /// Returns the value set stored under `key` (unordered, possibly empty).
    pub fn get(&self, key: &K) -> Result<Vec<V>, StorageError> {
        let raw = self.store.get(&self.name, &self.key(key)?)?;
        let mut values = self.value_codec.new_container(raw.len());
        for bytes in &raw {
            values.push(decode_from_slice(self.value_codec.as_ref(), bytes)?);
        }
        Ok(values)
    }

    pub fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        self.store.contains_key(&self.name, &self.key(key)?)
    }

    pub fn keys(&self) -> Result<Vec<K>, StorageError> {
        let raw = self.store.keys(&self.name)?;
        let mut keys = self.key_codec.new_container(raw.len());
        for bytes in &raw {
            keys.push(decode_from_slice(self.key_codec.as_ref(), bytes)?);
        }
        Ok(keys)
    }

    /// Replaces the whole value set of `key`.
    pub fn put(&self, key: &K, values: &[V]) -> Result<(), StorageError> {
        let encoded = self.encode_values(values)?;
        self.store.put(&self.name, &self.key(key)?, &encoded)
    }

    pub fn append_value(&self, key: &K, value: &V) -> Result<(), StorageError> {
        self.append_values(key, std::slice::from_ref(value))
    }

    pub fn append_values(&self, key: &K, values: &[V]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let encoded = self.encode_values(values)?;
        self.store.append(&self.name, &self.key(key)?, &encoded)
    }

    pub fn remove_value(&self, key: &K, value: &V) -> Result<(), StorageError> {
        self.remove_values(key, std::slice::from_ref(value))
    }

    pub fn remove_values(&self, key: &K, values: &[V]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let encoded = self.encode_values(values)?;
        self.store.remove_values(&self.name, &self.key(key)?, &encoded)
    }

    /// Deletes `key` entirely.
    pub fn remove(&self, key: &K) -> Result<(), StorageError> {
        self.store.remove(&self.name, &self.key(key)?)
    }

    /// Moves the value set of `key` to `desired` with as little churn as
    /// possible.
    ///
    /// - nothing stored, something desired: append `desired`
    /// - something stored, nothing desired: remove the key
    /// - otherwise diff stored against desired with `diff`; a pure addition
    ///   appends only the added values, anything else replaces the set.
    pub fn update<F>(&self, key: &K, desired: &[V], diff: F) -> Result<(), StorageError>
    where
        F: FnOnce(&[V], &[V]) -> SetDiff<V>,
    {
        let current = self.get(key)?;
        match (current.is_empty(), desired.is_empty()) {
            (true, true) => Ok(()),
            (true, false) => self.append_values(key, desired),
            (false, true) => self.remove(key),
            (false, false) => {
                let delta = diff(&current, desired);
                if delta.unchanged() {
                    Ok(())
                } else if delta.is_pure_addition() {
                    self.append_values(key, &delta.added)
                } else {
                    self.put(key, desired)
                }
            }
        }
    }
}

/// A named key -> single value map.
pub struct PersistentMap<K, V> {
    inner: PersistentMultiMap<K, V>,
}

impl<K, V> PersistentMap<K, V> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        Ok(self.inner.get(key)?.into_iter().next())
    }

    pub fn put(&self, key: &K, value: &V) -> Result<(), StorageError> {
        self.inner.put(key, std::slice::from_ref(value))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        self.inner.contains_key(key)
    }

    pub fn keys(&self) -> Result<Vec<K>, StorageError> {
        self.inner.keys()
    }

    pub fn remove(&self, key: &K) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use depgraph_core::codec::JsonCodec;
    use depgraph_core::{set_diff, sorted_diff, SymbolId};

    use crate::memory::InMemoryStore;

    /// Records which write primitives reach the backend.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryStore,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingStore {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MapStore for RecordingStore {
        fn get(&self, map: &str, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
            self.inner.get(map, key)
        }
        fn contains_key(&self, map: &str, key: &[u8]) -> Result<bool, StorageError> {
            self.inner.contains_key(map, key)
        }
        fn keys(&self, map: &str) -> Result<Vec<Vec<u8>>, StorageError> {
            self.inner.keys(map)
        }
        fn put(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
            self.record("put");
            self.inner.put(map, key, values)
        }
        fn append(&self, map: &str, key: &[u8], values: &[Vec<u8>]) -> Result<(), StorageError> {
            self.record("append");
            self.inner.append(map, key, values)
        }
        fn remove_values(
            &self,
            map: &str,
            key: &[u8],
            values: &[Vec<u8>],
        ) -> Result<(), StorageError> {
            self.record("remove_values");
            self.inner.remove_values(map, key, values)
        }
        fn remove(&self, map: &str, key: &[u8]) -> Result<(), StorageError> {
            self.record("remove");
            self.inner.remove(map, key)
        }
        fn begin(&self) -> Result<(), StorageError> {
            self.inner.begin()
        }
        fn commit(&self) -> Result<(), StorageError> {
            self.inner.commit()
        }
        fn rollback(&self) -> Result<(), StorageError> {
            self.inner.rollback()
        }
        fn in_transaction(&self) -> bool {
            self.inner.in_transaction()
        }
    }

    fn ids(names: &[&str]) -> Vec<SymbolId> {
        names.iter().map(|n| SymbolId::from(*n)).collect()
    }

    fn id_map(store: Arc<dyn MapStore>) -> PersistentMultiMap<SymbolId, SymbolId> {
        MapFactory::new(store).multi_map(
            "deps",
            Arc::new(SymbolId::codec()),
            Arc::new(SymbolId::codec()),
        )
    }

    fn sorted(mut values: Vec<SymbolId>) -> Vec<SymbolId> {
        values.sort();
        values
    }

    #[test]
    fn pure_addition_only_appends_the_difference() {
        let store = Arc::new(RecordingStore::default());
        let map = id_map(store.clone());
        let key = SymbolId::from("A");
        map.put(&key, &ids(&["x", "y"])).unwrap();

        let codec = SymbolId::codec();
        map.update(&key, &ids(&["x", "y", "z"]), |past, now| {
            sorted_diff(&codec, past, now)
        })
        .unwrap();

        assert_eq!(store.calls(), vec!["put", "append"]);
        assert_eq!(sorted(map.get(&key).unwrap()), ids(&["x", "y", "z"]));
    }

    #[test]
    fn removal_falls_back_to_full_replace() {
        let store = Arc::new(RecordingStore::default());
        let map = id_map(store.clone());
        let key = SymbolId::from("A");
        map.append_values(&key, &ids(&["x", "y"])).unwrap();

        map.update(&key, &ids(&["y", "z"]), set_diff).unwrap();

        assert_eq!(store.calls(), vec!["append", "put"]);
        assert_eq!(sorted(map.get(&key).unwrap()), ids(&["y", "z"]));
    }

    #[test]
    fn update_on_absent_key_appends() {
        let store = Arc::new(RecordingStore::default());
        let map = id_map(store.clone());
        map.update(&SymbolId::from("A"), &ids(&["x"]), set_diff).unwrap();
        assert_eq!(store.calls(), vec!["append"]);
    }

    #[test]
    fn update_to_empty_removes_key() {
        let store = Arc::new(RecordingStore::default());
        let map = id_map(store.clone());
        let key = SymbolId::from("A");
        map.append_value(&key, &SymbolId::from("x")).unwrap();
        map.update(&key, &[], set_diff).unwrap();
        assert_eq!(store.calls(), vec!["append", "remove"]);
        assert!(!map.contains_key(&key).unwrap());
    }

    #[test]
    fn unchanged_update_writes_nothing() {
        let store = Arc::new(RecordingStore::default());
        let map = id_map(store.clone());
        let key = SymbolId::from("A");
        map.append_values(&key, &ids(&["x", "y"])).unwrap();
        map.update(&key, &ids(&["y", "x"]), set_diff).unwrap();
        assert_eq!(store.calls(), vec!["append"]);
    }

    #[test]
    fn single_valued_map_overwrites() {
        let factory = MapFactory::new(Arc::new(InMemoryStore::new()));
        let map: PersistentMap<SymbolId, String> = factory.map(
            "names",
            Arc::new(SymbolId::codec()),
            Arc::new(JsonCodec::<String>::new()),
        );
        let key = SymbolId::from("A");
        assert_eq!(map.get(&key).unwrap(), None);
        map.put(&key, &"first".to_string()).unwrap();
        map.put(&key, &"second".to_string()).unwrap();
        assert_eq!(map.get(&key).unwrap(), Some("second".to_string()));
        assert_eq!(map.keys().unwrap(), vec![key.clone()]);
        map.remove(&key).unwrap();
        assert!(!map.contains_key(&key).unwrap());
    }

    #[test]
    fn maps_sharing_a_store_are_independent() {
        let factory = MapFactory::new(Arc::new(InMemoryStore::new()));
        let a: PersistentMultiMap<SymbolId, SymbolId> = factory.multi_map(
            "a",
            Arc::new(SymbolId::codec()),
            Arc::new(SymbolId::codec()),
        );
        let b: PersistentMultiMap<SymbolId, SymbolId> = factory.multi_map(
            "b",
            Arc::new(SymbolId::codec()),
            Arc::new(SymbolId::codec()),
        );
        a.append_value(&SymbolId::from("k"), &SymbolId::from("v")).unwrap();
        assert!(b.get(&SymbolId::from("k")).unwrap().is_empty());
        assert_eq!(a.name(), "a");
    }
}
