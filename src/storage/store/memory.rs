//! An in-memory store.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::{
    array::ChunkKeySeparator,
    byte_range::{extract_byte_range_opt, ByteRange},
    storage::{
        MaybeBytes, StorageError, Store, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
    },
};

/// An in-memory store.
///
/// All state lives in a single guarded mapping from key to bytes. The default
/// chunk key separator is `.`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all keys from the store.
    pub fn clear(&self) {
        self.data_map.write().clear();
    }

    /// Return the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_map.read().len()
    }

    /// Return true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(
        &self,
        key: &StoreKey,
        byte_range: Option<ByteRange>,
    ) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.read();
        if let Some(data) = data_map.get(key) {
            Ok(Some(extract_byte_range_opt(data, byte_range)?))
        } else {
            Ok(None)
        }
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.data_map.write().insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data_map.write().remove(key).is_some())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        let mut data_map = self.data_map.write();
        let len = data_map.len();
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(data_map.len() != len)
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: BTreeSet<StorePrefix> = BTreeSet::default();
        let data_map = self.data_map.read();
        for key in data_map.keys() {
            if key.has_prefix(prefix) {
                let key_strip = key.as_str().strip_prefix(prefix.as_str()).unwrap();
                let components: Vec<_> = key_strip.split('/').collect();
                if components.len() > 1 {
                    prefixes.insert(StorePrefix::new(format!(
                        "{}{}/",
                        prefix.as_str(),
                        components[0]
                    ))?);
                } else {
                    keys.push(key.clone());
                }
            }
        }
        Ok(StoreKeysPrefixes::new(keys, prefixes.into_iter().collect()))
    }

    fn separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get() {
        let store = MemoryStore::new();
        let key: StoreKey = "a/b".try_into().unwrap();
        store.set(&key, &[0, 1, 2]).unwrap();
        assert_eq!(store.get(&key, None).unwrap().unwrap(), &[0, 1, 2]);
        assert_eq!(
            store
                .get(&key, Some(ByteRange::Interval(1, 3)))
                .unwrap()
                .unwrap(),
            &[1, 2]
        );
        assert!(store.get(&key, Some(ByteRange::FromStart(3))).is_err());
        assert!(store.get(&"a/c".try_into().unwrap(), None).unwrap().is_none());
        assert!(store.exists(&key).unwrap());
        assert!(!store.set_if_not_exists(&key, &[9]).unwrap());
        assert_eq!(store.get(&key, None).unwrap().unwrap(), &[0, 1, 2]);
    }

    #[test]
    fn memory_store_erase() {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into().unwrap(), &[]).unwrap();
        store.set(&"a/d/e".try_into().unwrap(), &[]).unwrap();
        store.set(&"a/d/f".try_into().unwrap(), &[]).unwrap();
        assert!(store.erase(&"a/b".try_into().unwrap()).unwrap());
        assert!(!store.erase(&"a/b".try_into().unwrap()).unwrap());
        assert!(store.erase_prefix(&"a/d/".try_into().unwrap()).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_store_list() {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into().unwrap(), &[]).unwrap();
        store.set(&"a/c".try_into().unwrap(), &[]).unwrap();
        store.set(&"a/d/e".try_into().unwrap(), &[]).unwrap();
        store.set(&"a/f/g".try_into().unwrap(), &[]).unwrap();
        store.set(&"b/c".try_into().unwrap(), &[]).unwrap();

        assert_eq!(
            store.list_prefix(&"a/".try_into().unwrap()).unwrap(),
            vec![
                "a/b".try_into().unwrap(),
                "a/c".try_into().unwrap(),
                "a/d/e".try_into().unwrap(),
                "a/f/g".try_into().unwrap(),
            ]
        );

        let list_dir = store.list_dir(&"a/".try_into().unwrap()).unwrap();
        assert_eq!(
            list_dir.keys(),
            &vec!["a/b".try_into().unwrap(), "a/c".try_into().unwrap()]
        );
        assert_eq!(
            list_dir.prefixes(),
            &vec!["a/d/".try_into().unwrap(), "a/f/".try_into().unwrap()]
        );
    }
}
