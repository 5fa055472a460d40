//! Zarr storage.
//!
//! A [`Store`] persists a Zarr hierarchy as a mapping from keys to byte
//! blobs. This module defines the abstract store interface, the key and
//! prefix newtypes, and the metadata document operations layered on top of
//! any store: reading node metadata normalized to the V3 representation
//! (translating V2 documents on the fly), writing node metadata, and
//! creating and erasing nodes.

pub mod store;
mod store_key;
mod store_prefix;
pub mod uri;

pub use store::{FilesystemStore, FilesystemStoreCreateError, MemoryStore};
#[cfg(feature = "http")]
pub use store::{HttpStore, HttpStoreCreateError};
pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::ChunkKeySeparator,
    byte_range::{ByteRange, InvalidByteRangeError},
    metadata::{
        v2::{ArrayMetadataV2, ConsolidatedMetadataV2, GroupMetadataV2},
        v2_to_v3::{array_metadata_v2_to_v3, group_metadata_v2_to_v3},
        ArrayMetadataV3, GroupMetadataV3, NodeMetadata,
    },
    node::{NodeNameError, NodePath, NodePathError},
};

/// The value of a store key, or [`None`] if the key is absent.
pub type MaybeBytes = Option<Vec<u8>>;

/// [`Arc`] wrapped store.
pub type Storage = Arc<dyn Store>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read-only store.
    #[error("a write operation was attempted on a read-only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {_0}: {_1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error(transparent)]
    StoreKeyError(#[from] StoreKeyError),
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error(transparent)]
    NodeNameError(#[from] NodeNameError),
    /// An invalid byte range.
    #[error(transparent)]
    InvalidByteRange(#[from] InvalidByteRangeError),
    /// The requested method is not supported by the store.
    #[error("{_0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// [`StoreKeys`] and [`StorePrefixes`] returned by a directory listing.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub const fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// The abstract store interface.
///
/// Mutating operations on read-only stores fail with
/// [`StorageError::ReadOnly`]; capability flags advertise what a store
/// supports so callers can avoid such failures.
pub trait Store: Send + Sync + core::fmt::Debug {
    /// Retrieve the value at `key`, or a `byte_range` of it.
    ///
    /// Returns [`None`] if the key is absent.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or an invalid byte range.
    fn get(&self, key: &StoreKey, byte_range: Option<ByteRange>)
        -> Result<MaybeBytes, StorageError>;

    /// Return true if `key` exists.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure.
    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.get(key, None)?.is_some())
    }

    /// Store `value` at `key`, creating or overwriting it.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or a read-only store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Store `value` at `key` only if the key is absent.
    ///
    /// Returns true if the value was stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or a read-only store.
    fn set_if_not_exists(&self, key: &StoreKey, value: &[u8]) -> Result<bool, StorageError> {
        if self.exists(key)? {
            Ok(false)
        } else {
            self.set(key, value)?;
            Ok(true)
        }
    }

    /// Erase the value at `key`.
    ///
    /// Returns true if a value was erased.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or a read-only store.
    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError>;

    /// Erase all values under `prefix`.
    ///
    /// Returns true if any value was erased.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or a read-only store.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError>;

    /// List all keys under `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or an unlistable store.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// List the immediate child keys and prefixes under `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure or an unlistable store.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError>;

    /// Return true if the store is read-only.
    fn readonly(&self) -> bool {
        false
    }

    /// Return true if the store supports writes.
    fn supports_writes(&self) -> bool {
        !self.readonly()
    }

    /// Return true if the store supports deletes.
    fn supports_deletes(&self) -> bool {
        !self.readonly()
    }

    /// Return true if the store supports listing.
    fn supports_listing(&self) -> bool {
        true
    }

    /// Return true if the store may hold V2 consolidated metadata.
    fn supports_consolidated_metadata(&self) -> bool {
        false
    }

    /// Return the V2 consolidated metadata of the store, if any.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure.
    fn consolidated_metadata(&self) -> Result<Option<ConsolidatedMetadataV2>, StorageError> {
        Ok(None)
    }

    /// The default chunk key separator for arrays created on this store.
    fn separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Slash
    }
}

/// Return the metadata key given a node path for a metadata file name.
fn meta_key_any(path: &NodePath, metadata_file_name: &str) -> StoreKey {
    let prefix = StorePrefix::from(path);
    unsafe { StoreKey::new_unchecked(format!("{}{metadata_file_name}", prefix.as_str())) }
}

/// Return the Zarr V3 metadata key (`zarr.json`) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    meta_key_any(path, "zarr.json")
}

/// Return the Zarr V2 array metadata key (`.zarray`) given a node path.
#[must_use]
pub fn meta_key_v2_array(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zarray")
}

/// Return the Zarr V2 group metadata key (`.zgroup`) given a node path.
#[must_use]
pub fn meta_key_v2_group(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zgroup")
}

/// Return the Zarr V2 user attributes key (`.zattrs`) given a node path.
#[must_use]
pub fn meta_key_v2_attributes(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zattrs")
}

/// Return the store key of an encoded chunk key under a node path.
#[must_use]
pub fn data_key(path: &NodePath, chunk_key: &StoreKey) -> StoreKey {
    let prefix = StorePrefix::from(path);
    unsafe { StoreKey::new_unchecked(format!("{}{}", prefix.as_str(), chunk_key.as_str())) }
}

fn get_json<TStore: Store + ?Sized, TMetadata: serde::de::DeserializeOwned>(
    store: &TStore,
    key: &StoreKey,
) -> Result<Option<TMetadata>, StorageError> {
    match store.get(key, None)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string())),
        None => Ok(None),
    }
}

/// Read the metadata of the node at `path`, normalized to the V3
/// representation.
///
/// Tries `zarr.json`, then the V2 `.zarray`/`.zgroup` documents (merging a
/// sibling `.zattrs`), then the store's consolidated metadata. Returns
/// [`None`] if the node has no metadata document.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or if a metadata document
/// is malformed or untranslatable.
pub fn node_metadata<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
) -> Result<Option<NodeMetadata>, StorageError> {
    let key = meta_key(path);
    if let Some(metadata) = get_json::<_, NodeMetadata>(store, &key)? {
        if !metadata.validate() {
            return Err(StorageError::InvalidMetadata(
                key,
                "unsupported zarr_format or node_type".to_string(),
            ));
        }
        return Ok(Some(metadata));
    }

    let key = meta_key_v2_array(path);
    if let Some(array_v2) = get_json::<_, ArrayMetadataV2>(store, &key)? {
        if array_v2.zarr_format != 2 {
            return Err(StorageError::InvalidMetadata(
                key,
                format!("unsupported zarr_format {}", array_v2.zarr_format),
            ));
        }
        let attributes = get_json(store, &meta_key_v2_attributes(path))?.unwrap_or_default();
        let metadata = array_metadata_v2_to_v3(&array_v2, attributes)
            .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
        return Ok(Some(NodeMetadata::Array(metadata)));
    }

    let key = meta_key_v2_group(path);
    if let Some(group_v2) = get_json::<_, GroupMetadataV2>(store, &key)? {
        if group_v2.zarr_format != 2 {
            return Err(StorageError::InvalidMetadata(
                key,
                format!("unsupported zarr_format {}", group_v2.zarr_format),
            ));
        }
        let attributes = get_json(store, &meta_key_v2_attributes(path))?.unwrap_or_default();
        let metadata = group_metadata_v2_to_v3(&group_v2, attributes);
        return Ok(Some(NodeMetadata::Group(metadata)));
    }

    if let Some(consolidated) = store.consolidated_metadata()? {
        return consolidated_node_metadata(&consolidated, path);
    }

    Ok(None)
}

/// Read the metadata of the node at `path` from a V2 consolidated metadata
/// document, normalized to the V3 representation.
///
/// # Errors
/// Returns a [`StorageError`] if a metadata document is malformed or
/// untranslatable.
pub fn consolidated_node_metadata(
    consolidated: &ConsolidatedMetadataV2,
    path: &NodePath,
) -> Result<Option<NodeMetadata>, StorageError> {
    let entry_key = |file: &str| {
        if path.is_root() {
            file.to_string()
        } else {
            format!("{}/{file}", &path.as_str()[1..])
        }
    };
    let entry = |file: &str| consolidated.metadata.get(&entry_key(file));
    let invalid = |file: &str, err: String| {
        StorageError::InvalidMetadata(
            unsafe { StoreKey::new_unchecked(entry_key(file)) },
            err,
        )
    };

    let attributes = match entry(".zattrs") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err: serde_json::Error| invalid(".zattrs", err.to_string()))?,
        None => serde_json::Map::new(),
    };

    if let Some(value) = entry(".zarray") {
        let array_v2: ArrayMetadataV2 = serde_json::from_value(value.clone())
            .map_err(|err| invalid(".zarray", err.to_string()))?;
        let metadata = array_metadata_v2_to_v3(&array_v2, attributes)
            .map_err(|err| invalid(".zarray", err.to_string()))?;
        Ok(Some(NodeMetadata::Array(metadata)))
    } else if let Some(value) = entry(".zgroup") {
        let group_v2: GroupMetadataV2 = serde_json::from_value(value.clone())
            .map_err(|err| invalid(".zgroup", err.to_string()))?;
        Ok(Some(NodeMetadata::Group(group_metadata_v2_to_v3(
            &group_v2, attributes,
        ))))
    } else {
        Ok(None)
    }
}

/// Return the node paths named by a V2 consolidated metadata document.
///
/// Node discovery is driven by the unique prefixes of the metadata keys.
#[must_use]
pub fn consolidated_node_paths(consolidated: &ConsolidatedMetadataV2) -> Vec<NodePath> {
    let mut paths = std::collections::BTreeSet::new();
    for key in consolidated.metadata.keys() {
        let (prefix, file) = match key.rsplit_once('/') {
            Some((prefix, file)) => (Some(prefix), file),
            None => (None, key.as_str()),
        };
        if matches!(file, ".zarray" | ".zgroup" | ".zattrs") {
            let path = prefix.map_or_else(|| "/".to_string(), |prefix| format!("/{prefix}"));
            if let Ok(path) = NodePath::new(&path) {
                paths.insert(path);
            }
        }
    }
    paths.into_iter().collect()
}

/// Write the metadata document of the node at `path`.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or a read-only store.
pub fn set_node_metadata<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
    metadata: &NodeMetadata,
) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(metadata).map_err(|err| {
        StorageError::InvalidMetadata(meta_key(path), err.to_string())
    })?;
    store.set(&meta_key(path), &json)
}

/// Create a group at `path` by committing its metadata document.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or a read-only store.
pub fn create_group<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
) -> Result<GroupMetadataV3, StorageError> {
    let metadata = GroupMetadataV3::default();
    set_node_metadata(store, path, &NodeMetadata::Group(metadata.clone()))?;
    Ok(metadata)
}

/// Create an array at `path` by committing its metadata document.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or a read-only store.
pub fn create_array<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
    metadata: &ArrayMetadataV3,
) -> Result<(), StorageError> {
    set_node_metadata(store, path, &NodeMetadata::Array(metadata.clone()))
}

/// Erase the node at `path` and all its descendants.
///
/// Returns true if anything was erased.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or a read-only store.
pub fn erase_node<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
) -> Result<bool, StorageError> {
    store.erase_prefix(&StorePrefix::from(path))
}

/// Erase all descendants of the node at `path`, rewriting a minimal group
/// metadata document at the node itself.
///
/// # Errors
/// Returns a [`StorageError`] on a backend failure or a read-only store.
pub fn erase_node_children<TStore: Store + ?Sized>(
    store: &TStore,
    path: &NodePath,
) -> Result<GroupMetadataV3, StorageError> {
    store.erase_prefix(&StorePrefix::from(path))?;
    create_group(store, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_meta_keys() {
        let root = NodePath::root();
        assert_eq!(meta_key(&root).as_str(), "zarr.json");
        assert_eq!(meta_key_v2_array(&root).as_str(), ".zarray");
        let path = NodePath::new("/a/b").unwrap();
        assert_eq!(meta_key(&path).as_str(), "a/b/zarr.json");
        assert_eq!(meta_key_v2_group(&path).as_str(), "a/b/.zgroup");
        assert_eq!(meta_key_v2_attributes(&path).as_str(), "a/b/.zattrs");
    }

    #[test]
    fn storage_data_key() {
        let key = unsafe { StoreKey::new_unchecked("c/0/1") };
        assert_eq!(
            data_key(&NodePath::new("/a").unwrap(), &key).as_str(),
            "a/c/0/1"
        );
        assert_eq!(data_key(&NodePath::root(), &key).as_str(), "c/0/1");
    }

    #[test]
    fn storage_consolidated_node_paths() {
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_str(
            r#"{
                "zarr_consolidated_format": 1,
                "metadata": {
                    ".zgroup": {"zarr_format": 2},
                    ".zattrs": {},
                    "latitude/.zarray": {},
                    "latitude/.zattrs": {},
                    "grp/nested/.zgroup": {}
                }
            }"#,
        )
        .unwrap();
        let paths = consolidated_node_paths(&consolidated);
        assert_eq!(
            paths,
            vec![
                NodePath::new("/").unwrap(),
                NodePath::new("/grp/nested").unwrap(),
                NodePath::new("/latitude").unwrap(),
            ]
        );
    }
}
