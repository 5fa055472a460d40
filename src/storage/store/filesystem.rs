//! A local filesystem store.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    array::ChunkKeySeparator,
    byte_range::{ByteRange, InvalidByteRangeError},
    storage::{
        MaybeBytes, StorageError, Store, StoreKey, StoreKeyError, StoreKeys, StoreKeysPrefixes,
        StorePrefix,
    },
};

/// A local filesystem store.
///
/// The store root is a directory; keys are file paths relative to it. The
/// default chunk key separator is `/`.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The base path is not valid.
    #[error("base path {} is not valid", _0.display())]
    InvalidBasePath(PathBuf),
}

impl FilesystemStore {
    /// Create a new filesystem store at `base_path`.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path` is not valid
    /// UTF-8 or cannot be probed.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            let md = std::fs::metadata(&base_path)?;
            md.permissions().readonly()
        } else {
            // probe by creating the directory, leaving the path untouched
            std::fs::create_dir_all(&base_path)?;
            std::fs::remove_dir(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            readonly,
        })
    }

    /// Maps a [`StoreKey`] to a filesystem path.
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        if !key.as_str().is_empty() {
            path.push(key.as_str());
        }
        path
    }

    /// Maps a filesystem path to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let path = pathdiff::diff_paths(path, &self.base_path).ok_or_else(|| {
            StoreKeyError::from(path.to_str().unwrap_or_default().to_string())
        })?;
        let path_str = path.to_string_lossy().into_owned();
        #[cfg(windows)]
        let path_str = path_str.replace('\\', "/");
        StoreKey::new(path_str)
    }

    /// Maps a [`StorePrefix`] to a filesystem path.
    #[must_use]
    pub fn prefix_to_fspath(&self, prefix: &StorePrefix) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(prefix.as_str());
        path
    }

    fn guard_writable(&self) -> Result<(), StorageError> {
        if self.readonly {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl Store for FilesystemStore {
    fn get(
        &self,
        key: &StoreKey,
        byte_range: Option<ByteRange>,
    ) -> Result<MaybeBytes, StorageError> {
        let mut file = match File::open(self.key_to_fspath(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let size = file.metadata()?.len();
        let Some(byte_range) = byte_range else {
            let mut buffer = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
            file.read_to_end(&mut buffer)?;
            return Ok(Some(buffer));
        };
        if !byte_range.is_valid(size) {
            return Err(InvalidByteRangeError::new(byte_range, size).into());
        }
        file.seek(SeekFrom::Start(byte_range.start(size)))?;
        let length = usize::try_from(byte_range.length(size)).unwrap();
        let mut buffer = vec![0; length];
        file.read_exact(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.key_to_fspath(key).is_file())
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.guard_writable()?;
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(key_path, value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        self.guard_writable()?;
        let key_path = self.key_to_fspath(key);
        let Ok(metadata) = std::fs::metadata(&key_path) else {
            return Ok(false);
        };
        if metadata.is_file() {
            std::fs::remove_file(&key_path)?;
            return Ok(true);
        }
        // a directory is erasable only while it has no child directories
        let has_child_dir = std::fs::read_dir(&key_path)?
            .filter_map(Result::ok)
            .any(|entry| entry.path().is_dir());
        if has_child_dir {
            return Ok(false);
        }
        std::fs::remove_dir_all(&key_path)?;
        Ok(true)
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        self.guard_writable()?;
        let prefix_path = self.prefix_to_fspath(prefix);
        if prefix_path.exists() {
            if prefix.as_str().is_empty() {
                // erase the contents but keep the store root directory
                let mut any = false;
                for entry in std::fs::read_dir(&prefix_path)? {
                    let entry = entry?;
                    if entry.path().is_dir() {
                        std::fs::remove_dir_all(entry.path())?;
                    } else {
                        std::fs::remove_file(entry.path())?;
                    }
                    any = true;
                }
                Ok(any)
            } else {
                std::fs::remove_dir_all(&prefix_path)?;
                Ok(true)
            }
        } else {
            Ok(false)
        }
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let prefix_path = self.prefix_to_fspath(prefix);
        if !prefix_path.exists() {
            return Ok(vec![]);
        }
        let mut keys: StoreKeys = WalkDir::new(&prefix_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.fspath_to_key(entry.path()).ok())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let prefix_path = self.prefix_to_fspath(prefix);
        let mut keys: StoreKeys = vec![];
        let mut prefixes: Vec<StorePrefix> = vec![];
        if !prefix_path.exists() {
            return Ok(StoreKeysPrefixes::new(keys, prefixes));
        }
        for entry in std::fs::read_dir(&prefix_path)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if entry.path().is_dir() {
                if let Ok(child) = StorePrefix::new(format!("{}{name}/", prefix.as_str())) {
                    prefixes.push(child);
                }
            } else if let Ok(key) = self.fspath_to_key(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        prefixes.sort();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn readonly(&self) -> bool {
        self.readonly
    }

    fn separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Slash
    }
}
