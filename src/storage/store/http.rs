//! A read-only HTTP store.

use parking_lot::RwLock;
use reqwest::{blocking::Client, StatusCode, Url};
use std::str::FromStr;
use thiserror::Error;

use crate::{
    array::ChunkKeySeparator,
    byte_range::{extract_byte_range_opt, ByteRange},
    metadata::v2::ConsolidatedMetadataV2,
    storage::{
        MaybeBytes, StorageError, Store, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
    },
};

/// A read-only HTTP store.
///
/// Each `get` issues a single fetch for the whole object; a requested byte
/// range is extracted from the response body. The store cannot list keys, so
/// hierarchy discovery relies on V2 consolidated metadata (`.zmetadata`) when
/// present.
#[derive(Debug)]
pub struct HttpStore {
    base_url: Url,
    client: Client,
    // fetched on first use; `Some(None)` caches the absence of .zmetadata
    consolidated: RwLock<Option<Option<ConsolidatedMetadataV2>>>,
}

/// An HTTP store creation error.
#[derive(Debug, Error)]
pub enum HttpStoreCreateError {
    /// The base URL is not valid.
    #[error("base url {_0} is not valid")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<url::ParseError> for StorageError {
    fn from(err: url::ParseError) -> Self {
        Self::Other(err.to_string())
    }
}

impl HttpStore {
    /// Create a new HTTP store at `base_url`.
    ///
    /// # Errors
    /// Returns a [`HttpStoreCreateError`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, HttpStoreCreateError> {
        let base_url = Url::from_str(base_url)
            .map_err(|_| HttpStoreCreateError::InvalidBaseUrl(base_url.into()))?;
        Ok(Self {
            base_url,
            client: Client::new(),
            consolidated: RwLock::new(None),
        })
    }

    /// Maps a [`StoreKey`] to an HTTP [`Url`].
    ///
    /// # Errors
    /// Returns an error if the resulting URL is invalid.
    pub fn key_to_url(&self, key: &StoreKey) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.as_str().to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(key.as_str());
        Url::parse(&url)
    }
}

impl Store for HttpStore {
    fn get(
        &self,
        key: &StoreKey,
        byte_range: Option<ByteRange>,
    ) -> Result<MaybeBytes, StorageError> {
        let url = self.key_to_url(key)?;
        let response = self.client.get(url).send()?;
        match response.status() {
            StatusCode::OK => {
                let bytes = response.bytes()?;
                Ok(Some(extract_byte_range_opt(&bytes, byte_range)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(StorageError::from(format!(
                "the http server responded with unexpected status {status} for {key}"
            ))),
        }
    }

    fn set(&self, _key: &StoreKey, _value: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase(&self, _key: &StoreKey) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase_prefix(&self, _prefix: &StorePrefix) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn list_prefix(&self, _prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Err(StorageError::Unsupported(
            "the http store does not support listing".to_string(),
        ))
    }

    fn list_dir(&self, _prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        Err(StorageError::Unsupported(
            "the http store does not support listing".to_string(),
        ))
    }

    fn readonly(&self) -> bool {
        true
    }

    fn supports_listing(&self) -> bool {
        false
    }

    fn supports_consolidated_metadata(&self) -> bool {
        true
    }

    fn consolidated_metadata(&self) -> Result<Option<ConsolidatedMetadataV2>, StorageError> {
        if let Some(consolidated) = self.consolidated.read().as_ref() {
            return Ok(consolidated.clone());
        }
        let key = unsafe { StoreKey::new_unchecked(".zmetadata") };
        let consolidated = match self.get(&key, None)? {
            Some(bytes) => {
                let consolidated: ConsolidatedMetadataV2 = serde_json::from_slice(&bytes)
                    .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
                if !consolidated.validate_format() {
                    return Err(StorageError::InvalidMetadata(
                        unsafe { StoreKey::new_unchecked(".zmetadata") },
                        format!(
                            "unsupported zarr_consolidated_format {}",
                            consolidated.zarr_consolidated_format
                        ),
                    ));
                }
                Some(consolidated)
            }
            None => None,
        };
        *self.consolidated.write() = Some(consolidated.clone());
        Ok(consolidated)
    }

    fn separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Slash
    }
}
