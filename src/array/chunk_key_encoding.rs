//! Zarr chunk key encodings.
//!
//! The chunk key encoding forms store keys from chunk grid indices. The
//! `default` encoding joins the indices with a separator under a `c` prefix;
//! the `v2` encoding joins them without a prefix, as Zarr V2 did.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{metadata::MetadataV3, storage::StoreKey};

/// The identifier of the `default` chunk key encoding.
pub const DEFAULT_IDENTIFIER: &str = "default";

/// The identifier of the `v2` chunk key encoding.
pub const V2_IDENTIFIER: &str = "v2";

/// A chunk key separator.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChunkKeySeparator {
    /// `/` separated chunk keys.
    #[serde(rename = "/")]
    Slash,
    /// `.` separated chunk keys.
    #[serde(rename = ".")]
    Dot,
}

impl ChunkKeySeparator {
    /// Return the separator character.
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            Self::Slash => '/',
            Self::Dot => '.',
        }
    }
}

impl core::fmt::Display for ChunkKeySeparator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `default` chunk key encoding configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator. Defaults to `/`.
    #[serde(default = "separator_default_slash")]
    pub separator: ChunkKeySeparator,
}

/// `v2` chunk key encoding configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct V2ChunkKeyEncodingConfiguration {
    /// The chunk key separator. Defaults to `.`.
    #[serde(default = "separator_default_dot")]
    pub separator: ChunkKeySeparator,
}

const fn separator_default_slash() -> ChunkKeySeparator {
    ChunkKeySeparator::Slash
}

const fn separator_default_dot() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

/// A chunk key encoding creation error.
#[derive(Clone, Debug, Error)]
pub enum ChunkKeyEncodingCreateError {
    /// The chunk key encoding is not supported.
    #[error("chunk key encoding {_0} is not supported")]
    Unsupported(String),
    /// The chunk key encoding configuration is invalid.
    #[error("invalid chunk key encoding configuration {_0}")]
    InvalidConfiguration(String),
}

/// A chunk key encoding.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChunkKeyEncoding {
    /// The Zarr V3 `default` encoding: `c` + separator + separator-joined indices.
    Default {
        /// The chunk key separator.
        separator: ChunkKeySeparator,
    },
    /// The `v2` encoding: separator-joined indices with no prefix.
    V2 {
        /// The chunk key separator.
        separator: ChunkKeySeparator,
    },
}

impl Default for ChunkKeyEncoding {
    fn default() -> Self {
        Self::Default {
            separator: ChunkKeySeparator::Slash,
        }
    }
}

impl ChunkKeyEncoding {
    /// Create a `default` chunk key encoding with `separator`.
    #[must_use]
    pub const fn new_default(separator: ChunkKeySeparator) -> Self {
        Self::Default { separator }
    }

    /// Create a `v2` chunk key encoding with `separator`.
    #[must_use]
    pub const fn new_v2(separator: ChunkKeySeparator) -> Self {
        Self::V2 { separator }
    }

    /// Create a chunk key encoding from metadata.
    ///
    /// # Errors
    /// Returns [`ChunkKeyEncodingCreateError`] if the metadata does not name a
    /// supported chunk key encoding or its configuration is invalid.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, ChunkKeyEncodingCreateError> {
        match metadata.name() {
            DEFAULT_IDENTIFIER => {
                let configuration: DefaultChunkKeyEncodingConfiguration = metadata
                    .to_configuration("chunk key encoding")
                    .map_err(|err| {
                        ChunkKeyEncodingCreateError::InvalidConfiguration(err.to_string())
                    })?;
                Ok(Self::Default {
                    separator: configuration.separator,
                })
            }
            V2_IDENTIFIER => {
                let configuration: V2ChunkKeyEncodingConfiguration = metadata
                    .to_configuration("chunk key encoding")
                    .map_err(|err| {
                        ChunkKeyEncodingCreateError::InvalidConfiguration(err.to_string())
                    })?;
                Ok(Self::V2 {
                    separator: configuration.separator,
                })
            }
            name => Err(ChunkKeyEncodingCreateError::Unsupported(name.to_string())),
        }
    }

    /// Create the metadata of this chunk key encoding.
    #[must_use]
    pub fn create_metadata(&self) -> MetadataV3 {
        let name = match self {
            Self::Default { .. } => DEFAULT_IDENTIFIER,
            Self::V2 { .. } => V2_IDENTIFIER,
        };
        let mut configuration = serde_json::Map::new();
        configuration.insert(
            "separator".to_string(),
            self.separator().as_char().to_string().into(),
        );
        MetadataV3::new_with_configuration(name, configuration)
    }

    /// Return the separator of the encoding.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        match self {
            Self::Default { separator } | Self::V2 { separator } => *separator,
        }
    }

    /// Encode chunk grid indices into a store key, relative to the array prefix.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        let separator = self.separator().as_char();
        let join = |indices: &[u64]| {
            indices
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(&separator.to_string())
        };
        let key = match self {
            Self::Default { .. } => {
                if chunk_grid_indices.is_empty() {
                    "c".to_string()
                } else {
                    format!("c{separator}{}", join(chunk_grid_indices))
                }
            }
            Self::V2 { .. } => {
                if chunk_grid_indices.is_empty() {
                    "0".to_string()
                } else {
                    join(chunk_grid_indices)
                }
            }
        };
        unsafe { StoreKey::new_unchecked(key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_encoding_default() {
        let encoding = ChunkKeyEncoding::default();
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "c/1/23/45");
        let encoding = ChunkKeyEncoding::new_default(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "c.1.23.45");
        assert_eq!(encoding.encode(&[]).as_str(), "c");
    }

    #[test]
    fn chunk_key_encoding_v2() {
        let encoding = ChunkKeyEncoding::new_v2(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "1.23.45");
        let encoding = ChunkKeyEncoding::new_v2(ChunkKeySeparator::Slash);
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "1/23/45");
    }

    #[test]
    fn chunk_key_encoding_from_metadata() {
        let metadata: MetadataV3 =
            serde_json::from_str(r#"{"name": "default", "configuration": {"separator": "."}}"#)
                .unwrap();
        let encoding = ChunkKeyEncoding::from_metadata(&metadata).unwrap();
        assert_eq!(
            encoding,
            ChunkKeyEncoding::new_default(ChunkKeySeparator::Dot)
        );
        assert_eq!(encoding.create_metadata(), metadata);

        // separators default per encoding when omitted
        let metadata: MetadataV3 = serde_json::from_str(r#""default""#).unwrap();
        assert_eq!(
            ChunkKeyEncoding::from_metadata(&metadata).unwrap().separator(),
            ChunkKeySeparator::Slash
        );
        let metadata: MetadataV3 = serde_json::from_str(r#""v2""#).unwrap();
        assert_eq!(
            ChunkKeyEncoding::from_metadata(&metadata).unwrap().separator(),
            ChunkKeySeparator::Dot
        );

        let metadata: MetadataV3 = serde_json::from_str(r#""base64""#).unwrap();
        assert!(ChunkKeyEncoding::from_metadata(&metadata).is_err());
    }
}
