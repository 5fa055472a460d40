//! The `zstd` bytes to bytes codec.
//!
//! Applies [Zstandard](https://facebook.github.io/zstd/) compression.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{array::codec::Codec, metadata::MetadataV3};

use super::super::{BytesToBytesCodecTraits, CodecCreateError, CodecError, CodecTraits};

/// The identifier of the `zstd` codec.
pub const IDENTIFIER: &str = "zstd";

/// An integer from 1 to 20 controlling the zstd compression level.
#[derive(Serialize, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ZstdCompressionLevel(i32);

/// An invalid zstd compression level error.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid zstd compression level {_0}, must be 1 to 20")]
pub struct ZstdCompressionLevelError(i32);

impl TryFrom<i32> for ZstdCompressionLevel {
    type Error = ZstdCompressionLevelError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        if (1..=20).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ZstdCompressionLevelError(level))
        }
    }
}

impl<'de> serde::Deserialize<'de> for ZstdCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = i32::deserialize(d)?;
        Self::try_from(level).map_err(serde::de::Error::custom)
    }
}

impl ZstdCompressionLevel {
    /// Return the compression level as an [`i32`].
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

/// `zstd` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZstdCodecConfiguration {
    /// The compression level.
    pub level: ZstdCompressionLevel,
}

pub(crate) fn create_codec_zstd(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let configuration: ZstdCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(ZstdCodec::new_with_configuration(&configuration));
    Ok(Codec::BytesToBytes(codec))
}

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression_level: ZstdCompressionLevel,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    ///
    /// # Errors
    /// Returns [`ZstdCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: i32) -> Result<Self, ZstdCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `zstd` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ZstdCodecConfiguration) -> Self {
        Self {
            compression_level: configuration.level,
        }
    }
}

impl CodecTraits for ZstdCodec {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = ZstdCodecConfiguration {
            level: self.compression_level,
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for ZstdCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(Cursor::new(decoded_value), self.compression_level.as_i32())
            .map_err(CodecError::from)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(Cursor::new(encoded_value)).map_err(CodecError::from)
    }
}
