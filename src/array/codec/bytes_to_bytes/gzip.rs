//! The `gzip` bytes to bytes codec.
//!
//! Applies [gzip](https://datatracker.ietf.org/doc/html/rfc1952) compression.

use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{array::codec::Codec, metadata::MetadataV3};

use super::super::{BytesToBytesCodecTraits, CodecCreateError, CodecError, CodecTraits};

/// The identifier of the `gzip` codec.
pub const IDENTIFIER: &str = "gzip";

/// An integer from 0 to 9 controlling the gzip compression level.
///
/// 0 is no compression, 1 the fastest, and 9 the slowest producing the most
/// compression.
#[derive(Serialize, Copy, Clone, Eq, PartialEq, Debug)]
pub struct GzipCompressionLevel(u32);

/// An invalid gzip compression level error.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid gzip compression level {_0}, must be 0 to 9")]
pub struct GzipCompressionLevelError(u32);

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl<'de> serde::Deserialize<'de> for GzipCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = u32::deserialize(d)?;
        Self::try_from(level).map_err(serde::de::Error::custom)
    }
}

impl GzipCompressionLevel {
    /// Return the compression level as a [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// `gzip` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct GzipCodecConfiguration {
    /// The compression level.
    pub level: GzipCompressionLevel,
}

pub(crate) fn create_codec_gzip(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let configuration: GzipCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(GzipCodec::new_with_configuration(&configuration));
    Ok(Codec::BytesToBytes(codec))
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `gzip` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &GzipCodecConfiguration) -> Self {
        Self {
            compression_level: configuration.level,
        }
    }
}

impl CodecTraits for GzipCodec {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = GzipCodecConfiguration {
            level: self.compression_level,
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{ "level": 1 }"#;

    #[test]
    fn codec_gzip_configuration_valid() {
        assert!(serde_json::from_str::<GzipCodecConfiguration>(JSON_VALID).is_ok());
    }

    #[test]
    fn codec_gzip_configuration_invalid() {
        assert!(serde_json::from_str::<GzipCodecConfiguration>(r#"{ "level": -1 }"#).is_err());
        assert!(serde_json::from_str::<GzipCodecConfiguration>(r#"{ "level": 10 }"#).is_err());
    }

    #[test]
    fn codec_gzip_round_trip() {
        let bytes: Vec<u8> = (0..64).collect();
        let configuration: GzipCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = GzipCodec::new_with_configuration(&configuration);
        let encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }
}
