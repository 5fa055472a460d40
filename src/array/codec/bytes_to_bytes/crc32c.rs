//! The `crc32c` checksum bytes to bytes codec.
//!
//! Appends a CRC32C checksum of the input bytestream.

use serde::{Deserialize, Serialize};

use crate::{array::codec::Codec, metadata::MetadataV3};

use super::super::{BytesToBytesCodecTraits, CodecCreateError, CodecError, CodecTraits};

/// The identifier of the `crc32c` codec.
pub const IDENTIFIER: &str = "crc32c";

const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();

/// `crc32c` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Crc32cCodecConfiguration {}

pub(crate) fn create_codec_crc32c(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let _configuration: Crc32cCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(Crc32cCodec::new());
    Ok(Codec::BytesToBytes(codec))
}

/// A `crc32c` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct Crc32cCodec {}

impl Crc32cCodec {
    /// Create a new `crc32c` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl CodecTraits for Crc32cCodec {
    fn create_metadata(&self) -> MetadataV3 {
        MetadataV3::new(IDENTIFIER)
    }
}

impl BytesToBytesCodecTraits for Crc32cCodec {
    fn encode(&self, mut decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value);
        decoded_value.extend_from_slice(&checksum.to_le_bytes());
        Ok(decoded_value)
    }

    fn decode(&self, mut encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() < CHECKSUM_SIZE {
            return Err(CodecError::UnexpectedEncodedSize(
                encoded_value.len(),
                CHECKSUM_SIZE,
            ));
        }
        let split = encoded_value.len() - CHECKSUM_SIZE;
        let stored: [u8; CHECKSUM_SIZE] = encoded_value[split..].try_into().unwrap();
        let stored = u32::from_le_bytes(stored);
        let computed = crc32c::crc32c(&encoded_value[..split]);
        if stored != computed {
            // a checksum mismatch is not fatal; the data is still returned
            log::warn!("crc32c checksum mismatch: stored {stored:#010x}, computed {computed:#010x}");
        }
        encoded_value.truncate(split);
        Ok(encoded_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_crc32c_round_trip() {
        let bytes: Vec<u8> = (0..6).collect();
        let codec = Crc32cCodec::new();
        let encoded = codec.encode(bytes.clone()).unwrap();
        assert_eq!(encoded.len(), bytes.len() + CHECKSUM_SIZE);
        // the trailing checksum is little-endian CRC32C
        assert_eq!(&encoded[encoded.len() - 4..], &[74, 207, 235, 48]);
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_crc32c_mismatch_is_non_fatal() {
        let bytes: Vec<u8> = (0..6).collect();
        let codec = Crc32cCodec::new();
        let mut encoded = codec.encode(bytes.clone()).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        // corrupted checksum still yields the data
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_crc32c_too_short() {
        let codec = Crc32cCodec::new();
        assert!(codec.decode(vec![0, 1]).is_err());
    }
}
