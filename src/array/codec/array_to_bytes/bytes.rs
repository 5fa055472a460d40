//! The `bytes` array to bytes codec.
//!
//! Serializes chunk elements to a tightly packed byte vector with a declared
//! endianness.

use serde::{Deserialize, Serialize};

use crate::{
    array::{codec::Codec, ChunkRepresentation, DataType, Endianness, NATIVE_ENDIAN},
    metadata::MetadataV3,
};

use super::super::{ArrayToBytesCodecTraits, CodecCreateError, CodecError, CodecTraits};

/// The identifier of the `bytes` codec.
pub const IDENTIFIER: &str = "bytes";

/// `bytes` codec configuration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct BytesCodecConfiguration {
    /// The endianness of the stored bytes. Unspecified for single-byte types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endian: Option<Endianness>,
}

pub(crate) fn create_codec_bytes(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let configuration: BytesCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(BytesCodec::new(configuration.endian));
    Ok(Codec::ArrayToBytes(codec))
}

/// A `bytes` codec implementation.
#[derive(Clone, Debug)]
pub struct BytesCodec {
    endian: Option<Endianness>,
}

impl Default for BytesCodec {
    fn default() -> Self {
        Self::new(Some(NATIVE_ENDIAN))
    }
}

impl BytesCodec {
    /// Create a new `bytes` codec.
    ///
    /// `endian` is optional because single-byte types have no endianness.
    #[must_use]
    pub const fn new(endian: Option<Endianness>) -> Self {
        Self { endian }
    }

    /// Create a new `bytes` codec for little endian data.
    #[must_use]
    pub const fn little() -> Self {
        Self::new(Some(Endianness::Little))
    }

    /// Create a new `bytes` codec for big endian data.
    #[must_use]
    pub const fn big() -> Self {
        Self::new(Some(Endianness::Big))
    }

    fn do_encode_or_decode(
        &self,
        mut value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                value.len(),
                decoded_representation.size(),
            ));
        }
        if decoded_representation.element_size() > 1 && self.endian.is_none() {
            return Err(CodecError::Other(format!(
                "cannot encode or decode elements of {} with an unspecified endianness",
                decoded_representation.data_type()
            )));
        }

        if let Some(endian) = self.endian {
            if !endian.is_native() {
                reverse_endianness(&mut value, decoded_representation.data_type());
            }
        }
        Ok(value)
    }
}

/// Reverse the endianness of each element of `value`.
fn reverse_endianness(value: &mut [u8], data_type: &DataType) {
    match data_type.size() {
        1 => {}
        size => value
            .chunks_exact_mut(size)
            .for_each(<[u8]>::reverse),
    }
}

impl CodecTraits for BytesCodec {
    fn create_metadata(&self) -> MetadataV3 {
        if let Some(endian) = self.endian {
            let configuration = BytesCodecConfiguration {
                endian: Some(endian),
            };
            MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
        } else {
            MetadataV3::new(IDENTIFIER)
        }
    }
}

impl ArrayToBytesCodecTraits for BytesCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(decoded_value, decoded_representation)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(encoded_value, decoded_representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn representation(data_type: DataType, num_elements: u64) -> ChunkRepresentation {
        ChunkRepresentation::new(
            vec![num_elements],
            data_type,
            data_type.default_fill_value(),
        )
        .unwrap()
    }

    #[test]
    fn codec_bytes_configuration() {
        let configuration: BytesCodecConfiguration =
            serde_json::from_str(r#"{"endian":"little"}"#).unwrap();
        assert_eq!(configuration.endian, Some(Endianness::Little));
        let configuration: BytesCodecConfiguration = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(configuration.endian, None);
        assert!(serde_json::from_str::<BytesCodecConfiguration>(r#"{"endian":"middle"}"#).is_err());
    }

    #[test]
    fn codec_bytes_little_endian() {
        let codec = BytesCodec::little();
        let elements: Vec<u16> = vec![0x0102, 0x0304];
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_ne_bytes()).collect();
        let encoded = codec
            .encode(bytes.clone(), &representation(DataType::UInt16, 2))
            .unwrap();
        assert_eq!(encoded, vec![0x02, 0x01, 0x04, 0x03]);
        let decoded = codec
            .decode(encoded, &representation(DataType::UInt16, 2))
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn codec_bytes_big_endian() {
        let codec = BytesCodec::big();
        let elements: Vec<u32> = vec![0x0102_0304];
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_ne_bytes()).collect();
        let encoded = codec
            .encode(bytes, &representation(DataType::UInt32, 1))
            .unwrap();
        assert_eq!(encoded, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn codec_bytes_single_byte_no_endian() {
        let codec = BytesCodec::new(None);
        let bytes = vec![1u8, 2, 3];
        assert_eq!(
            codec
                .encode(bytes.clone(), &representation(DataType::UInt8, 3))
                .unwrap(),
            bytes
        );
        assert_eq!(codec.create_metadata().to_string(), "bytes");
        // multi-byte types require an endianness
        assert!(codec
            .encode(vec![0; 4], &representation(DataType::UInt16, 2))
            .is_err());
    }

    #[test]
    fn codec_bytes_invalid_length() {
        let codec = BytesCodec::little();
        assert!(codec
            .encode(vec![0; 3], &representation(DataType::UInt16, 2))
            .is_err());
    }
}
