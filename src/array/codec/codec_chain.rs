//! An ordered, validated sequence of codecs.

use itertools::izip;
use thiserror::Error;

use crate::{array::ChunkRepresentation, metadata::MetadataV3};

use super::{
    ArrayToArrayCodecTraits, ArrayToBytesCodecTraits, BytesToBytesCodecTraits, Codec,
    CodecCreateError, CodecError,
};

/// A codec chain.
///
/// A valid chain is zero or more `array→array` codecs, followed by exactly one
/// `array→bytes` codec, followed by zero or more `bytes→bytes` codecs.
/// Encoding runs the codecs in order; decoding runs them in reverse.
#[derive(Clone, Debug)]
pub struct CodecChain {
    array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>>,
    array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
    bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
}

/// A codec chain creation error.
#[derive(Debug, Error)]
pub enum CodecChainCreateError {
    /// A codec could not be created.
    #[error(transparent)]
    CodecCreateError(#[from] CodecCreateError),
    /// The chain has no `array→bytes` codec.
    #[error("the codec chain has no array to bytes codec")]
    MissingArrayToBytesCodec,
    /// The chain has more than one `array→bytes` codec.
    #[error("the codec chain has multiple array to bytes codecs")]
    MultipleArrayToBytesCodecs,
    /// A codec is out of order in the chain.
    #[error("codec {_0} is out of order in the codec chain")]
    InvalidCodecOrder(String),
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(
        array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>>,
        array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
        bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> Self {
        Self {
            array_to_array,
            array_to_bytes,
            bytes_to_bytes,
        }
    }

    /// Create a codec chain from a list of codec metadata.
    ///
    /// # Errors
    /// Returns a [`CodecChainCreateError`] if a codec cannot be created or the
    /// chain does not satisfy the chaining invariant.
    pub fn from_metadata(metadatas: &[MetadataV3]) -> Result<Self, CodecChainCreateError> {
        let mut array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>> = vec![];
        let mut array_to_bytes: Option<Box<dyn ArrayToBytesCodecTraits>> = None;
        let mut bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>> = vec![];
        for metadata in metadatas {
            match Codec::from_metadata(metadata)? {
                Codec::ArrayToArray(codec) => {
                    if array_to_bytes.is_some() {
                        return Err(CodecChainCreateError::InvalidCodecOrder(
                            metadata.name().to_string(),
                        ));
                    }
                    array_to_array.push(codec);
                }
                Codec::ArrayToBytes(codec) => {
                    if array_to_bytes.is_some() {
                        return Err(CodecChainCreateError::MultipleArrayToBytesCodecs);
                    }
                    array_to_bytes = Some(codec);
                }
                Codec::BytesToBytes(codec) => {
                    if array_to_bytes.is_none() {
                        return Err(CodecChainCreateError::InvalidCodecOrder(
                            metadata.name().to_string(),
                        ));
                    }
                    bytes_to_bytes.push(codec);
                }
            }
        }
        let array_to_bytes =
            array_to_bytes.ok_or(CodecChainCreateError::MissingArrayToBytesCodec)?;
        Ok(Self::new(array_to_array, array_to_bytes, bytes_to_bytes))
    }

    /// Create the codec chain metadata, in order.
    #[must_use]
    pub fn create_metadatas(&self) -> Vec<MetadataV3> {
        let mut metadatas =
            Vec::with_capacity(self.array_to_array.len() + 1 + self.bytes_to_bytes.len());
        for codec in &self.array_to_array {
            metadatas.push(codec.create_metadata());
        }
        metadatas.push(self.array_to_bytes.create_metadata());
        for codec in &self.bytes_to_bytes {
            metadatas.push(codec.create_metadata());
        }
        metadatas
    }

    /// Return the number of codecs in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.array_to_array.len() + 1 + self.bytes_to_bytes.len()
    }

    /// Returns false; a codec chain always holds an `array→bytes` codec.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The input representations of each `array→array` codec, and finally the
    /// representation consumed by the `array→bytes` codec.
    fn representations(&self, decoded_representation: &ChunkRepresentation) -> Vec<ChunkRepresentation> {
        let mut representations = Vec::with_capacity(self.array_to_array.len() + 1);
        representations.push(decoded_representation.clone());
        for codec in &self.array_to_array {
            let representation = codec.encoded_representation(representations.last().unwrap());
            representations.push(representation);
        }
        representations
    }

    /// Encode a decoded chunk buffer into its stored byte representation.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if a codec fails.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut representation = decoded_representation.clone();
        let mut value = decoded_value;
        for codec in &self.array_to_array {
            value = codec.encode(value, &representation)?;
            representation = codec.encoded_representation(&representation);
        }
        value = self.array_to_bytes.encode(value, &representation)?;
        for codec in &self.bytes_to_bytes {
            value = codec.encode(value)?;
        }
        Ok(value)
    }

    /// Decode a stored byte representation into a decoded chunk buffer.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if a codec fails.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let representations = self.representations(decoded_representation);
        let mut value = encoded_value;
        for codec in self.bytes_to_bytes.iter().rev() {
            value = codec.decode(value)?;
        }
        value = self
            .array_to_bytes
            .decode(value, representations.last().unwrap())?;
        for (codec, representation) in izip!(
            self.array_to_array.iter().rev(),
            representations.iter().rev().skip(1)
        ) {
            value = codec.decode(value, representation)?;
        }
        Ok(value)
    }
}
