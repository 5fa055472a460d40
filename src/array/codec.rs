//! Zarr codecs.
//!
//! A codec is a single transformation stage with typed input and output
//! domains: `array→array`, `array→bytes`, or `bytes→bytes`. An ordered,
//! validated sequence of codecs forms a [`CodecChain`] mapping a decoded
//! chunk to its stored byte representation and back.

pub mod array_to_array;
pub mod array_to_bytes;
pub mod bytes_to_bytes;

mod codec_chain;

pub use codec_chain::{CodecChain, CodecChainCreateError};

#[cfg(feature = "transpose")]
pub use array_to_array::transpose::{TransposeCodec, TransposeCodecConfiguration, TransposeOrder};

pub use array_to_bytes::bytes::{BytesCodec, BytesCodecConfiguration};

#[cfg(feature = "blosc")]
pub use bytes_to_bytes::blosc::{
    BloscCodec, BloscCodecConfiguration, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
#[cfg(feature = "crc32c")]
pub use bytes_to_bytes::crc32c::{Crc32cCodec, Crc32cCodecConfiguration};
#[cfg(feature = "gzip")]
pub use bytes_to_bytes::gzip::{GzipCodec, GzipCodecConfiguration, GzipCompressionLevel};
#[cfg(feature = "zstd")]
pub use bytes_to_bytes::zstd::{ZstdCodec, ZstdCodecConfiguration, ZstdCompressionLevel};

use thiserror::Error;

use crate::metadata::{ConfigurationInvalidError, MetadataV3};

use super::ChunkRepresentation;

/// Traits shared by all codecs.
pub trait CodecTraits: dyn_clone::DynClone + core::fmt::Debug + Send + Sync {
    /// Create the metadata of the codec.
    fn create_metadata(&self) -> MetadataV3;
}

/// Traits for an `array→array` codec.
pub trait ArrayToArrayCodecTraits: CodecTraits {
    /// Encode a decoded chunk buffer.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input is incompatible with `decoded_representation`.
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decode an encoded chunk buffer.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input is incompatible with `decoded_representation`.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Return the representation of chunks encoded by this codec.
    fn encoded_representation(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> ChunkRepresentation;
}

/// Traits for an `array→bytes` codec.
pub trait ArrayToBytesCodecTraits: CodecTraits {
    /// Encode a decoded chunk buffer into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input is incompatible with `decoded_representation`.
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes into a decoded chunk buffer.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input is incompatible with `decoded_representation`.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Traits for a `bytes→bytes` codec.
pub trait BytesToBytesCodecTraits: CodecTraits {
    /// Encode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if encoding fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if decoding fails.
    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

dyn_clone::clone_trait_object!(ArrayToArrayCodecTraits);
dyn_clone::clone_trait_object!(ArrayToBytesCodecTraits);
dyn_clone::clone_trait_object!(BytesToBytesCodecTraits);

/// A codec, classified by its input and output domains.
#[derive(Debug)]
pub enum Codec {
    /// An `array→array` codec.
    ArrayToArray(Box<dyn ArrayToArrayCodecTraits>),
    /// An `array→bytes` codec.
    ArrayToBytes(Box<dyn ArrayToBytesCodecTraits>),
    /// A `bytes→bytes` codec.
    BytesToBytes(Box<dyn BytesToBytesCodecTraits>),
}

impl Codec {
    /// Create a codec from metadata.
    ///
    /// # Errors
    /// Returns [`CodecCreateError`] if the metadata does not name a supported
    /// codec or its configuration is invalid.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, CodecCreateError> {
        match metadata.name() {
            #[cfg(feature = "transpose")]
            array_to_array::transpose::IDENTIFIER => {
                array_to_array::transpose::create_codec_transpose(metadata)
            }
            array_to_bytes::bytes::IDENTIFIER => array_to_bytes::bytes::create_codec_bytes(metadata),
            #[cfg(feature = "blosc")]
            bytes_to_bytes::blosc::IDENTIFIER => bytes_to_bytes::blosc::create_codec_blosc(metadata),
            #[cfg(feature = "gzip")]
            bytes_to_bytes::gzip::IDENTIFIER => bytes_to_bytes::gzip::create_codec_gzip(metadata),
            #[cfg(feature = "zstd")]
            bytes_to_bytes::zstd::IDENTIFIER => bytes_to_bytes::zstd::create_codec_zstd(metadata),
            #[cfg(feature = "crc32c")]
            bytes_to_bytes::crc32c::IDENTIFIER => {
                bytes_to_bytes::crc32c::create_codec_crc32c(metadata)
            }
            name => Err(CodecCreateError::Unsupported(name.to_string())),
        }
    }
}

/// A codec creation error.
#[derive(Debug, Error)]
pub enum CodecCreateError {
    /// The codec is not supported.
    #[error("codec {_0} is not supported")]
    Unsupported(String),
    /// The codec configuration is invalid.
    #[error(transparent)]
    ConfigurationInvalid(#[from] ConfigurationInvalidError),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded value has an unexpected size.
    #[error("the decoded value has {_0} bytes, expected {_1}")]
    UnexpectedChunkDecodedSize(usize, u64),
    /// The encoded value is too short to decode.
    #[error("the encoded value has {_0} bytes, expected at least {_1}")]
    UnexpectedEncodedSize(usize, usize),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
