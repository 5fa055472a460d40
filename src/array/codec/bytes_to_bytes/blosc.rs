//! The `blosc` bytes to bytes codec.
//!
//! It uses the [blosc](https://www.blosc.org/) container format.

use std::ffi::{c_char, c_int, c_void};

use blosc_sys::{
    blosc_cbuffer_sizes, blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx,
    BLOSC_BITSHUFFLE, BLOSC_BLOSCLZ_COMPNAME, BLOSC_LZ4HC_COMPNAME, BLOSC_LZ4_COMPNAME,
    BLOSC_MAX_OVERHEAD, BLOSC_NOSHUFFLE, BLOSC_SHUFFLE, BLOSC_ZLIB_COMPNAME, BLOSC_ZSTD_COMPNAME,
};
use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{array::codec::Codec, metadata::MetadataV3};

use super::super::{BytesToBytesCodecTraits, CodecCreateError, CodecError, CodecTraits};

/// The identifier of the `blosc` codec.
pub const IDENTIFIER: &str = "blosc";

#[derive(Clone, Debug, Error, From)]
#[error("{_0}")]
struct BloscError(String);

impl From<&str> for BloscError {
    fn from(err: &str) -> Self {
        Self(err.to_string())
    }
}

/// An integer from 0 to 9 controlling the blosc compression level.
///
/// 0 turns compression off, 1 is the fastest, and 9 produces the most
/// compression.
#[derive(Serialize, Copy, Clone, Eq, PartialEq, Debug)]
pub struct BloscCompressionLevel(u8);

impl BloscCompressionLevel {
    /// Return the compression level as a [`u8`].
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BloscCompressionLevel {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(level)
        }
    }
}

impl<'de> serde::Deserialize<'de> for BloscCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(d)?;
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(serde::de::Error::custom("clevel must be between 0 and 9"))
        }
    }
}

/// The `blosc` shuffle mode.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum BloscShuffleMode {
    /// No shuffling.
    NoShuffle = BLOSC_NOSHUFFLE,
    /// Byte-wise shuffling.
    Shuffle = BLOSC_SHUFFLE,
    /// Bit-wise shuffling.
    BitShuffle = BLOSC_BITSHUFFLE,
}

/// The `blosc` compressor.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// [BloscLZ](https://github.com/Blosc/c-blosc/blob/master/blosc/blosclz.h): the blosc default compressor.
    BloscLZ,
    /// [LZ4](https://lz4.org/): a compact and very fast compressor.
    LZ4,
    /// [LZ4HC](https://lz4.org/): a tweaked LZ4 achieving better ratios at the expense of speed.
    LZ4HC,
    /// [Zlib](https://www.zlib.net/): slower, but achieving better compression ratios.
    Zlib,
    /// [Zstd](https://facebook.github.io/zstd/): an extremely well balanced compressor.
    Zstd,
}

impl BloscCompressor {
    const fn as_cstr(self) -> *const u8 {
        match self {
            Self::BloscLZ => BLOSC_BLOSCLZ_COMPNAME.as_ptr(),
            Self::LZ4 => BLOSC_LZ4_COMPNAME.as_ptr(),
            Self::LZ4HC => BLOSC_LZ4HC_COMPNAME.as_ptr(),
            Self::Zlib => BLOSC_ZLIB_COMPNAME.as_ptr(),
            Self::Zstd => BLOSC_ZSTD_COMPNAME.as_ptr(),
        }
    }
}

/// `blosc` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct BloscCodecConfiguration {
    /// The compressor.
    pub cname: BloscCompressor,
    /// The compression level.
    pub clevel: BloscCompressionLevel,
    /// The shuffle mode.
    pub shuffle: BloscShuffleMode,
    /// The shuffle element size in bytes. Required unless shuffling is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typesize: Option<usize>,
    /// The compression block size. 0 selects it automatically.
    #[serde(default)]
    pub blocksize: usize,
}

pub(crate) fn create_codec_blosc(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let configuration: BloscCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(
        BloscCodec::new_with_configuration(&configuration)
            .map_err(|err| CodecCreateError::Other(err.to_string()))?,
    );
    Ok(Codec::BytesToBytes(codec))
}

fn blosc_compress_bytes(
    src: &[u8],
    clevel: BloscCompressionLevel,
    shuffle_mode: BloscShuffleMode,
    typesize: usize,
    compressor: BloscCompressor,
    blocksize: usize,
) -> Result<Vec<u8>, BloscError> {
    let destsize = src.len() + BLOSC_MAX_OVERHEAD as usize;
    let mut dest: Vec<u8> = Vec::with_capacity(destsize);
    // one internal thread; chunk operations are sequential
    let destsize = unsafe {
        blosc_compress_ctx(
            c_int::from(clevel.0),
            shuffle_mode as c_int,
            typesize,
            src.len(),
            src.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            destsize,
            compressor.as_cstr().cast::<c_char>(),
            blocksize,
            1,
        )
    };
    if destsize > 0 {
        unsafe {
            #[allow(clippy::cast_sign_loss)]
            dest.set_len(destsize as usize);
        }
        dest.shrink_to_fit();
        Ok(dest)
    } else {
        Err(BloscError::from(format!(
            "blosc_compress_ctx(clevel: {}, doshuffle: {shuffle_mode:?}, typesize: {typesize}, nbytes: {}, compressor: {compressor:?}, blocksize: {blocksize}) -> {destsize} (failure)",
            clevel.0,
            src.len()
        )))
    }
}

/// Return the decompressed size of a valid `blosc` buffer.
fn blosc_validate(src: &[u8]) -> Option<usize> {
    let mut destsize: usize = 0;
    let valid = unsafe {
        blosc_cbuffer_validate(
            src.as_ptr().cast::<c_void>(),
            src.len(),
            std::ptr::addr_of_mut!(destsize),
        )
    } == 0;
    valid.then_some(destsize)
}

/// Return the uncompressed length of a `blosc` buffer.
///
/// # Safety
/// Validate first.
fn blosc_nbytes(src: &[u8]) -> Option<usize> {
    let mut uncompressed_bytes: usize = 0;
    let mut cbytes: usize = 0;
    let mut blocksize: usize = 0;
    unsafe {
        blosc_cbuffer_sizes(
            src.as_ptr().cast::<c_void>(),
            std::ptr::addr_of_mut!(uncompressed_bytes),
            std::ptr::addr_of_mut!(cbytes),
            std::ptr::addr_of_mut!(blocksize),
        );
    };
    (cbytes > 0 && blocksize > 0).then_some(uncompressed_bytes)
}

fn blosc_decompress_bytes(src: &[u8], destsize: usize) -> Result<Vec<u8>, BloscError> {
    let mut dest: Vec<u8> = Vec::with_capacity(destsize);
    let destsize = unsafe {
        blosc_decompress_ctx(
            src.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            destsize,
            1,
        )
    };
    if destsize >= 0 {
        unsafe {
            #[allow(clippy::cast_sign_loss)]
            dest.set_len(destsize as usize);
        }
        Ok(dest)
    } else {
        Err(BloscError::from(format!(
            "blosc_decompress_ctx failure ({destsize})"
        )))
    }
}

/// A `blosc` codec implementation.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    cname: BloscCompressor,
    clevel: BloscCompressionLevel,
    shuffle: BloscShuffleMode,
    typesize: Option<usize>,
    blocksize: usize,
}

/// A `blosc` codec creation error.
#[derive(Clone, Debug, Error)]
pub enum BloscCodecCreateError {
    /// The typesize is required with shuffling and must be 1, 2, 4, or 8.
    #[error("blosc typesize {_0:?} is invalid, must be 1, 2, 4, or 8 when shuffling")]
    InvalidTypesize(Option<usize>),
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// `typesize` is required unless `shuffle` is [`BloscShuffleMode::NoShuffle`].
    ///
    /// # Errors
    /// Returns [`BloscCodecCreateError`] if the configuration is invalid.
    pub fn new(
        cname: BloscCompressor,
        clevel: BloscCompressionLevel,
        shuffle: BloscShuffleMode,
        typesize: Option<usize>,
        blocksize: usize,
    ) -> Result<Self, BloscCodecCreateError> {
        if shuffle != BloscShuffleMode::NoShuffle
            && !matches!(typesize, Some(1 | 2 | 4 | 8))
        {
            return Err(BloscCodecCreateError::InvalidTypesize(typesize));
        }
        Ok(Self {
            cname,
            clevel,
            shuffle,
            typesize,
            blocksize,
        })
    }

    /// Create a new `blosc` codec from configuration.
    ///
    /// # Errors
    /// Returns [`BloscCodecCreateError`] if the configuration is invalid.
    pub fn new_with_configuration(
        configuration: &BloscCodecConfiguration,
    ) -> Result<Self, BloscCodecCreateError> {
        Self::new(
            configuration.cname,
            configuration.clevel,
            configuration.shuffle,
            configuration.typesize,
            configuration.blocksize,
        )
    }

    /// The shuffle mode used by default for a data type of `typesize` bytes.
    ///
    /// Single-byte types are not shuffled, 8-byte types are bit-shuffled, and
    /// everything in between is byte-shuffled.
    #[must_use]
    pub const fn default_shuffle_mode(typesize: usize) -> BloscShuffleMode {
        match typesize {
            1 => BloscShuffleMode::NoShuffle,
            8 => BloscShuffleMode::BitShuffle,
            _ => BloscShuffleMode::Shuffle,
        }
    }
}

impl CodecTraits for BloscCodec {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = BloscCodecConfiguration {
            cname: self.cname,
            clevel: self.clevel,
            shuffle: self.shuffle,
            typesize: self.typesize,
            blocksize: self.blocksize,
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for BloscCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        blosc_compress_bytes(
            &decoded_value,
            self.clevel,
            self.shuffle,
            self.typesize.unwrap_or(1),
            self.cname,
            self.blocksize,
        )
        .map_err(|err| CodecError::Other(err.to_string()))
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let destsize = blosc_validate(&encoded_value)
            .and_then(|_| blosc_nbytes(&encoded_value))
            .ok_or_else(|| CodecError::from("blosc decode error: invalid buffer"))?;
        blosc_decompress_bytes(&encoded_value, destsize)
            .map_err(|err| CodecError::Other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{
        "cname": "zstd",
        "clevel": 1,
        "shuffle": "shuffle",
        "typesize": 2,
        "blocksize": 0
    }"#;

    #[test]
    fn codec_blosc_configuration_valid() {
        let configuration: BloscCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        assert_eq!(configuration.cname, BloscCompressor::Zstd);
        assert_eq!(configuration.shuffle, BloscShuffleMode::Shuffle);
        assert_eq!(configuration.typesize, Some(2));
    }

    #[test]
    fn codec_blosc_configuration_invalid() {
        assert!(serde_json::from_str::<BloscCodecConfiguration>(
            r#"{"cname": "snappy", "clevel": 1, "shuffle": "shuffle", "typesize": 2}"#
        )
        .is_err());
        assert!(serde_json::from_str::<BloscCodecConfiguration>(
            r#"{"cname": "zstd", "clevel": 10, "shuffle": "shuffle", "typesize": 2}"#
        )
        .is_err());
    }

    #[test]
    fn codec_blosc_invalid_typesize() {
        assert!(BloscCodec::new(
            BloscCompressor::Zstd,
            1u8.try_into().unwrap(),
            BloscShuffleMode::Shuffle,
            None,
            0
        )
        .is_err());
    }

    #[test]
    fn codec_blosc_default_shuffle_mode() {
        assert_eq!(
            BloscCodec::default_shuffle_mode(1),
            BloscShuffleMode::NoShuffle
        );
        assert_eq!(BloscCodec::default_shuffle_mode(2), BloscShuffleMode::Shuffle);
        assert_eq!(BloscCodec::default_shuffle_mode(4), BloscShuffleMode::Shuffle);
        assert_eq!(
            BloscCodec::default_shuffle_mode(8),
            BloscShuffleMode::BitShuffle
        );
    }

    #[test]
    fn codec_blosc_round_trip() {
        let elements: Vec<u16> = (0..256).collect();
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_ne_bytes()).collect();
        let configuration: BloscCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = BloscCodec::new_with_configuration(&configuration).unwrap();
        let encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }
}
