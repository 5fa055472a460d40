//! The array metadata builder.

use thiserror::Error;

use crate::metadata::{ArrayMetadataV3, MetadataConfiguration, MetadataV3};

use super::{
    codec::{CodecChain, CodecChainCreateError},
    ArrayShape, ChunkKeyEncoding, ChunkKeySeparator, DataType, FillValue, RegularChunkGrid,
};

/// The default maximum chunk edge length.
///
/// Setting the array shape resets the chunk shape to
/// `min(shape[d], DEFAULT_CHUNK_LENGTH)` along each dimension.
pub const DEFAULT_CHUNK_LENGTH: u64 = 100;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum CodecKind {
    ArrayToArray,
    ArrayToBytes,
    BytesToBytes,
}

fn codec_kind(name: &str) -> Option<CodecKind> {
    match name {
        "transpose" => Some(CodecKind::ArrayToArray),
        "bytes" => Some(CodecKind::ArrayToBytes),
        "blosc" | "gzip" | "zstd" | "crc32c" => Some(CodecKind::BytesToBytes),
        _ => None,
    }
}

/// An array metadata builder error.
#[derive(Debug, Error)]
pub enum ArrayMetadataBuilderError {
    /// The edit would leave an invalid codec chain.
    #[error(transparent)]
    InvalidChain(#[from] CodecChainCreateError),
    /// The named codec is not in the chain.
    #[error("codec {_0} is not in the codec chain")]
    CodecNotFound(String),
    /// The named codec is unknown.
    #[error("codec {_0} is not supported")]
    UnknownCodec(String),
    /// The chunk shape is incompatible with the array shape.
    #[error(transparent)]
    ChunkGrid(#[from] super::ChunkGridCreateError),
    /// The fill value size does not match the data type.
    #[error("fill value of {_0} bytes does not match data type {_1}")]
    InvalidFillValue(usize, DataType),
    /// A data type, shape, or chunk shape has not been set.
    #[error("the builder requires a data type, shape, and chunk shape")]
    Incomplete,
}

/// A builder for Zarr array metadata.
///
/// The builder maintains a valid-by-construction codec chain. Setting the
/// shape resets the chunk shape and refreshes the transpose codec order;
/// setting the data type resets the fill value to the data type default and
/// is reflected in the realized `bytes` and `blosc` codec configurations.
///
/// The default codec chain is `transpose` (reversed order, rank ≥ 2 unless
/// the builder is marked portable), `bytes` (little endian), and `blosc`
/// (zstd, level 1, data-type-derived shuffle and typesize).
#[derive(Clone, Debug)]
pub struct ArrayMetadataBuilder {
    data_type: Option<DataType>,
    shape: Option<ArrayShape>,
    chunk_shape: Option<ArrayShape>,
    fill_value: Option<FillValue>,
    portable: bool,
    chunk_key_encoding: Option<ChunkKeyEncoding>,
    attributes: serde_json::Map<String, serde_json::Value>,
    codecs: Vec<MetadataV3>,
}

impl Default for ArrayMetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayMetadataBuilder {
    /// Create a new array metadata builder.
    #[must_use]
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut codecs = vec![MetadataV3::new("bytes")];
        #[cfg(feature = "blosc")]
        codecs.push(MetadataV3::new("blosc"));
        Self {
            data_type: None,
            shape: None,
            chunk_shape: None,
            fill_value: None,
            portable: false,
            chunk_key_encoding: None,
            attributes: serde_json::Map::new(),
            codecs,
        }
    }

    /// Set the data type.
    ///
    /// Resets the fill value to the data type default.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = Some(data_type);
        self.fill_value = Some(data_type.default_fill_value());
        self
    }

    /// Set the array shape.
    ///
    /// Resets the chunk shape to `min(shape[d], 100)` along each dimension
    /// and refreshes the transpose codec for the new dimensionality.
    pub fn shape(&mut self, shape: ArrayShape) -> &mut Self {
        self.chunk_shape = Some(
            shape
                .iter()
                .map(|&dim| dim.min(DEFAULT_CHUNK_LENGTH))
                .collect(),
        );
        self.shape = Some(shape);
        self.refresh_transpose();
        self
    }

    /// Set the chunk shape.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the chunk shape is
    /// incompatible with the array shape.
    pub fn chunk_shape(
        &mut self,
        chunk_shape: ArrayShape,
    ) -> Result<&mut Self, ArrayMetadataBuilderError> {
        if let Some(shape) = &self.shape {
            RegularChunkGrid::new(shape.clone(), chunk_shape.clone())?;
        }
        self.chunk_shape = Some(chunk_shape);
        Ok(self)
    }

    /// Set the fill value.
    pub fn fill_value(&mut self, fill_value: FillValue) -> &mut Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Mark the array as portable.
    ///
    /// A portable array has no transpose codec: chunks are stored in
    /// canonical row-major order. A non-portable array of rank ≥ 2 carries a
    /// transpose codec with a reversed dimension order.
    pub fn portable(&mut self, portable: bool) -> &mut Self {
        self.portable = portable;
        self.refresh_transpose();
        self
    }

    /// Set the chunk key encoding.
    pub fn chunk_key_encoding(&mut self, chunk_key_encoding: ChunkKeyEncoding) -> &mut Self {
        self.chunk_key_encoding = Some(chunk_key_encoding);
        self
    }

    /// Set the user attributes.
    pub fn attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.attributes = attributes;
        self
    }

    fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Vec::len)
    }

    fn refresh_transpose(&mut self) {
        self.codecs.retain(|codec| codec.name() != "transpose");
        if self.portable {
            return;
        }
        if let Some(rank) = self.rank() {
            if rank >= 2 {
                let order: Vec<usize> = (0..rank).rev().collect();
                let mut configuration = MetadataConfiguration::new();
                configuration.insert("order".to_string(), order.into());
                self.codecs
                    .insert(0, MetadataV3::new_with_configuration("transpose", configuration));
            }
        }
    }

    /// Realize a codec entry, filling in data-type-derived defaults.
    fn realize_codec(&self, metadata: &MetadataV3) -> MetadataV3 {
        let element_size = self.data_type.map_or(1, |data_type| data_type.size());
        match metadata.name() {
            "bytes" if metadata.configuration().map_or(true, MetadataConfiguration::is_empty) => {
                if element_size == 1 {
                    MetadataV3::new("bytes")
                } else {
                    let mut configuration = MetadataConfiguration::new();
                    configuration.insert("endian".to_string(), "little".into());
                    MetadataV3::new_with_configuration("bytes", configuration)
                }
            }
            "blosc" => {
                let existing = metadata.configuration().cloned().unwrap_or_default();
                let typesize = existing
                    .get("typesize")
                    .and_then(serde_json::Value::as_u64)
                    .map_or(element_size, |typesize| {
                        usize::try_from(typesize).unwrap_or(element_size)
                    });
                let default_shuffle = match typesize {
                    1 => "noshuffle",
                    8 => "bitshuffle",
                    _ => "shuffle",
                };
                let mut configuration = MetadataConfiguration::new();
                let field = |existing: &MetadataConfiguration,
                             key: &str,
                             default: serde_json::Value| {
                    existing.get(key).cloned().unwrap_or(default)
                };
                configuration.insert("cname".to_string(), field(&existing, "cname", "zstd".into()));
                configuration.insert("clevel".to_string(), field(&existing, "clevel", 1.into()));
                configuration.insert(
                    "shuffle".to_string(),
                    field(&existing, "shuffle", default_shuffle.into()),
                );
                configuration.insert("typesize".to_string(), typesize.into());
                configuration.insert(
                    "blocksize".to_string(),
                    field(&existing, "blocksize", 0.into()),
                );
                MetadataV3::new_with_configuration("blosc", configuration)
            }
            _ => metadata.clone(),
        }
    }

    /// Return the realized codec chain metadata.
    #[must_use]
    pub fn codecs(&self) -> Vec<MetadataV3> {
        self.codecs
            .iter()
            .map(|codec| self.realize_codec(codec))
            .collect()
    }

    fn default_position(&self, kind: CodecKind) -> usize {
        match kind {
            CodecKind::ArrayToArray | CodecKind::ArrayToBytes => self
                .codecs
                .iter()
                .position(|codec| {
                    codec_kind(codec.name()) != Some(CodecKind::ArrayToArray)
                })
                .unwrap_or(self.codecs.len()),
            CodecKind::BytesToBytes => self.codecs.len(),
        }
    }

    fn commit_candidate(
        &mut self,
        candidate: Vec<MetadataV3>,
    ) -> Result<(), ArrayMetadataBuilderError> {
        let realized: Vec<MetadataV3> = candidate
            .iter()
            .map(|codec| self.realize_codec(codec))
            .collect();
        CodecChain::from_metadata(&realized)?;
        self.codecs = candidate;
        Ok(())
    }

    /// Insert a codec into the chain.
    ///
    /// Without an explicit `position`, an `array→array` codec is inserted
    /// before the `array→bytes` codec and a `bytes→bytes` codec is appended.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the codec is unknown, its
    /// configuration is invalid, or the insertion would break the chaining
    /// invariant.
    pub fn add_codec(
        &mut self,
        name: &str,
        configuration: MetadataConfiguration,
        position: Option<usize>,
    ) -> Result<&mut Self, ArrayMetadataBuilderError> {
        let kind = codec_kind(name)
            .ok_or_else(|| ArrayMetadataBuilderError::UnknownCodec(name.to_string()))?;
        let metadata = if configuration.is_empty() {
            MetadataV3::new(name)
        } else {
            MetadataV3::new_with_configuration(name, configuration)
        };
        let position = position
            .unwrap_or_else(|| self.default_position(kind))
            .min(self.codecs.len());
        let mut candidate = self.codecs.clone();
        candidate.insert(position, metadata);
        self.commit_candidate(candidate)?;
        Ok(self)
    }

    /// Remove the first codec named `name` from the chain.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the codec is not in the
    /// chain or its removal would break the chaining invariant.
    pub fn remove_codec(&mut self, name: &str) -> Result<&mut Self, ArrayMetadataBuilderError> {
        let position = self
            .codecs
            .iter()
            .position(|codec| codec.name() == name)
            .ok_or_else(|| ArrayMetadataBuilderError::CodecNotFound(name.to_string()))?;
        let mut candidate = self.codecs.clone();
        candidate.remove(position);
        self.commit_candidate(candidate)?;
        Ok(self)
    }

    /// Return true if the builder describes a complete, valid array.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.data_type.is_some()
            && self.shape.is_some()
            && self.chunk_shape.is_some()
            && CodecChain::from_metadata(&self.codecs()).is_ok()
    }

    /// Emit the array metadata document with the default `/` separator.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the builder is incomplete
    /// or invalid.
    pub fn metadata(&self) -> Result<ArrayMetadataV3, ArrayMetadataBuilderError> {
        self.metadata_with_separator(ChunkKeySeparator::Slash)
    }

    /// Emit the array metadata document, defaulting the chunk key separator
    /// to `separator` when no chunk key encoding was set explicitly.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the builder is incomplete
    /// or invalid.
    pub fn metadata_with_separator(
        &self,
        separator: ChunkKeySeparator,
    ) -> Result<ArrayMetadataV3, ArrayMetadataBuilderError> {
        let data_type = self.data_type.ok_or(ArrayMetadataBuilderError::Incomplete)?;
        let shape = self
            .shape
            .clone()
            .ok_or(ArrayMetadataBuilderError::Incomplete)?;
        let chunk_shape = self
            .chunk_shape
            .clone()
            .ok_or(ArrayMetadataBuilderError::Incomplete)?;
        let fill_value = self
            .fill_value
            .clone()
            .unwrap_or_else(|| data_type.default_fill_value());
        if fill_value.size() != data_type.size() {
            return Err(ArrayMetadataBuilderError::InvalidFillValue(
                fill_value.size(),
                data_type,
            ));
        }
        let chunk_grid = RegularChunkGrid::new(shape.clone(), chunk_shape)?;
        let codecs = self.codecs();
        CodecChain::from_metadata(&codecs)?;
        let chunk_key_encoding = self
            .chunk_key_encoding
            .unwrap_or(ChunkKeyEncoding::Default { separator });
        let mut metadata = ArrayMetadataV3::new(
            shape,
            data_type.metadata(),
            chunk_grid.metadata(),
            chunk_key_encoding.create_metadata(),
            data_type.fill_value_metadata(&fill_value),
            codecs,
        );
        metadata.attributes = self.attributes.clone();
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::FillValueMetadata;

    use super::*;

    #[cfg(all(feature = "transpose", feature = "blosc", feature = "gzip"))]
    #[test]
    fn builder_default_chain_and_edits() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.data_type(DataType::Int16).shape(vec![240, 310, 5]);

        // the shape transition resets the chunk shape
        let metadata = builder.metadata().unwrap();
        assert_eq!(
            metadata.chunk_grid.configuration().unwrap()["chunk_shape"],
            serde_json::json!([100, 100, 5])
        );

        let codecs = builder.codecs();
        assert_eq!(codecs.len(), 3);
        assert_eq!(codecs[0].name(), "transpose");
        assert_eq!(
            codecs[0].configuration().unwrap()["order"],
            serde_json::json!([2, 1, 0])
        );
        assert_eq!(codecs[1].name(), "bytes");
        assert_eq!(codecs[1].configuration().unwrap()["endian"], "little");
        assert_eq!(codecs[2].name(), "blosc");
        let blosc = codecs[2].configuration().unwrap();
        assert_eq!(blosc["cname"], "zstd");
        assert_eq!(blosc["clevel"], 1);
        assert_eq!(blosc["shuffle"], "shuffle");
        assert_eq!(blosc["typesize"], 2);
        assert_eq!(blosc["blocksize"], 0);
        assert!(builder.is_valid());

        builder.chunk_shape(vec![120, 31, 5]).unwrap();
        builder.remove_codec("blosc").unwrap();
        let mut gzip = MetadataConfiguration::new();
        gzip.insert("level".to_string(), 5.into());
        builder.add_codec("gzip", gzip, None).unwrap();

        let codecs = builder.codecs();
        assert_eq!(codecs.len(), 3);
        assert_eq!(codecs[0].name(), "transpose");
        assert_eq!(codecs[1].name(), "bytes");
        assert_eq!(codecs[2].name(), "gzip");
        assert!(builder.is_valid());

        let metadata = builder.metadata().unwrap();
        assert_eq!(
            metadata.chunk_grid.configuration().unwrap()["chunk_shape"],
            serde_json::json!([120, 31, 5])
        );
        assert_eq!(metadata.fill_value, FillValueMetadata::Int(-32767));
    }

    #[cfg(feature = "transpose")]
    #[test]
    fn builder_portable_removes_transpose() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.data_type(DataType::Float64).shape(vec![10, 10]);
        assert_eq!(builder.codecs()[0].name(), "transpose");
        builder.portable(true);
        assert_ne!(builder.codecs()[0].name(), "transpose");
        builder.portable(false);
        assert_eq!(builder.codecs()[0].name(), "transpose");
        // rank one arrays have nothing to transpose
        builder.shape(vec![10]);
        assert_ne!(builder.codecs()[0].name(), "transpose");
    }

    #[test]
    fn builder_single_byte_data_type_omits_endian() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.data_type(DataType::UInt8).shape(vec![10]);
        let codecs = builder.codecs();
        let bytes = codecs.iter().find(|codec| codec.name() == "bytes").unwrap();
        assert!(bytes.configuration().is_none());
    }

    #[test]
    fn builder_invalid_edits() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.data_type(DataType::Int32).shape(vec![100]);
        // removing the bytes codec breaks the chain
        assert!(matches!(
            builder.remove_codec("bytes"),
            Err(ArrayMetadataBuilderError::InvalidChain(_))
        ));
        assert!(matches!(
            builder.remove_codec("lzma"),
            Err(ArrayMetadataBuilderError::CodecNotFound(_))
        ));
        assert!(matches!(
            builder.add_codec("lzma", MetadataConfiguration::new(), None),
            Err(ArrayMetadataBuilderError::UnknownCodec(_))
        ));
        // a second array to bytes codec is refused
        assert!(matches!(
            builder.add_codec("bytes", MetadataConfiguration::new(), None),
            Err(ArrayMetadataBuilderError::InvalidChain(_))
        ));
        // chunk shape rank must match the array shape
        assert!(builder.chunk_shape(vec![10, 10]).is_err());
        assert!(builder.is_valid());
    }

    #[test]
    fn builder_incomplete() {
        let builder = ArrayMetadataBuilder::new();
        assert!(!builder.is_valid());
        assert!(matches!(
            builder.metadata(),
            Err(ArrayMetadataBuilderError::Incomplete)
        ));
    }
}
