//! Zarr arrays.
//!
//! An [`Array`] is a hierarchy node holding dense n-dimensional data,
//! partitioned into fixed-shape chunks by a [`RegularChunkGrid`]. Each chunk
//! is encoded independently through the array's [`CodecChain`](codec::CodecChain)
//! and stored under a key formed by the array's [`ChunkKeyEncoding`].
//!
//! Hyperslab reads and writes are translated into per-chunk operations on
//! lazily created [`ChunkIo`] read-modify-write buffers. A chunk whose
//! content is entirely the fill value is erased from the store on flush, so
//! sparse arrays stay sparse on disk.

mod array_builder;
mod array_errors;
mod array_representation;
mod chunk_grid;
mod chunk_io;
mod chunk_key_encoding;
pub mod codec;
mod data_type;
mod endianness;
mod fill_value;

pub use array_builder::{ArrayMetadataBuilder, ArrayMetadataBuilderError, DEFAULT_CHUNK_LENGTH};
pub use array_errors::{ArrayCreateError, ArrayError};
pub use array_representation::{ChunkRepresentation, InvalidChunkRepresentationError};
pub use chunk_grid::{ChunkGridCreateError, RegularChunkGrid, RegularChunkGridConfiguration};
pub use chunk_io::ChunkIo;
pub use chunk_key_encoding::{
    ChunkKeyEncoding, ChunkKeyEncodingCreateError, ChunkKeySeparator,
    DefaultChunkKeyEncodingConfiguration, V2ChunkKeyEncodingConfiguration,
};
pub use data_type::{DataType, InvalidFillValueMetadataError, UnsupportedDataTypeError};
pub use endianness::{Endianness, NATIVE_ENDIAN};
pub use fill_value::FillValue;

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    array_subset::ArraySubset,
    metadata::{ArrayMetadataV3, NodeMetadata},
    node::NodePath,
    storage::{data_key, node_metadata, set_node_metadata, Storage, StoreKey},
};

use codec::CodecChain;

/// The shape of an array: the extent of each dimension.
pub type ArrayShape = Vec<u64>;

/// Indices into an array or chunk grid: one index per dimension.
pub type ArrayIndices = Vec<u64>;

/// An element type storable in an array.
///
/// Ties a host scalar type to its Zarr data type and converts between
/// element slices and native-endian chunk bytes.
pub trait Element: Copy + Send + Sync {
    /// The data type corresponding to this element type.
    const DATA_TYPE: DataType;

    /// Convert a slice of elements into native-endian bytes.
    fn into_bytes(elements: &[Self]) -> Vec<u8>;

    /// Convert native-endian bytes into elements.
    ///
    /// # Panics
    /// Panics if the length of `bytes` is not a multiple of the element size.
    fn from_bytes(bytes: &[u8]) -> Vec<Self>;
}

macro_rules! impl_element_pod {
    ($(($type:ty, $data_type:expr)),*) => {
        $(
            impl Element for $type {
                const DATA_TYPE: DataType = $data_type;

                fn into_bytes(elements: &[Self]) -> Vec<u8> {
                    bytemuck::cast_slice(elements).to_vec()
                }

                fn from_bytes(bytes: &[u8]) -> Vec<Self> {
                    assert_eq!(bytes.len() % core::mem::size_of::<Self>(), 0);
                    bytes
                        .chunks_exact(core::mem::size_of::<Self>())
                        .map(|chunk| <$type>::from_ne_bytes(chunk.try_into().unwrap()))
                        .collect()
                }
            }
        )*
    };
}

impl_element_pod!(
    (i8, DataType::Int8),
    (i16, DataType::Int16),
    (i32, DataType::Int32),
    (i64, DataType::Int64),
    (u8, DataType::UInt8),
    (u16, DataType::UInt16),
    (u32, DataType::UInt32),
    (u64, DataType::UInt64),
    (f32, DataType::Float32),
    (f64, DataType::Float64)
);

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn into_bytes(elements: &[Self]) -> Vec<u8> {
        elements.iter().copied().map(u8::from).collect()
    }

    fn from_bytes(bytes: &[u8]) -> Vec<Self> {
        bytes.iter().map(|&byte| byte != 0).collect()
    }
}

/// A Zarr array.
#[derive(Debug)]
pub struct Array {
    storage: Storage,
    path: NodePath,
    shape: ArrayShape,
    data_type: DataType,
    fill_value: FillValue,
    chunk_grid: RegularChunkGrid,
    chunk_key_encoding: ChunkKeyEncoding,
    codecs: CodecChain,
    attributes: serde_json::Map<String, serde_json::Value>,
    dimension_names: Option<Vec<Option<String>>>,
    additional_fields: serde_json::Map<String, serde_json::Value>,
    attributes_dirty: bool,
    // live read-modify-write buffers, lazily created per touched chunk
    chunks: Mutex<HashMap<ArrayIndices, ChunkIo>>,
}

impl Array {
    /// Create an array from its metadata document.
    ///
    /// The metadata is not (re)written to the store.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if the metadata is invalid.
    pub fn new_with_metadata(
        storage: Storage,
        path: &NodePath,
        metadata: ArrayMetadataV3,
    ) -> Result<Self, ArrayCreateError> {
        if !metadata.validate_format() || !metadata.validate_node_type() {
            return Err(ArrayCreateError::InvalidMetadata(
                "unsupported zarr_format or node_type".to_string(),
            ));
        }
        let data_type = DataType::from_metadata(&metadata.data_type)?;
        let fill_value = data_type.fill_value_from_metadata(&metadata.fill_value)?;
        let chunk_grid = RegularChunkGrid::from_metadata(&metadata.chunk_grid, metadata.shape.clone())?;
        let chunk_key_encoding = ChunkKeyEncoding::from_metadata(&metadata.chunk_key_encoding)?;
        let codecs = CodecChain::from_metadata(&metadata.codecs)?;
        // a multi-byte data type needs a declared endianness in the bytes codec
        if data_type.size() > 1 {
            let endian_missing = metadata.codecs.iter().any(|codec| {
                codec.name() == codec::array_to_bytes::bytes::IDENTIFIER
                    && codec
                        .configuration()
                        .map_or(true, |configuration| !configuration.contains_key("endian"))
            });
            if endian_missing {
                return Err(ArrayCreateError::InvalidMetadata(format!(
                    "data type {data_type} requires the bytes codec to declare an endianness"
                )));
            }
        }
        Ok(Self {
            storage,
            path: path.clone(),
            shape: metadata.shape,
            data_type,
            fill_value,
            chunk_grid,
            chunk_key_encoding,
            codecs,
            attributes: metadata.attributes,
            dimension_names: metadata.dimension_names,
            additional_fields: metadata.additional_fields,
            attributes_dirty: false,
            chunks: Mutex::new(HashMap::new()),
        })
    }

    /// Open the array at `path` by reading its metadata from the store.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if the metadata is missing, is not
    /// array metadata, or is invalid.
    pub fn open(storage: Storage, path: &NodePath) -> Result<Self, ArrayCreateError> {
        match node_metadata(&*storage, path)? {
            Some(NodeMetadata::Array(metadata)) => Self::new_with_metadata(storage, path, metadata),
            Some(NodeMetadata::Group(_)) => Err(ArrayCreateError::NodeIsAGroup(path.clone())),
            None => Err(ArrayCreateError::MissingMetadata(path.clone())),
        }
    }

    /// Return the path of the array.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the shape of the array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the data type of the array.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the fill value of the array.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the chunk grid of the array.
    #[must_use]
    pub const fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// Return the chunk key encoding of the array.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// Return the codec chain of the array.
    #[must_use]
    pub const fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// Return the user attributes of the array.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Set the attribute `name` to `value`.
    ///
    /// The change is persisted on [`save`](Array::save).
    pub fn set_attribute(&mut self, name: &str, value: serde_json::Value) {
        self.attributes.insert(name.to_string(), value);
        self.attributes_dirty = true;
    }

    /// Delete the attribute `name`, returning true if it existed.
    pub fn delete_attribute(&mut self, name: &str) -> bool {
        let deleted = self.attributes.remove(name).is_some();
        self.attributes_dirty |= deleted;
        deleted
    }

    /// Delete all attributes.
    pub fn delete_attributes(&mut self) {
        if !self.attributes.is_empty() {
            self.attributes.clear();
            self.attributes_dirty = true;
        }
    }

    /// Create the metadata document of the array.
    #[must_use]
    pub fn metadata(&self) -> ArrayMetadataV3 {
        let mut metadata = ArrayMetadataV3::new(
            self.shape.clone(),
            self.data_type.metadata(),
            self.chunk_grid.metadata(),
            self.chunk_key_encoding.create_metadata(),
            self.data_type.fill_value_metadata(&self.fill_value),
            self.codecs.create_metadatas(),
        );
        metadata.attributes = self.attributes.clone();
        metadata.dimension_names = self.dimension_names.clone();
        metadata.additional_fields = self.additional_fields.clone();
        metadata
    }

    /// Flush all dirty chunks and persist the metadata document if attributes
    /// changed.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] on a storage or codec failure.
    pub fn save(&mut self) -> Result<(), ArrayError> {
        self.flush_all()?;
        if self.attributes_dirty {
            set_node_metadata(
                &*self.storage,
                &self.path,
                &NodeMetadata::Array(self.metadata()),
            )?;
            self.attributes_dirty = false;
        }
        Ok(())
    }

    /// Return the store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        data_key(&self.path, &self.chunk_key_encoding.encode(chunk_indices))
    }

    fn chunk_representation(&self) -> ChunkRepresentation {
        ChunkRepresentation::new(
            self.chunk_grid.chunk_shape().to_vec(),
            self.data_type,
            self.fill_value.clone(),
        )
        .expect("the chunk grid and fill value are validated at construction")
    }

    fn with_chunk<R>(
        &self,
        chunk_indices: &[u64],
        operation: impl FnOnce(&mut ChunkIo) -> Result<R, ArrayError>,
    ) -> Result<R, ArrayError> {
        let mut chunks = self.chunks.lock();
        let chunk = chunks.entry(chunk_indices.to_vec()).or_insert_with(|| {
            ChunkIo::new(
                self.storage.clone(),
                self.chunk_key(chunk_indices),
                self.chunk_representation(),
                // each chunk owns an independent codec chain copy
                self.codecs.clone(),
            )
        });
        operation(chunk)
    }

    fn validate_chunk_indices(&self, chunk_indices: &[u64]) -> Result<(), ArrayError> {
        if self.chunk_grid.chunk_indices_inbounds(chunk_indices) {
            Ok(())
        } else {
            Err(ArrayError::InvalidChunkIndices(
                chunk_indices.to_vec(),
                self.chunk_grid.grid_shape(),
            ))
        }
    }

    fn validate_subset(&self, array_subset: &ArraySubset) -> Result<(), ArrayError> {
        if array_subset.inbounds(&self.shape) {
            Ok(())
        } else {
            Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape.clone(),
            ))
        }
    }

    /// Retrieve the bytes of `array_subset`, in native-endian row-major order.
    ///
    /// Positions not covered by any stored chunk hold the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is out of bounds or a chunk
    /// fails to load.
    pub fn retrieve_array_subset(&self, array_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        self.validate_subset(array_subset)?;
        let element_size = self.data_type.size();
        let mut output = self
            .fill_value
            .as_ne_bytes()
            .repeat(array_subset.num_elements_usize());
        for (chunk_indices, chunk_subset) in
            self.chunk_grid.chunks_in_subset(array_subset)?
        {
            let overlap = array_subset.overlap(&chunk_subset)?;
            let chunk_bytes = self.with_chunk(&chunk_indices, |chunk| {
                chunk.read_subset(&overlap.relative_to(chunk_subset.start())?)
            })?;
            overlap.relative_to(array_subset.start())?.store_bytes(
                &chunk_bytes,
                &mut output,
                array_subset.shape(),
                element_size,
            );
        }
        Ok(output)
    }

    /// Retrieve the elements of `array_subset`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` does not match the array data type or
    /// the subset is invalid.
    pub fn retrieve_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        if T::DATA_TYPE != self.data_type {
            return Err(ArrayError::IncompatibleElementType(
                T::DATA_TYPE,
                self.data_type,
            ));
        }
        Ok(T::from_bytes(&self.retrieve_array_subset(array_subset)?))
    }

    /// Store `subset_bytes` into `array_subset`.
    ///
    /// Every chunk touched by the subset is flushed before this returns.
    /// Writing the fill value erases data; a chunk left holding nothing but
    /// the fill value is erased from the store.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is out of bounds, the byte
    /// length is incompatible, or a chunk fails to flush.
    pub fn store_array_subset(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.validate_subset(array_subset)?;
        let element_size = self.data_type.size();
        if subset_bytes.len() as u64 != array_subset.num_elements() * element_size as u64 {
            return Err(ArrayError::InvalidBytesLength(
                subset_bytes.len(),
                array_subset.clone(),
                element_size,
            ));
        }
        for (chunk_indices, chunk_subset) in
            self.chunk_grid.chunks_in_subset(array_subset)?
        {
            let overlap = array_subset.overlap(&chunk_subset)?;
            let chunk_bytes = overlap.relative_to(array_subset.start())?.extract_bytes(
                subset_bytes,
                array_subset.shape(),
                element_size,
            );
            self.with_chunk(&chunk_indices, |chunk| {
                chunk.write_subset(
                    &overlap.relative_to(chunk_subset.start())?,
                    &chunk_bytes,
                    true,
                )
            })?;
        }
        Ok(())
    }

    /// Store `elements` into `array_subset`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` does not match the array data type or
    /// the subset or element count is invalid.
    pub fn store_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
        elements: &[T],
    ) -> Result<(), ArrayError> {
        if T::DATA_TYPE != self.data_type {
            return Err(ArrayError::IncompatibleElementType(
                T::DATA_TYPE,
                self.data_type,
            ));
        }
        if elements.len() as u64 != array_subset.num_elements() {
            return Err(ArrayError::InvalidElementsLength(
                elements.len(),
                array_subset.num_elements(),
            ));
        }
        self.store_array_subset(array_subset, &T::into_bytes(elements))
    }

    /// Retrieve the decoded bytes of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are out of bounds or
    /// the chunk fails to load.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ArrayError> {
        self.validate_chunk_indices(chunk_indices)?;
        let chunk_subset = ArraySubset::new_with_shape(self.chunk_grid.chunk_shape().to_vec());
        self.with_chunk(chunk_indices, |chunk| chunk.read_subset(&chunk_subset))
    }

    /// Store the decoded bytes of the whole chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are out of bounds, the
    /// byte length is incompatible, or the chunk fails to flush.
    pub fn store_chunk(&self, chunk_indices: &[u64], chunk_bytes: &[u8]) -> Result<(), ArrayError> {
        self.validate_chunk_indices(chunk_indices)?;
        let chunk_subset = ArraySubset::new_with_shape(self.chunk_grid.chunk_shape().to_vec());
        self.with_chunk(chunk_indices, |chunk| {
            chunk.write_subset(&chunk_subset, chunk_bytes, true)
        })
    }

    /// Erase the chunk at `chunk_indices` from the store and discard its
    /// in-memory buffer.
    ///
    /// Returns true if a stored chunk was erased.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are out of bounds or
    /// the store fails.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<bool, ArrayError> {
        self.validate_chunk_indices(chunk_indices)?;
        self.chunks.lock().remove(chunk_indices);
        Ok(self.storage.erase(&self.chunk_key(chunk_indices))?)
    }

    /// Discard all in-memory chunk buffers without flushing.
    ///
    /// Used when the array is being deleted from its hierarchy.
    pub(crate) fn discard_chunks(&self) {
        self.chunks.lock().clear();
    }

    /// Flush every dirty chunk buffer to the store.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] on a storage or codec failure.
    pub fn flush_all(&self) -> Result<(), ArrayError> {
        let mut chunks = self.chunks.lock();
        for chunk in chunks.values_mut() {
            chunk.flush()?;
        }
        Ok(())
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        if let Err(err) = self.flush_all() {
            log::error!("failed to flush array {} on drop: {err}", self.path);
        }
    }
}
