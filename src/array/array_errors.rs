use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    node::NodePath,
    storage::StorageError,
};

use super::{
    codec::{CodecChainCreateError, CodecError},
    ArrayIndices, ArrayShape, ChunkGridCreateError, ChunkKeyEncodingCreateError, DataType,
    InvalidFillValueMetadataError, UnsupportedDataTypeError,
};

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// No array metadata document exists at the node.
    #[error("array metadata is missing at {_0}")]
    MissingMetadata(NodePath),
    /// The node is a group, not an array.
    #[error("the node at {_0} is a group, not an array")]
    NodeIsAGroup(NodePath),
    /// The data type is not supported.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// The fill value is incompatible with the data type.
    #[error(transparent)]
    InvalidFillValue(#[from] InvalidFillValueMetadataError),
    /// The chunk grid is invalid.
    #[error(transparent)]
    ChunkGrid(#[from] ChunkGridCreateError),
    /// The chunk key encoding is invalid.
    #[error(transparent)]
    ChunkKeyEncoding(#[from] ChunkKeyEncodingCreateError),
    /// The codec chain is invalid.
    #[error(transparent)]
    CodecChain(#[from] CodecChainCreateError),
    /// The metadata is otherwise invalid.
    #[error("array metadata is invalid: {_0}")]
    InvalidMetadata(String),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An array operation error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The subset lies outside the array shape.
    #[error("array subset {_0} is out of bounds of array shape {_1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// The supplied bytes do not match the subset.
    #[error("invalid data of {_0} bytes for subset {_1} with element size {_2}")]
    InvalidBytesLength(usize, ArraySubset, usize),
    /// The supplied element count does not match the subset.
    #[error("invalid data of {_0} elements for a subset of {_1} elements")]
    InvalidElementsLength(usize, u64),
    /// The host element type does not match the array data type.
    #[error("incompatible element type {_0}, the array data type is {_1}")]
    IncompatibleElementType(DataType, DataType),
    /// A dimensionality mismatch.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The chunk indices lie outside the chunk grid.
    #[error("chunk indices {_0:?} are out of bounds of chunk grid shape {_1:?}")]
    InvalidChunkIndices(ArrayIndices, ArrayShape),
}
