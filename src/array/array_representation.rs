use thiserror::Error;

use super::{ArrayShape, DataType, FillValue};

/// The decoded representation of a chunk: shape, data type, and fill value.
///
/// Codecs use this to validate and size their inputs and outputs.
#[derive(Clone, Debug)]
pub struct ChunkRepresentation {
    shape: ArrayShape,
    data_type: DataType,
    fill_value: FillValue,
}

/// An invalid chunk representation error.
#[derive(Clone, Debug, Error)]
#[error("invalid chunk representation: shape {_0:?}, data type {_1}, fill value of {_2} bytes")]
pub struct InvalidChunkRepresentationError(ArrayShape, DataType, usize);

impl ChunkRepresentation {
    /// Create a new chunk representation.
    ///
    /// # Errors
    /// Returns [`InvalidChunkRepresentationError`] if any dimension is zero or
    /// the fill value size does not match the data type size.
    pub fn new(
        shape: ArrayShape,
        data_type: DataType,
        fill_value: FillValue,
    ) -> Result<Self, InvalidChunkRepresentationError> {
        if shape.iter().all(|&dim| dim > 0) && fill_value.size() == data_type.size() {
            Ok(Self {
                shape,
                data_type,
                fill_value,
            })
        } else {
            Err(InvalidChunkRepresentationError(
                shape,
                data_type,
                fill_value.size(),
            ))
        }
    }

    /// Return the shape of the chunk.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the data type of the chunk.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the fill value of the chunk.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the dimensionality of the chunk.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements of the chunk.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the size of each element in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.data_type.size()
    }

    /// Return the decoded size of the chunk in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.num_elements() * self.element_size() as u64
    }

    /// Return a decoded buffer of the chunk shape filled with the fill value.
    ///
    /// # Panics
    /// Panics if the chunk size exceeds [`usize::MAX`].
    #[must_use]
    pub fn fill_value_buffer(&self) -> Vec<u8> {
        let num_elements = usize::try_from(self.num_elements()).unwrap();
        self.fill_value
            .as_ne_bytes()
            .repeat(num_elements)
    }

    /// Create a representation with the same data type and fill value but a
    /// permuted `shape`.
    pub(crate) fn with_shape(&self, shape: ArrayShape) -> Self {
        debug_assert_eq!(
            shape.iter().product::<u64>(),
            self.num_elements()
        );
        Self {
            shape,
            data_type: self.data_type,
            fill_value: self.fill_value.clone(),
        }
    }
}
