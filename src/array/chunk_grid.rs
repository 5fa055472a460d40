//! The regular chunk grid.
//!
//! Maps array coordinates to chunk indices and intra-chunk offsets. Every
//! chunk has the same shape; chunks at the end of the array may extend past
//! the array bounds, with the overhang logically holding the fill value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, ChunksIterator, IncompatibleDimensionalityError},
    metadata::MetadataV3,
};

use super::{ArrayIndices, ArrayShape};

/// The identifier of the `regular` chunk grid.
pub const IDENTIFIER: &str = "regular";

/// `regular` chunk grid configuration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegularChunkGridConfiguration {
    /// The chunk shape.
    pub chunk_shape: ArrayShape,
}

/// A chunk grid creation error.
#[derive(Clone, Debug, Error)]
pub enum ChunkGridCreateError {
    /// The chunk grid is not supported.
    #[error("chunk grid {_0} is not supported")]
    Unsupported(String),
    /// The chunk grid configuration is invalid.
    #[error("invalid chunk grid configuration {_0}")]
    InvalidConfiguration(String),
    /// The chunk shape rank does not match the array shape rank.
    #[error("chunk shape {_0:?} does not match the dimensionality of array shape {_1:?}")]
    RankMismatch(ArrayShape, ArrayShape),
    /// A shape extent is zero.
    #[error("array shape {_0:?} and chunk shape {_1:?} extents must all be positive")]
    ZeroExtent(ArrayShape, ArrayShape),
}

/// A regular chunk grid.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RegularChunkGrid {
    array_shape: ArrayShape,
    chunk_shape: ArrayShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid.
    ///
    /// # Errors
    /// Returns [`ChunkGridCreateError`] if the shapes have mismatched ranks or
    /// any extent is zero.
    pub fn new(
        array_shape: ArrayShape,
        chunk_shape: ArrayShape,
    ) -> Result<Self, ChunkGridCreateError> {
        if array_shape.len() != chunk_shape.len() {
            return Err(ChunkGridCreateError::RankMismatch(chunk_shape, array_shape));
        }
        if array_shape.iter().any(|&dim| dim == 0) || chunk_shape.iter().any(|&dim| dim == 0) {
            return Err(ChunkGridCreateError::ZeroExtent(array_shape, chunk_shape));
        }
        Ok(Self {
            array_shape,
            chunk_shape,
        })
    }

    /// Create a regular chunk grid from metadata.
    ///
    /// # Errors
    /// Returns [`ChunkGridCreateError`] if the metadata does not describe a
    /// valid regular chunk grid for `array_shape`.
    pub fn from_metadata(
        metadata: &MetadataV3,
        array_shape: ArrayShape,
    ) -> Result<Self, ChunkGridCreateError> {
        if metadata.name() != IDENTIFIER {
            return Err(ChunkGridCreateError::Unsupported(metadata.name().to_string()));
        }
        let configuration: RegularChunkGridConfiguration = metadata
            .to_configuration("chunk grid")
            .map_err(|err| ChunkGridCreateError::InvalidConfiguration(err.to_string()))?;
        Self::new(array_shape, configuration.chunk_shape)
    }

    /// Create the metadata of the chunk grid.
    #[must_use]
    pub fn metadata(&self) -> MetadataV3 {
        let mut configuration = serde_json::Map::new();
        configuration.insert("chunk_shape".to_string(), self.chunk_shape.clone().into());
        MetadataV3::new_with_configuration(IDENTIFIER, configuration)
    }

    /// Return the array shape.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// Return the dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.array_shape.len()
    }

    /// Return the shape of the chunk grid: the number of chunks per dimension.
    #[must_use]
    pub fn grid_shape(&self) -> ArrayShape {
        std::iter::zip(&self.array_shape, &self.chunk_shape)
            .map(|(array, chunk)| array.div_ceil(*chunk))
            .collect()
    }

    /// Return the number of chunks in the grid.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.grid_shape().iter().product()
    }

    /// Return true if `chunk_indices` lie within the grid.
    #[must_use]
    pub fn chunk_indices_inbounds(&self, chunk_indices: &[u64]) -> bool {
        chunk_indices.len() == self.dimensionality()
            && std::iter::zip(chunk_indices, self.grid_shape())
                .all(|(index, extent)| *index < extent)
    }

    /// Return the origin of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of
    /// `chunk_indices` does not match the grid dimensionality.
    pub fn chunk_origin(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ArrayIndices, IncompatibleDimensionalityError> {
        if chunk_indices.len() == self.dimensionality() {
            Ok(std::iter::zip(chunk_indices, &self.chunk_shape)
                .map(|(index, extent)| index * extent)
                .collect())
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_indices.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Return the subset of the array covered by the chunk at `chunk_indices`.
    ///
    /// The subset is a full chunk and may extend beyond the array shape.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of
    /// `chunk_indices` does not match the grid dimensionality.
    pub fn chunk_subset(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        let origin = self.chunk_origin(chunk_indices)?;
        ArraySubset::new_with_start_shape(origin, self.chunk_shape.clone())
    }

    /// Returns an iterator over the chunks overlapping `array_subset`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the subset
    /// dimensionality does not match the grid dimensionality.
    pub fn chunks_in_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ChunksIterator, IncompatibleDimensionalityError> {
        array_subset.chunks(&self.chunk_shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_grid_shape() {
        let grid = RegularChunkGrid::new(vec![5, 20, 4], vec![2, 7, 4]).unwrap();
        assert_eq!(grid.grid_shape(), vec![3, 3, 1]);
        assert_eq!(grid.num_chunks(), 9);
        assert!(grid.chunk_indices_inbounds(&[2, 2, 0]));
        assert!(!grid.chunk_indices_inbounds(&[3, 0, 0]));
        assert!(!grid.chunk_indices_inbounds(&[0, 0]));
        assert_eq!(grid.chunk_origin(&[1, 2, 0]).unwrap(), vec![2, 14, 0]);
        assert_eq!(
            grid.chunk_subset(&[2, 2, 0]).unwrap(),
            ArraySubset::new_with_ranges(&[4..6, 14..21, 0..4])
        );
    }

    #[test]
    fn chunk_grid_invalid() {
        assert!(matches!(
            RegularChunkGrid::new(vec![5, 5], vec![5]),
            Err(ChunkGridCreateError::RankMismatch(_, _))
        ));
        assert!(matches!(
            RegularChunkGrid::new(vec![5, 0], vec![5, 1]),
            Err(ChunkGridCreateError::ZeroExtent(_, _))
        ));
        assert!(matches!(
            RegularChunkGrid::new(vec![5, 5], vec![5, 0]),
            Err(ChunkGridCreateError::ZeroExtent(_, _))
        ));
    }

    #[test]
    fn chunk_grid_metadata_round_trip() {
        let metadata: MetadataV3 = serde_json::from_str(
            r#"{"name": "regular", "configuration": {"chunk_shape": [2, 7, 4]}}"#,
        )
        .unwrap();
        let grid = RegularChunkGrid::from_metadata(&metadata, vec![5, 20, 4]).unwrap();
        assert_eq!(grid.chunk_shape(), &[2, 7, 4]);
        assert_eq!(grid.metadata(), metadata);

        assert!(RegularChunkGrid::from_metadata(&MetadataV3::new("rectangular"), vec![5]).is_err());
    }
}
