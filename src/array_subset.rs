//! Array subsets.
//!
//! An [`ArraySubset`] is the rectangular region of an array addressed by a
//! hyperslab read or write. It is used throughout this library to map
//! selections onto chunks and to gather/scatter slabs between chunk buffers
//! and caller buffers.

mod iterators;

pub use iterators::{ChunksIterator, ContiguousLinearisedIndicesIterator, IndicesIterator};

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

use crate::array::{ArrayIndices, ArrayShape};

/// An array subset.
///
/// Subsets are zero-indexed with an exclusive end, matching host slicing
/// conventions.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {_0}, expected {_1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

impl ArraySubset {
    /// Create a new array subset at the origin with `shape`.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset from a `start` and `shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                shape.len(),
                start.len(),
            ))
        }
    }

    /// Create a new array subset from per-dimension half-open ranges.
    ///
    /// # Panics
    /// Panics if a range `end` is less than its `start`.
    #[must_use]
    pub fn new_with_ranges(ranges: &[std::ops::Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| {
                assert!(range.end >= range.start);
                range.end - range.start
            })
            .collect();
        Self { start, shape }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the inclusive end of the array subset.
    ///
    /// # Panics
    /// Panics if the subset is empty along a dimension.
    #[must_use]
    pub fn end_inc(&self) -> ArrayIndices {
        izip!(&self.start, &self.shape)
            .map(|(start, size)| start + size - 1)
            .collect()
    }

    /// Return the exclusive end of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        izip!(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a [`usize`].
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Return true if the subset is empty along any dimension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&size| size == 0)
    }

    /// Return true if the subset is within the bounds of an array with `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(self.end_exc(), array_shape).all(|(end, &size)| end <= size)
    }

    /// Return the overlapping region between this subset and `other`, in absolute coordinates.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionalities do not match.
    pub fn overlap(&self, other: &ArraySubset) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = izip!(self.start(), other.start())
            .map(|(a, b)| std::cmp::max(*a, *b))
            .collect();
        let end: ArrayIndices = izip!(self.end_exc(), other.end_exc())
            .map(|(a, b)| std::cmp::min(a, b))
            .collect();
        let shape = izip!(&start, &end)
            .map(|(start, end)| end.saturating_sub(*start))
            .collect();
        Ok(ArraySubset { start, shape })
    }

    /// Return this subset relative to an origin at `start`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` does not match the dimensionality.
    pub fn relative_to(&self, start: &[u64]) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if start.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                start.len(),
                self.dimensionality(),
            ));
        }
        Ok(ArraySubset {
            start: izip!(self.start(), start)
                .map(|(index, origin)| index.saturating_sub(*origin))
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }

    /// Returns an iterator over `(linearised index, run length)` pairs of
    /// contiguous element runs of the subset within an array of `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match the dimensionality.
    pub fn iter_contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndicesIterator, IncompatibleDimensionalityError> {
        if array_shape.len() == self.dimensionality() {
            Ok(ContiguousLinearisedIndicesIterator::new(
                self,
                array_shape.to_vec(),
            ))
        } else {
            Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Returns an iterator over `(chunk indices, chunk subset)` of chunks with
    /// `chunk_shape` overlapping the array subset.
    ///
    /// Chunk subsets are full chunks in absolute coordinates and may extend
    /// beyond the subset itself.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `chunk_shape` does not match the dimensionality.
    pub fn chunks(
        &self,
        chunk_shape: &[u64],
    ) -> Result<ChunksIterator, IncompatibleDimensionalityError> {
        if chunk_shape.len() == self.dimensionality() {
            Ok(ChunksIterator::new(self, chunk_shape.to_vec()))
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Extract the bytes of this subset from the `bytes` of an array with
    /// `array_shape` and `element_size`.
    ///
    /// # Panics
    /// Panics if the subset is not within `array_shape` or `bytes` has an
    /// incompatible length. Callers validate subsets against the array shape
    /// before extraction.
    #[must_use]
    pub fn extract_bytes(&self, bytes: &[u8], array_shape: &[u64], element_size: usize) -> Vec<u8> {
        assert_eq!(
            bytes.len() as u64,
            array_shape.iter().product::<u64>() * element_size as u64
        );
        assert!(self.inbounds(array_shape));
        let mut bytes_subset = Vec::with_capacity(self.num_elements_usize() * element_size);
        for (index, contiguous_elements) in
            self.iter_contiguous_linearised_indices(array_shape).unwrap()
        {
            let byte_index = usize::try_from(index).unwrap() * element_size;
            let byte_length = usize::try_from(contiguous_elements).unwrap() * element_size;
            bytes_subset.extend_from_slice(&bytes[byte_index..byte_index + byte_length]);
        }
        bytes_subset
    }

    /// Store `subset_bytes` into this subset of the `bytes` of an array with
    /// `array_shape` and `element_size`.
    ///
    /// # Panics
    /// Panics if the subset is not within `array_shape` or the byte lengths
    /// are incompatible. Callers validate subsets against the array shape
    /// before storing.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) {
        assert_eq!(
            bytes.len() as u64,
            array_shape.iter().product::<u64>() * element_size as u64
        );
        assert_eq!(
            subset_bytes.len() as u64,
            self.num_elements() * element_size as u64
        );
        assert!(self.inbounds(array_shape));
        let mut offset = 0;
        for (index, contiguous_elements) in
            self.iter_contiguous_linearised_indices(array_shape).unwrap()
        {
            let byte_index = usize::try_from(index).unwrap() * element_size;
            let byte_length = usize::try_from(contiguous_elements).unwrap() * element_size;
            bytes[byte_index..byte_index + byte_length]
                .copy_from_slice(&subset_bytes[offset..offset + byte_length]);
            offset += byte_length;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset_ranges() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        assert_eq!(subset.start(), &[1, 1]);
        assert_eq!(subset.shape(), &[2, 2]);
        assert_eq!(subset.end_inc(), vec![2, 2]);
        assert_eq!(subset.end_exc(), vec![3, 3]);
        assert_eq!(subset.num_elements(), 4);
        assert!(subset.inbounds(&[3, 3]));
        assert!(!subset.inbounds(&[2, 3]));
        assert!(!subset.inbounds(&[3, 3, 3]));
    }

    #[test]
    fn array_subset_overlap() {
        let subset = ArraySubset::new_with_ranges(&[1..5, 2..6]);
        let chunk = ArraySubset::new_with_ranges(&[0..4, 4..8]);
        let overlap = subset.overlap(&chunk).unwrap();
        assert_eq!(overlap, ArraySubset::new_with_ranges(&[1..4, 4..6]));
        let relative = overlap.relative_to(chunk.start()).unwrap();
        assert_eq!(relative, ArraySubset::new_with_ranges(&[1..4, 0..2]));
    }

    #[test]
    fn array_subset_extract_store_bytes() {
        //  0  1  2  3
        //  4  5  6  7
        //  8  9 10 11
        let bytes: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let extracted = subset.extract_bytes(&bytes, &[3, 4], 1);
        assert_eq!(extracted, vec![5, 6, 9, 10]);

        let mut bytes = bytes;
        subset.store_bytes(&[50, 60, 90, 100], &mut bytes, &[3, 4], 1);
        assert_eq!(bytes, vec![0, 1, 2, 3, 4, 50, 60, 7, 8, 90, 100, 11]);
    }

    #[test]
    fn array_subset_incompatible_dimensionality() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        assert!(subset.iter_contiguous_linearised_indices(&[4, 4, 4]).is_err());
        assert!(subset.chunks(&[2]).is_err());
        assert!(ArraySubset::new_with_start_shape(vec![0], vec![2, 2]).is_err());
    }
}
