//! Iterators over [`ArraySubset`](super::ArraySubset) indices and chunks.

use itertools::izip;

use crate::array::{ArrayIndices, ArrayShape};

use super::ArraySubset;

/// An iterator over the indices of elements within an array subset, in
/// row-major order.
#[derive(Clone, Debug)]
pub struct IndicesIterator {
    subset: ArraySubset,
    next: Option<ArrayIndices>,
}

impl IndicesIterator {
    pub(super) fn new(subset: ArraySubset) -> Self {
        let next = (!subset.is_empty()).then(|| subset.start().to_vec());
        Self { subset, next }
    }

    fn advance(subset: &ArraySubset, indices: &mut ArrayIndices) -> bool {
        for (index, start, size) in izip!(
            indices.iter_mut().rev(),
            subset.start().iter().rev(),
            subset.shape().iter().rev()
        ) {
            *index += 1;
            if *index < start + size {
                return true;
            }
            *index = *start;
        }
        false
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.clone()?;
        let mut next = current.clone();
        if Self::advance(&self.subset, &mut next) {
            self.next = Some(next);
        } else {
            self.next = None;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // remaining count is not tracked exactly after partial iteration
        let max = self.subset.num_elements_usize();
        (usize::from(self.next.is_some()), Some(max))
    }
}

/// An iterator over `(linearised index, run length)` pairs of contiguous
/// element runs of an array subset within an array.
///
/// Trailing dimensions fully spanned by the subset are merged into a single
/// run, so a subset covering a whole array yields one run.
#[derive(Clone, Debug)]
pub struct ContiguousLinearisedIndicesIterator {
    outer: IndicesIterator,
    inner_start: ArrayIndices,
    array_shape: ArrayShape,
    contiguous_elements: u64,
}

impl ContiguousLinearisedIndicesIterator {
    pub(super) fn new(subset: &ArraySubset, array_shape: ArrayShape) -> Self {
        debug_assert_eq!(subset.dimensionality(), array_shape.len());
        // find the outermost dimension from which runs are contiguous
        let mut split = subset.dimensionality();
        let mut contiguous_elements: u64 = 1;
        for (start, size, array_size) in izip!(
            subset.start().iter().rev(),
            subset.shape().iter().rev(),
            array_shape.iter().rev()
        ) {
            contiguous_elements *= size;
            split -= 1;
            if !(*start == 0 && size == array_size) {
                break;
            }
        }
        let outer = IndicesIterator::new(ArraySubset {
            start: subset.start()[..split].to_vec(),
            shape: subset.shape()[..split].to_vec(),
        });
        Self {
            outer,
            inner_start: subset.start()[split..].to_vec(),
            array_shape,
            contiguous_elements,
        }
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let outer = self.outer.next()?;
        let mut index: u64 = 0;
        for (indices, size) in izip!(
            outer.iter().chain(self.inner_start.iter()),
            &self.array_shape
        ) {
            index = index * size + indices;
        }
        Some((index, self.contiguous_elements))
    }
}

/// An iterator over the chunks overlapping an array subset.
///
/// Yields `(chunk indices, chunk subset)` with the chunk subset a full chunk
/// in absolute coordinates.
#[derive(Clone, Debug)]
pub struct ChunksIterator {
    inner: IndicesIterator,
    chunk_shape: ArrayShape,
}

impl ChunksIterator {
    pub(super) fn new(subset: &ArraySubset, chunk_shape: ArrayShape) -> Self {
        debug_assert_eq!(subset.dimensionality(), chunk_shape.len());
        let chunk_range = if subset.is_empty() {
            ArraySubset::new_with_shape(vec![0; subset.dimensionality()])
        } else {
            let first: ArrayIndices = izip!(subset.start(), &chunk_shape)
                .map(|(index, size)| index / size)
                .collect();
            let last: ArrayIndices = izip!(subset.end_inc(), &chunk_shape)
                .map(|(index, size)| index / size)
                .collect();
            let shape = izip!(&first, &last)
                .map(|(first, last)| last - first + 1)
                .collect();
            ArraySubset {
                start: first,
                shape,
            }
        };
        Self {
            inner: IndicesIterator::new(chunk_range),
            chunk_shape,
        }
    }
}

impl Iterator for ChunksIterator {
    type Item = (ArrayIndices, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        let chunk_indices = self.inner.next()?;
        let start = izip!(&chunk_indices, &self.chunk_shape)
            .map(|(index, size)| index * size)
            .collect();
        let subset = ArraySubset {
            start,
            shape: self.chunk_shape.clone(),
        };
        Some((chunk_indices, subset))
    }
}
