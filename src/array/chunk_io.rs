//! The per-chunk read-modify-write unit.

use crate::{
    array_subset::ArraySubset,
    storage::{Storage, StoreKey},
};

use super::{codec::CodecChain, ArrayError, ChunkRepresentation};

/// A per-chunk read-modify-write buffer.
///
/// The decoded buffer is loaded lazily on first access: an absent store key
/// yields a buffer of fill values. Writes mark the buffer dirty; a flush
/// encodes and stores it, or erases the key entirely when the buffer holds
/// nothing but the fill value.
///
/// Each `ChunkIo` owns an independent copy of the array's codec chain, so
/// chunk operations never share codec state.
#[derive(Debug)]
pub struct ChunkIo {
    storage: Storage,
    key: StoreKey,
    representation: ChunkRepresentation,
    codecs: CodecChain,
    buffer: Option<Vec<u8>>,
    dirty: bool,
}

impl ChunkIo {
    pub(super) fn new(
        storage: Storage,
        key: StoreKey,
        representation: ChunkRepresentation,
        codecs: CodecChain,
    ) -> Self {
        Self {
            storage,
            key,
            representation,
            codecs,
            buffer: None,
            dirty: false,
        }
    }

    /// Return the store key of the chunk.
    #[must_use]
    pub const fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Return true if the buffer holds unflushed changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return true if the decoded buffer is loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// Load the decoded chunk buffer if it is not already present.
    fn load(&mut self) -> Result<&mut Vec<u8>, ArrayError> {
        if self.buffer.is_none() {
            let buffer = match self.storage.get(&self.key, None)? {
                Some(encoded) => {
                    let decoded = self.codecs.decode(encoded, &self.representation)?;
                    if decoded.len() as u64 != self.representation.size() {
                        return Err(super::codec::CodecError::UnexpectedChunkDecodedSize(
                            decoded.len(),
                            self.representation.size(),
                        )
                        .into());
                    }
                    decoded
                }
                None => self.representation.fill_value_buffer(),
            };
            self.buffer = Some(buffer);
        }
        Ok(self.buffer.as_mut().unwrap())
    }

    /// Read the bytes of `chunk_subset` (in chunk-relative coordinates).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk fails to load.
    pub fn read_subset(&mut self, chunk_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        let chunk_shape = self.representation.shape().to_vec();
        let element_size = self.representation.element_size();
        let buffer = self.load()?;
        Ok(chunk_subset.extract_bytes(buffer, &chunk_shape, element_size))
    }

    /// Write `subset_bytes` into `chunk_subset` (in chunk-relative
    /// coordinates), optionally flushing immediately.
    ///
    /// A write covering the whole chunk replaces the buffer without loading
    /// existing contents; a partial write loads the chunk first to preserve
    /// surrounding values.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk fails to load or flush.
    pub fn write_subset(
        &mut self,
        chunk_subset: &ArraySubset,
        subset_bytes: &[u8],
        flush: bool,
    ) -> Result<(), ArrayError> {
        let chunk_shape = self.representation.shape().to_vec();
        let element_size = self.representation.element_size();
        let full_chunk = chunk_subset.start().iter().all(|&index| index == 0)
            && chunk_subset.shape() == chunk_shape.as_slice();
        if full_chunk {
            if subset_bytes.len() as u64 != self.representation.size() {
                return Err(ArrayError::InvalidBytesLength(
                    subset_bytes.len(),
                    chunk_subset.clone(),
                    element_size,
                ));
            }
            self.buffer = Some(subset_bytes.to_vec());
        } else {
            if subset_bytes.len() as u64 != chunk_subset.num_elements() * element_size as u64 {
                return Err(ArrayError::InvalidBytesLength(
                    subset_bytes.len(),
                    chunk_subset.clone(),
                    element_size,
                ));
            }
            let buffer = self.load()?;
            chunk_subset.store_bytes(subset_bytes, buffer, &chunk_shape, element_size);
        }
        self.dirty = true;
        if flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the buffer to the store if it is dirty.
    ///
    /// A buffer holding nothing but the fill value erases the store key, so
    /// empty chunks are never materialized.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] on a storage or codec failure.
    pub fn flush(&mut self) -> Result<(), ArrayError> {
        if !self.dirty {
            return Ok(());
        }
        let Some(buffer) = &self.buffer else {
            self.dirty = false;
            return Ok(());
        };
        if self
            .representation
            .data_type()
            .all_fill_value(self.representation.fill_value(), buffer)
        {
            self.storage.erase(&self.key)?;
        } else {
            let encoded = self.codecs.encode(buffer.clone(), &self.representation)?;
            self.storage.set(&self.key, &encoded)?;
        }
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        array::{codec::CodecChain, DataType, Element},
        metadata::MetadataV3,
        storage::{MemoryStore, Store},
    };

    use super::*;

    fn chunk_io(storage: Storage) -> ChunkIo {
        let representation = ChunkRepresentation::new(
            vec![2, 2],
            DataType::Int32,
            DataType::Int32.default_fill_value(),
        )
        .unwrap();
        let codecs = CodecChain::from_metadata(&[serde_json::from_str::<MetadataV3>(
            r#"{"name": "bytes", "configuration": {"endian": "little"}}"#,
        )
        .unwrap()])
        .unwrap();
        ChunkIo::new(
            storage,
            StoreKey::new("array/c/0/0").unwrap(),
            representation,
            codecs,
        )
    }

    #[test]
    fn chunk_io_read_missing_is_fill() {
        let storage = Arc::new(MemoryStore::new());
        let mut chunk = chunk_io(storage);
        let bytes = chunk
            .read_subset(&ArraySubset::new_with_shape(vec![2, 2]))
            .unwrap();
        let elements = <i32 as Element>::from_bytes(&bytes);
        assert_eq!(elements, vec![-2_147_483_647; 4]);
    }

    #[test]
    fn chunk_io_write_read_flush() {
        let storage: Storage = Arc::new(MemoryStore::new());
        let mut chunk = chunk_io(storage.clone());
        let subset = ArraySubset::new_with_ranges(&[0..1, 0..2]);
        chunk
            .write_subset(&subset, &<i32 as Element>::into_bytes(&[1, 2]), false)
            .unwrap();
        assert!(chunk.is_dirty());
        chunk.flush().unwrap();
        assert!(!chunk.is_dirty());
        assert!(storage.exists(chunk.key()).unwrap());

        // the unwritten region holds the fill value
        let bytes = chunk
            .read_subset(&ArraySubset::new_with_ranges(&[1..2, 0..2]))
            .unwrap();
        assert_eq!(
            <i32 as Element>::from_bytes(&bytes),
            vec![-2_147_483_647, -2_147_483_647]
        );
    }

    #[test]
    fn chunk_io_all_fill_erases() {
        let storage: Storage = Arc::new(MemoryStore::new());
        let mut chunk = chunk_io(storage.clone());
        let full = ArraySubset::new_with_shape(vec![2, 2]);
        chunk
            .write_subset(&full, &<i32 as Element>::into_bytes(&[1, 2, 3, 4]), true)
            .unwrap();
        assert!(storage.exists(chunk.key()).unwrap());

        // overwriting with the fill value erases the stored chunk
        chunk
            .write_subset(
                &full,
                &<i32 as Element>::into_bytes(&[-2_147_483_647; 4]),
                true,
            )
            .unwrap();
        assert!(!storage.exists(chunk.key()).unwrap());
    }
}
