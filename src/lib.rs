//! A Rust library for reading and writing [Zarr V3](https://zarr.dev) hierarchical
//! multidimensional array datasets, with read-only compatibility for Zarr V2.
//!
//! A [`Dataset`](crate::hierarchy::Dataset) maps a tree of groups and arrays
//! onto an abstract key-value [store](crate::storage). Array data is
//! partitioned into fixed-shape chunks, each encoded independently through an
//! ordered [codec chain](crate::array::codec) on write and decoded on read.
//! Hyperslab reads and writes are served by per-chunk read-modify-write
//! buffers with lazy loading and dirty tracking; a chunk holding nothing but
//! the array's fill value is erased from the store, so sparse arrays stay
//! sparse on disk.
//!
//! ## Features
//! All features are enabled by default.
//!  - Codecs: `blosc`, `crc32c`, `gzip`, `transpose`, `zstd`.
//!  - Stores: `http` (read-only; [`memory`](crate::storage::MemoryStore) and
//!    [`filesystem`](crate::storage::FilesystemStore) are always available).
//!
//! ## Implementation status
//! - [x] Stores: [`memory`](crate::storage::MemoryStore),
//!   [`filesystem`](crate::storage::FilesystemStore),
//!   [`http`](crate::storage::HttpStore) (read-only)
//! - [x] Data types: the Zarr V3 core fixed-width scalar types
//! - [x] Chunk grids: [`regular`](crate::array::RegularChunkGrid)
//! - [x] Chunk key encodings: [`default`](crate::array::ChunkKeyEncoding) and `v2`
//! - [x] Codecs: `transpose`, `bytes`, `blosc`, `gzip`, `zstd`, `crc32c`
//! - [x] Zarr V2 read-only compatibility, including `.zmetadata` consolidated
//!   metadata discovery
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use zarrio::array::{ArrayMetadataBuilder, DataType};
//! use zarrio::array_subset::ArraySubset;
//! use zarrio::hierarchy::Dataset;
//! use zarrio::storage::MemoryStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dataset = Dataset::create_with_root_group(Arc::new(MemoryStore::new()))?;
//! let mut builder = ArrayMetadataBuilder::new();
//! builder.data_type(DataType::Int32).shape(vec![8, 8]);
//! dataset.add_array("/", "values", &builder)?;
//!
//! let array = dataset.array("/values").unwrap();
//! let subset = ArraySubset::new_with_ranges(&[2..4, 0..2]);
//! array.store_array_subset_elements::<i32>(&subset, &[1, 2, 3, 4])?;
//! assert_eq!(
//!     array.retrieve_array_subset_elements::<i32>(&subset)?,
//!     vec![1, 2, 3, 4]
//! );
//! # Ok(())
//! # }
//! ```

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod byte_range;
pub mod group;
pub mod hierarchy;
pub mod metadata;
pub mod node;
pub mod storage;
