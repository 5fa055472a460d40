//! Zarr stores.

mod filesystem;
#[cfg(feature = "http")]
mod http;
mod memory;

pub use filesystem::{FilesystemStore, FilesystemStoreCreateError};
#[cfg(feature = "http")]
pub use http::{HttpStore, HttpStoreCreateError};
pub use memory::MemoryStore;
