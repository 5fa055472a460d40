//! Zarr V3 metadata.

mod array;
mod fill_value;
mod group;
#[allow(clippy::module_inception)]
mod metadata;

pub use array::ArrayMetadataV3;
pub use fill_value::{FillValueMetadata, NonFiniteFloat};
pub use group::GroupMetadataV3;
pub use metadata::{ConfigurationInvalidError, MetadataConfiguration, MetadataV3};
