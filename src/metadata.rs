//! Zarr metadata documents.
//!
//! Zarr V3 nodes are described by a `zarr.json` document at the node's prefix;
//! Zarr V2 nodes (read-only) by `.zarray`/`.zgroup` plus optional `.zattrs`.
//! V2 documents are translated into the V3 representation on read
//! ([`v2_to_v3`]), so the rest of the library deals exclusively in V3 shapes.

pub mod v2;
pub mod v2_to_v3;
pub mod v3;

pub use v3::{
    ArrayMetadataV3, ConfigurationInvalidError, FillValueMetadata, GroupMetadataV3,
    MetadataConfiguration, MetadataV3,
};

use serde::{Deserialize, Serialize};

/// Zarr node metadata, normalized to the V3 representation.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum NodeMetadata {
    /// Array metadata.
    Array(ArrayMetadataV3),
    /// Group metadata.
    Group(GroupMetadataV3),
}

impl NodeMetadata {
    /// Return the `node_type` of the metadata (`"array"` or `"group"`).
    #[must_use]
    pub fn node_type(&self) -> &str {
        match self {
            Self::Array(_) => "array",
            Self::Group(_) => "group",
        }
    }

    /// Return the user attributes of the node.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        match self {
            Self::Array(metadata) => &metadata.attributes,
            Self::Group(metadata) => &metadata.attributes,
        }
    }

    /// Validate the `zarr_format` and `node_type` fields.
    #[must_use]
    pub fn validate(&self) -> bool {
        match self {
            Self::Array(metadata) => metadata.validate_format() && metadata.validate_node_type(),
            Self::Group(metadata) => metadata.validate_format() && metadata.validate_node_type(),
        }
    }
}
