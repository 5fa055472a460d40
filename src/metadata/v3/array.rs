use serde::{Deserialize, Serialize};

use super::{FillValueMetadata, MetadataV3};

/// Zarr array metadata (storage specification v3).
///
/// An example `JSON` document for a Zarr V3 array:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "array",
///     "shape": [10000, 1000],
///     "data_type": "float64",
///     "chunk_grid": {
///         "name": "regular",
///         "configuration": { "chunk_shape": [1000, 100] }
///     },
///     "chunk_key_encoding": {
///         "name": "default",
///         "configuration": { "separator": "/" }
///     },
///     "fill_value": "NaN",
///     "codecs": [
///         { "name": "bytes", "configuration": { "endian": "little" } },
///         { "name": "gzip", "configuration": { "level": 1 } }
///     ],
///     "attributes": { "foo": 42 }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV3 {
    /// The version of the storage specification. Must be `3`.
    pub zarr_format: usize,
    /// The type of the hierarchy node. Must be `"array"`.
    pub node_type: String,
    /// The dimensions of the array.
    pub shape: Vec<u64>,
    /// The data type of the array.
    pub data_type: MetadataV3,
    /// The chunk grid of the array.
    pub chunk_grid: MetadataV3,
    /// The mapping from chunk grid cell coordinates to keys in the store.
    #[serde(default = "chunk_key_encoding_default")]
    pub chunk_key_encoding: MetadataV3,
    /// The value used for missing chunks and uninitialized portions of the array.
    pub fill_value: FillValueMetadata,
    /// The codecs applied, in order, to encode chunk data.
    pub codecs: Vec<MetadataV3>,
    /// Optional user attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Optional dimension names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
    /// Additional fields, preserved on rewrite.
    #[serde(flatten)]
    pub additional_fields: serde_json::Map<String, serde_json::Value>,
}

fn chunk_key_encoding_default() -> MetadataV3 {
    let mut configuration = serde_json::Map::new();
    configuration.insert("separator".to_string(), "/".into());
    MetadataV3::new_with_configuration("default", configuration)
}

impl ArrayMetadataV3 {
    /// Create array metadata.
    #[must_use]
    pub fn new(
        shape: Vec<u64>,
        data_type: MetadataV3,
        chunk_grid: MetadataV3,
        chunk_key_encoding: MetadataV3,
        fill_value: FillValueMetadata,
        codecs: Vec<MetadataV3>,
    ) -> Self {
        Self {
            zarr_format: 3,
            node_type: "array".to_string(),
            shape,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes: serde_json::Map::new(),
            dimension_names: None,
            additional_fields: serde_json::Map::new(),
        }
    }

    /// Validates that the `zarr_format` field is `3`.
    #[must_use]
    pub const fn validate_format(&self) -> bool {
        self.zarr_format == 3
    }

    /// Validates that the `node_type` field is `"array"`.
    #[must_use]
    pub fn validate_node_type(&self) -> bool {
        self.node_type == "array"
    }
}
