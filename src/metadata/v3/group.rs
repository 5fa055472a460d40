use serde::{Deserialize, Serialize};

/// Zarr group metadata (storage specification v3).
///
/// An example `JSON` document for an explicit Zarr V3 group:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "group",
///     "attributes": {
///         "spam": "ham",
///         "eggs": 42
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct GroupMetadataV3 {
    /// The version of the storage specification. Must be `3`.
    pub zarr_format: usize,
    /// The type of the hierarchy node. Must be `"group"`.
    pub node_type: String,
    /// Optional user attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Additional fields, preserved on rewrite.
    #[serde(flatten)]
    pub additional_fields: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadataV3 {
    fn default() -> Self {
        Self::new(serde_json::Map::new())
    }
}

impl GroupMetadataV3 {
    /// Create group metadata with `attributes`.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            zarr_format: 3,
            node_type: "group".to_string(),
            attributes,
            additional_fields: serde_json::Map::new(),
        }
    }

    /// Validates that the `zarr_format` field is `3`.
    #[must_use]
    pub const fn validate_format(&self) -> bool {
        self.zarr_format == 3
    }

    /// Validates that the `node_type` field is `"group"`.
    #[must_use]
    pub fn validate_node_type(&self) -> bool {
        self.node_type == "group"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata_round_trip() {
        let json = r#"{"zarr_format":3,"node_type":"group","attributes":{"spam":"ham"}}"#;
        let metadata: GroupMetadataV3 = serde_json::from_str(json).unwrap();
        assert!(metadata.validate_format());
        assert!(metadata.validate_node_type());
        assert_eq!(serde_json::to_string(&metadata).unwrap(), json);
    }

    #[test]
    fn group_metadata_minimal() {
        let metadata = GroupMetadataV3::default();
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"zarr_format":3,"node_type":"group"}"#
        );
    }
}
