//! Zarr V2 metadata (read-only support).
//!
//! V2 hierarchies store a `.zgroup` per group, a `.zarray` per array, optional
//! user attributes in a sibling `.zattrs`, and optionally a consolidated
//! `.zmetadata` document at the store root.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::array::Endianness;

/// Numcodecs-style metadata with an `id` and a flattened configuration.
///
/// ```json
/// { "id": "blosc", "cname": "zstd", "clevel": 5, "shuffle": 1 }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

impl MetadataV2 {
    /// Return the `id` of the metadata.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configuration (all fields other than `id`).
    #[must_use]
    pub const fn configuration(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.configuration
    }
}

/// A Zarr V2 fill value.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(untagged)]
pub enum FillValueMetadataV2 {
    /// No fill value specified; the data type default applies.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer too large for [`i64`].
    UInt(u64),
    /// A finite float.
    Float(f64),
    /// A string, e.g. `"NaN"` or `"Infinity"`.
    String(String),
}

/// The memory layout of a Zarr V2 array.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ArrayMetadataV2Order {
    /// Row-major: the last dimension varies fastest.
    C,
    /// Column-major: the first dimension varies fastest.
    F,
}

/// A Zarr V2 dimension separator.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DimensionSeparatorV2 {
    /// `.` separated chunk keys (the V2 default).
    #[serde(rename = ".")]
    Dot,
    /// `/` separated chunk keys.
    #[serde(rename = "/")]
    Slash,
}

/// Zarr V2 array metadata (`.zarray`).
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV2 {
    /// The version of the storage specification. Must be `2`.
    pub zarr_format: usize,
    /// The dimensions of the array.
    pub shape: Vec<u64>,
    /// The chunk dimensions of the array.
    pub chunks: Vec<u64>,
    /// The data type string, e.g. `"<i4"`.
    pub dtype: String,
    /// The primary compressor, if any.
    pub compressor: Option<MetadataV2>,
    /// The fill value.
    #[serde(default)]
    pub fill_value: FillValueMetadataV2,
    /// The memory layout of chunks.
    pub order: ArrayMetadataV2Order,
    /// Optional filters applied before the compressor.
    #[serde(default)]
    pub filters: Option<Vec<MetadataV2>>,
    /// The chunk key separator. Defaults to `.`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_separator: Option<DimensionSeparatorV2>,
}

/// Zarr V2 group metadata (`.zgroup`).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct GroupMetadataV2 {
    /// The version of the storage specification. Must be `2`.
    pub zarr_format: usize,
}

/// A Zarr V2 consolidated metadata document (`.zmetadata`).
///
/// ```json
/// {
///     "zarr_consolidated_format": 1,
///     "metadata": {
///         ".zgroup": { "zarr_format": 2 },
///         "latitude/.zarray": { "...": "..." }
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ConsolidatedMetadataV2 {
    /// The consolidated metadata format version. Must be `1`.
    pub zarr_consolidated_format: usize,
    /// Metadata documents keyed by their store key relative to the root.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConsolidatedMetadataV2 {
    /// Validates that the `zarr_consolidated_format` field is `1`.
    #[must_use]
    pub const fn validate_format(&self) -> bool {
        self.zarr_consolidated_format == 1
    }
}

/// A parsed Zarr V2 data type string.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DataTypeV2 {
    /// The byte order, [`None`] for single-byte types.
    pub endianness: Option<Endianness>,
    /// The kind character: `b`, `i`, `u`, `f`, or `S`.
    pub kind: char,
    /// The size of the data type in bytes.
    pub size: usize,
}

/// An invalid Zarr V2 data type string.
#[derive(Clone, Debug, Error)]
#[error("invalid Zarr V2 data type {_0}")]
pub struct InvalidDataTypeV2Error(String);

/// Parse a Zarr V2 data type string of the form `(<|>|\|)(b|i|u|f|S)(size)`.
///
/// # Errors
/// Returns [`InvalidDataTypeV2Error`] if the string is not of that form.
pub fn parse_data_type_v2(dtype: &str) -> Result<DataTypeV2, InvalidDataTypeV2Error> {
    let mut chars = dtype.chars();
    let err = || InvalidDataTypeV2Error(dtype.to_string());
    let endianness = match chars.next().ok_or_else(err)? {
        '<' => Some(Endianness::Little),
        '>' => Some(Endianness::Big),
        '|' => None,
        _ => return Err(err()),
    };
    let kind = chars.next().ok_or_else(err)?;
    if !matches!(kind, 'b' | 'i' | 'u' | 'f' | 'S') {
        return Err(err());
    }
    let size: usize = chars.as_str().parse().map_err(|_| err())?;
    if size == 0 {
        return Err(err());
    }
    Ok(DataTypeV2 {
        endianness,
        kind,
        size,
    })
}
