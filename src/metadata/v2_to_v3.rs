//! Conversion of Zarr V2 metadata to the V3 representation.

use serde::Deserialize;
use thiserror::Error;

use crate::array::{DataType, Endianness};

use super::{
    v2::{
        parse_data_type_v2, ArrayMetadataV2, ArrayMetadataV2Order, DimensionSeparatorV2,
        FillValueMetadataV2, GroupMetadataV2, MetadataV2,
    },
    ArrayMetadataV3, FillValueMetadata, GroupMetadataV3, MetadataV3,
};

/// An error converting Zarr V2 array metadata to V3.
#[derive(Debug, Error)]
pub enum ArrayMetadataV2ToV3ConversionError {
    /// Unsupported data type.
    #[error("unsupported Zarr V2 data type {_0:?}")]
    UnsupportedDataType(String),
    /// An unsupported codec.
    #[error("unsupported Zarr V2 codec {_0}")]
    UnsupportedCodec(String),
    /// An unsupported fill value.
    #[error("unsupported fill value {_0:?} for data type {_1}")]
    UnsupportedFillValue(String, String),
    /// V2 filters have no V3 counterpart.
    #[error("Zarr V2 filters are not supported")]
    UnsupportedFilters,
    /// Serialization/deserialization error.
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

/// Convert Zarr V2 group metadata to V3.
#[must_use]
pub fn group_metadata_v2_to_v3(
    _group_metadata_v2: &GroupMetadataV2,
    attributes: serde_json::Map<String, serde_json::Value>,
) -> GroupMetadataV3 {
    GroupMetadataV3::new(attributes)
}

/// Map a parsed V2 data type to a V3 data type name.
fn data_type_v2_to_v3_name(kind: char, size: usize) -> Option<&'static str> {
    match (kind, size) {
        ('b', 1) => Some("bool"),
        ('i', 1) => Some("int8"),
        ('i', 2) => Some("int16"),
        ('i', 4) => Some("int32"),
        ('i', 8) => Some("int64"),
        ('u', 1) => Some("uint8"),
        ('u', 2) => Some("uint16"),
        ('u', 4) => Some("uint32"),
        ('u', 8) => Some("uint64"),
        ('f', 4) => Some("float32"),
        ('f', 8) => Some("float64"),
        _ => None,
    }
}

fn fill_value_v2_to_v3(
    fill_value: &FillValueMetadataV2,
    data_type: &DataType,
) -> Result<FillValueMetadata, ArrayMetadataV2ToV3ConversionError> {
    let unsupported = || {
        ArrayMetadataV2ToV3ConversionError::UnsupportedFillValue(
            format!("{fill_value:?}"),
            data_type.name().to_string(),
        )
    };
    match fill_value {
        FillValueMetadataV2::Null => {
            Ok(data_type.fill_value_metadata(&data_type.default_fill_value()))
        }
        FillValueMetadataV2::Bool(bool) => Ok(FillValueMetadata::Bool(*bool)),
        FillValueMetadataV2::Int(int) => {
            if *data_type == DataType::Bool {
                // V2 commonly encodes bool fills as 0/1
                match int {
                    0 => Ok(FillValueMetadata::Bool(false)),
                    1 => Ok(FillValueMetadata::Bool(true)),
                    _ => Err(unsupported()),
                }
            } else {
                Ok(FillValueMetadata::Int(*int))
            }
        }
        FillValueMetadataV2::UInt(uint) => Ok(FillValueMetadata::UInt(*uint)),
        FillValueMetadataV2::Float(float) => Ok(FillValueMetadata::from_float(*float)),
        FillValueMetadataV2::String(string) => match string.as_str() {
            "NaN" => Ok(FillValueMetadata::from_float(f64::NAN)),
            "Infinity" => Ok(FillValueMetadata::from_float(f64::INFINITY)),
            "-Infinity" => Ok(FillValueMetadata::from_float(f64::NEG_INFINITY)),
            _ => Err(unsupported()),
        },
    }
}

fn configuration(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!("codec configurations are JSON maps"),
    }
}

/// Convert a numcodecs `blosc` compressor configuration to the V3 form.
fn codec_blosc_v2_to_v3(
    compressor: &MetadataV2,
    typesize: usize,
) -> Result<MetadataV3, ArrayMetadataV2ToV3ConversionError> {
    #[derive(Deserialize)]
    struct BloscV2 {
        #[serde(default = "cname_default")]
        cname: String,
        #[serde(default = "clevel_default")]
        clevel: u8,
        #[serde(default = "shuffle_default")]
        shuffle: i8,
        #[serde(default)]
        blocksize: usize,
    }
    fn cname_default() -> String {
        "lz4".to_string()
    }
    const fn clevel_default() -> u8 {
        5
    }
    const fn shuffle_default() -> i8 {
        1
    }

    let blosc: BloscV2 =
        serde_json::from_value(serde_json::Value::Object(compressor.configuration().clone()))?;
    let shuffle = match blosc.shuffle {
        0 => "noshuffle",
        1 => "shuffle",
        2 => "bitshuffle",
        // numcodecs AUTOSHUFFLE: byte shuffle except for single-byte types
        -1 => {
            if typesize == 1 {
                "bitshuffle"
            } else {
                "shuffle"
            }
        }
        _ => {
            return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(
                format!("blosc shuffle {}", blosc.shuffle),
            ))
        }
    };
    Ok(MetadataV3::new_with_configuration(
        "blosc",
        configuration(serde_json::json!({
            "cname": blosc.cname,
            "clevel": blosc.clevel,
            "shuffle": shuffle,
            "typesize": typesize,
            "blocksize": blosc.blocksize,
        })),
    ))
}

/// Convert Zarr V2 array metadata to V3.
///
/// Attributes from a sibling `.zattrs` are merged into the returned document.
///
/// # Errors
/// Returns an [`ArrayMetadataV2ToV3ConversionError`] if the data type,
/// compressor, filters, or fill value have no V3 counterpart.
pub fn array_metadata_v2_to_v3(
    array_metadata_v2: &ArrayMetadataV2,
    attributes: serde_json::Map<String, serde_json::Value>,
) -> Result<ArrayMetadataV3, ArrayMetadataV2ToV3ConversionError> {
    let unsupported_data_type = || {
        ArrayMetadataV2ToV3ConversionError::UnsupportedDataType(array_metadata_v2.dtype.clone())
    };

    let dtype =
        parse_data_type_v2(&array_metadata_v2.dtype).map_err(|_| unsupported_data_type())?;
    let data_type_name =
        data_type_v2_to_v3_name(dtype.kind, dtype.size).ok_or_else(unsupported_data_type)?;
    let data_type = DataType::from_name(data_type_name).ok_or_else(unsupported_data_type)?;

    let chunk_grid = MetadataV3::new_with_configuration(
        "regular",
        configuration(serde_json::json!({"chunk_shape": array_metadata_v2.chunks})),
    );

    // V2 chunk keys never have the "c" prefix and default to a "." separator
    let separator = match array_metadata_v2.dimension_separator {
        Some(DimensionSeparatorV2::Slash) => "/",
        _ => ".",
    };
    let chunk_key_encoding = MetadataV3::new_with_configuration(
        "v2",
        configuration(serde_json::json!({"separator": separator})),
    );

    let mut codecs: Vec<MetadataV3> = Vec::new();

    if array_metadata_v2.order == ArrayMetadataV2Order::F {
        let order: Vec<usize> = (0..array_metadata_v2.shape.len()).rev().collect();
        codecs.push(MetadataV3::new_with_configuration(
            "transpose",
            configuration(serde_json::json!({"order": order})),
        ));
    }

    if array_metadata_v2
        .filters
        .as_ref()
        .is_some_and(|filters| !filters.is_empty())
    {
        return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedFilters);
    }

    if data_type.size() > 1 {
        let endian = match dtype.endianness {
            Some(Endianness::Little) => "little",
            Some(Endianness::Big) => "big",
            None => return Err(unsupported_data_type()),
        };
        codecs.push(MetadataV3::new_with_configuration(
            "bytes",
            configuration(serde_json::json!({"endian": endian})),
        ));
    } else {
        codecs.push(MetadataV3::new("bytes"));
    }

    if let Some(compressor) = &array_metadata_v2.compressor {
        match compressor.id() {
            "blosc" => codecs.push(codec_blosc_v2_to_v3(compressor, data_type.size())?),
            "zstd" | "gzip" => {
                #[derive(Deserialize)]
                struct Level {
                    #[serde(default = "level_default")]
                    level: i64,
                }
                const fn level_default() -> i64 {
                    1
                }
                let level: Level = serde_json::from_value(serde_json::Value::Object(
                    compressor.configuration().clone(),
                ))?;
                codecs.push(MetadataV3::new_with_configuration(
                    compressor.id(),
                    configuration(serde_json::json!({"level": level.level})),
                ));
            }
            id => {
                return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(
                    id.to_string(),
                ))
            }
        }
    }

    let fill_value = fill_value_v2_to_v3(&array_metadata_v2.fill_value, &data_type)?;

    let mut metadata = ArrayMetadataV3::new(
        array_metadata_v2.shape.clone(),
        MetadataV3::new(data_type_name),
        chunk_grid,
        chunk_key_encoding,
        fill_value,
        codecs,
    );
    metadata.attributes = attributes;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2_metadata(json: &str) -> ArrayMetadataV2 {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn v2_to_v3_simple_array() {
        let metadata = v2_metadata(
            r#"{
                "zarr_format": 2,
                "shape": [720],
                "chunks": [180],
                "dtype": "<f8",
                "compressor": null,
                "fill_value": null,
                "order": "C",
                "filters": null
            }"#,
        );
        let v3 = array_metadata_v2_to_v3(&metadata, serde_json::Map::new()).unwrap();
        assert_eq!(v3.shape, vec![720]);
        assert_eq!(v3.data_type.name(), "float64");
        assert_eq!(v3.chunk_key_encoding.name(), "v2");
        assert_eq!(v3.codecs.len(), 1);
        assert_eq!(v3.codecs[0].name(), "bytes");
        assert_eq!(v3.codecs[0].configuration().unwrap()["endian"], "little");
        // null fill value becomes the data type default
        assert_eq!(
            v3.fill_value,
            FillValueMetadata::Float(9.969_209_968_386_869e36)
        );
    }

    #[test]
    fn v2_to_v3_fortran_order_blosc() {
        let metadata = v2_metadata(
            r#"{
                "zarr_format": 2,
                "shape": [100, 100],
                "chunks": [10, 10],
                "dtype": ">i2",
                "compressor": {"id": "blosc", "cname": "zstd", "clevel": 5, "shuffle": 2, "blocksize": 0},
                "fill_value": 0,
                "order": "F",
                "filters": null,
                "dimension_separator": "/"
            }"#,
        );
        let v3 = array_metadata_v2_to_v3(&metadata, serde_json::Map::new()).unwrap();
        assert_eq!(v3.codecs.len(), 3);
        assert_eq!(v3.codecs[0].name(), "transpose");
        assert_eq!(
            v3.codecs[0].configuration().unwrap()["order"],
            serde_json::json!([1, 0])
        );
        assert_eq!(v3.codecs[1].configuration().unwrap()["endian"], "big");
        let blosc = v3.codecs[2].configuration().unwrap();
        assert_eq!(blosc["cname"], "zstd");
        assert_eq!(blosc["shuffle"], "bitshuffle");
        assert_eq!(blosc["typesize"], 2);
        assert_eq!(
            v3.chunk_key_encoding.configuration().unwrap()["separator"],
            "/"
        );
    }

    #[test]
    fn v2_to_v3_unsupported() {
        let metadata = v2_metadata(
            r#"{
                "zarr_format": 2,
                "shape": [10],
                "chunks": [10],
                "dtype": "<i4",
                "compressor": {"id": "lzma"},
                "fill_value": 0,
                "order": "C",
                "filters": null
            }"#,
        );
        assert!(matches!(
            array_metadata_v2_to_v3(&metadata, serde_json::Map::new()),
            Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(_))
        ));

        let metadata = v2_metadata(
            r#"{
                "zarr_format": 2,
                "shape": [10],
                "chunks": [10],
                "dtype": "<S8",
                "compressor": null,
                "fill_value": null,
                "order": "C",
                "filters": null
            }"#,
        );
        assert!(matches!(
            array_metadata_v2_to_v3(&metadata, serde_json::Map::new()),
            Err(ArrayMetadataV2ToV3ConversionError::UnsupportedDataType(_))
        ));

        let metadata = v2_metadata(
            r#"{
                "zarr_format": 2,
                "shape": [10],
                "chunks": [10],
                "dtype": "<i4",
                "compressor": null,
                "fill_value": 0,
                "order": "C",
                "filters": [{"id": "delta"}]
            }"#,
        );
        assert!(matches!(
            array_metadata_v2_to_v3(&metadata, serde_json::Map::new()),
            Err(ArrayMetadataV2ToV3ConversionError::UnsupportedFilters)
        ));
    }
}
