//! Array data types.
//!
//! The core fixed-width scalar data types of Zarr V3.
//! Each data type carries a default fill value, used both when metadata omits
//! a fill value and as the in-process sentinel for missing data.

use thiserror::Error;

use crate::metadata::{FillValueMetadata, MetadataV3};

use super::FillValue;

/// A data type.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[non_exhaustive]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error.
#[derive(Clone, Debug, Error)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

impl UnsupportedDataTypeError {
    /// Create a new unsupported data type error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// An invalid fill value error.
#[derive(Clone, Debug, Error)]
#[error("invalid fill value {_1:?} for data type {_0}")]
pub struct InvalidFillValueMetadataError(String, FillValueMetadata);

impl DataType {
    /// All core data types.
    pub const ALL: [DataType; 11] = [
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Return the name of the data type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Return the data type with `name`, if it exists.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|data_type| data_type.name() == name)
    }

    /// Create a data type from metadata.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the metadata does not name a
    /// core data type or has a configuration.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, UnsupportedDataTypeError> {
        if metadata.configuration().is_some_and(|c| !c.is_empty()) {
            return Err(UnsupportedDataTypeError::new(metadata.to_string()));
        }
        Self::from_name(metadata.name())
            .ok_or_else(|| UnsupportedDataTypeError::new(metadata.name()))
    }

    /// Create the metadata of the data type.
    #[must_use]
    pub fn metadata(&self) -> MetadataV3 {
        MetadataV3::new(self.name())
    }

    /// Return the size of the data type in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Return true if the data type is signed.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Return the default fill value of the data type.
    ///
    /// This is the value used when metadata does not specify a fill value, and
    /// the sentinel representing missing data in process.
    #[must_use]
    pub fn default_fill_value(&self) -> FillValue {
        match self {
            Self::Bool => FillValue::from(false),
            Self::Int8 => FillValue::from(-127i8),
            Self::Int16 => FillValue::from(-32767i16),
            Self::Int32 => FillValue::from(-2_147_483_647i32),
            Self::Int64 => FillValue::from(i64::MAX),
            Self::UInt8 => FillValue::from(u8::MAX),
            Self::UInt16 => FillValue::from(u16::MAX),
            Self::UInt32 => FillValue::from(u32::MAX),
            Self::UInt64 => FillValue::from(u64::MAX),
            #[allow(clippy::excessive_precision)]
            Self::Float32 => FillValue::from(9.969_209_968_386_869e36f32),
            Self::Float64 => FillValue::from(9.969_209_968_386_869e36f64),
        }
    }

    /// Create a fill value from metadata.
    ///
    /// # Errors
    /// Returns [`InvalidFillValueMetadataError`] if the metadata is
    /// incompatible with the data type.
    pub fn fill_value_from_metadata(
        &self,
        metadata: &FillValueMetadata,
    ) -> Result<FillValue, InvalidFillValueMetadataError> {
        let err = || InvalidFillValueMetadataError(self.name().to_string(), *metadata);
        match self {
            Self::Bool => Ok(FillValue::from(metadata.try_as_bool().ok_or_else(err)?)),
            Self::Int8 => {
                let int = metadata.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i8::try_from(int).map_err(|_| err())?))
            }
            Self::Int16 => {
                let int = metadata.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i16::try_from(int).map_err(|_| err())?))
            }
            Self::Int32 => {
                let int = metadata.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i32::try_from(int).map_err(|_| err())?))
            }
            Self::Int64 => Ok(FillValue::from(metadata.try_as_int().ok_or_else(err)?)),
            Self::UInt8 => {
                let uint = metadata.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u8::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt16 => {
                let uint = metadata.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u16::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt32 => {
                let uint = metadata.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u32::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt64 => Ok(FillValue::from(metadata.try_as_uint().ok_or_else(err)?)),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float32 => Ok(FillValue::from(
                metadata.try_as_float().ok_or_else(err)? as f32
            )),
            Self::Float64 => Ok(FillValue::from(metadata.try_as_float().ok_or_else(err)?)),
        }
    }

    /// Create the metadata of a fill value.
    ///
    /// # Panics
    /// Panics if the fill value size does not match the data type size.
    #[must_use]
    pub fn fill_value_metadata(&self, fill_value: &FillValue) -> FillValueMetadata {
        let bytes = fill_value.as_ne_bytes();
        assert_eq!(bytes.len(), self.size());
        match self {
            Self::Bool => FillValueMetadata::Bool(bytes[0] != 0),
            Self::Int8 => FillValueMetadata::Int(i64::from(i8::from_ne_bytes([bytes[0]]))),
            Self::Int16 => {
                FillValueMetadata::Int(i64::from(i16::from_ne_bytes(bytes.try_into().unwrap())))
            }
            Self::Int32 => {
                FillValueMetadata::Int(i64::from(i32::from_ne_bytes(bytes.try_into().unwrap())))
            }
            Self::Int64 => FillValueMetadata::Int(i64::from_ne_bytes(bytes.try_into().unwrap())),
            Self::UInt8 => FillValueMetadata::Int(i64::from(bytes[0])),
            Self::UInt16 => {
                FillValueMetadata::Int(i64::from(u16::from_ne_bytes(bytes.try_into().unwrap())))
            }
            Self::UInt32 => {
                FillValueMetadata::Int(i64::from(u32::from_ne_bytes(bytes.try_into().unwrap())))
            }
            Self::UInt64 => FillValueMetadata::UInt(u64::from_ne_bytes(bytes.try_into().unwrap())),
            Self::Float32 => FillValueMetadata::from_float(f64::from(f32::from_ne_bytes(
                bytes.try_into().unwrap(),
            ))),
            Self::Float64 => {
                FillValueMetadata::from_float(f64::from_ne_bytes(bytes.try_into().unwrap()))
            }
        }
    }

    /// Return true if every element of `bytes` is the fill value.
    ///
    /// Float elements match the fill value to within an absolute tolerance of
    /// the square root of the machine epsilon, and a NaN fill value matches
    /// any NaN element. Integer and boolean elements compare exactly.
    ///
    /// # Panics
    /// Panics if the fill value size does not match the data type size.
    #[must_use]
    pub fn all_fill_value(&self, fill_value: &FillValue, bytes: &[u8]) -> bool {
        assert_eq!(fill_value.size(), self.size());
        if bytes.len() % self.size() != 0 {
            return false;
        }
        match self {
            Self::Float32 => {
                let fill = f32::from_ne_bytes(fill_value.as_ne_bytes().try_into().unwrap());
                bytes.chunks_exact(4).all(|element| {
                    let element = f32::from_ne_bytes(element.try_into().unwrap());
                    float_matches_fill(f64::from(element), f64::from(fill), FLOAT32_TOLERANCE)
                })
            }
            Self::Float64 => {
                let fill = f64::from_ne_bytes(fill_value.as_ne_bytes().try_into().unwrap());
                bytes.chunks_exact(8).all(|element| {
                    let element = f64::from_ne_bytes(element.try_into().unwrap());
                    float_matches_fill(element, fill, FLOAT64_TOLERANCE)
                })
            }
            _ => fill_value.equals_all(bytes),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `sqrt(f32::EPSILON)`.
const FLOAT32_TOLERANCE: f64 = 0.000_345_266_98;
/// `sqrt(f64::EPSILON)`.
const FLOAT64_TOLERANCE: f64 = 0.000_000_014_901_161_193_847_656;

fn float_matches_fill(element: f64, fill: f64, tolerance: f64) -> bool {
    if fill.is_nan() {
        element.is_nan()
    } else if fill.is_infinite() {
        element == fill
    } else {
        (element - fill).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names_round_trip() {
        for data_type in DataType::ALL {
            assert_eq!(DataType::from_name(data_type.name()), Some(data_type));
            assert_eq!(
                DataType::from_metadata(&data_type.metadata()).unwrap(),
                data_type
            );
        }
        assert!(DataType::from_name("float16").is_none());
        assert!(DataType::from_metadata(&MetadataV3::new("complex64")).is_err());
    }

    #[test]
    fn data_type_sizes() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::UInt32.size(), 4);
        assert_eq!(DataType::Float64.size(), 8);
        assert!(DataType::Int8.is_signed());
        assert!(DataType::Float32.is_signed());
        assert!(!DataType::UInt64.is_signed());
        assert!(!DataType::Bool.is_signed());
    }

    #[test]
    fn data_type_default_fill_values() {
        assert_eq!(DataType::Bool.default_fill_value(), FillValue::from(false));
        assert_eq!(DataType::Int8.default_fill_value(), FillValue::from(-127i8));
        assert_eq!(
            DataType::Int32.default_fill_value(),
            FillValue::from(-2_147_483_647i32)
        );
        assert_eq!(
            DataType::Int64.default_fill_value(),
            FillValue::from(9_223_372_036_854_775_807i64)
        );
        assert_eq!(
            DataType::UInt64.default_fill_value(),
            FillValue::from(u64::MAX)
        );
        assert_eq!(
            DataType::Float64.default_fill_value(),
            FillValue::from(9.969_209_968_386_869e36f64)
        );
    }

    #[test]
    fn data_type_fill_value_metadata_round_trip() {
        for data_type in DataType::ALL {
            let fill_value = data_type.default_fill_value();
            let metadata = data_type.fill_value_metadata(&fill_value);
            assert_eq!(
                data_type.fill_value_from_metadata(&metadata).unwrap(),
                fill_value
            );
        }
    }

    #[test]
    fn data_type_fill_value_incompatible() {
        assert!(DataType::Bool
            .fill_value_from_metadata(&FillValueMetadata::Int(2))
            .is_err());
        assert!(DataType::UInt8
            .fill_value_from_metadata(&FillValueMetadata::Int(-1))
            .is_err());
        assert!(DataType::Int8
            .fill_value_from_metadata(&FillValueMetadata::Int(400))
            .is_err());
    }

    #[test]
    fn data_type_all_fill_value_exact() {
        let fill_value = DataType::Int32.default_fill_value();
        let mut bytes = Vec::new();
        for _ in 0..3 {
            bytes.extend((-2_147_483_647i32).to_ne_bytes());
        }
        assert!(DataType::Int32.all_fill_value(&fill_value, &bytes));
        bytes.extend(7i32.to_ne_bytes());
        assert!(!DataType::Int32.all_fill_value(&fill_value, &bytes));
    }

    #[test]
    fn data_type_all_fill_value_float_tolerance() {
        let fill_value = FillValue::from(1.0f64);
        let near = 1.0f64 + 1e-9;
        let far = 1.0f64 + 1e-6;
        assert!(DataType::Float64.all_fill_value(&fill_value, &near.to_ne_bytes()));
        assert!(!DataType::Float64.all_fill_value(&fill_value, &far.to_ne_bytes()));

        let nan_fill = FillValue::from(f64::NAN);
        assert!(DataType::Float64.all_fill_value(&nan_fill, &f64::NAN.to_ne_bytes()));
        assert!(!DataType::Float64.all_fill_value(&nan_fill, &1.0f64.to_ne_bytes()));
    }
}
