use serde::{Deserialize, Serialize};

/// The JSON representation of an array fill value.
///
/// Non-finite floats use the string forms `"NaN"`, `"Infinity"`, and
/// `"-Infinity"` per the Zarr V3 specification.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum FillValueMetadata {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer too large for [`i64`].
    UInt(u64),
    /// A finite float.
    Float(f64),
    /// A non-finite float.
    NonFinite(NonFiniteFloat),
}

/// A non-finite float fill value.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub enum NonFiniteFloat {
    /// Positive infinity.
    #[serde(rename = "Infinity")]
    PosInfinity,
    /// Negative infinity.
    #[serde(rename = "-Infinity")]
    NegInfinity,
    /// NaN (the canonical quiet NaN).
    #[serde(rename = "NaN")]
    NaN,
}

impl FillValueMetadata {
    /// Interpret the fill value as an [`i64`].
    #[must_use]
    pub fn try_as_int(&self) -> Option<i64> {
        match self {
            Self::Int(int) => Some(*int),
            Self::UInt(uint) => i64::try_from(*uint).ok(),
            Self::Float(float) if float.fract() == 0.0 => Some(*float as i64),
            _ => None,
        }
    }

    /// Interpret the fill value as a [`u64`].
    #[must_use]
    pub fn try_as_uint(&self) -> Option<u64> {
        match self {
            Self::Int(int) => u64::try_from(*int).ok(),
            Self::UInt(uint) => Some(*uint),
            Self::Float(float) if float.fract() == 0.0 && *float >= 0.0 => Some(*float as u64),
            _ => None,
        }
    }

    /// Interpret the fill value as an [`f64`].
    #[must_use]
    pub fn try_as_float(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss)]
        match self {
            Self::Int(int) => Some(*int as f64),
            Self::UInt(uint) => Some(*uint as f64),
            Self::Float(float) => Some(*float),
            Self::NonFinite(non_finite) => Some(match non_finite {
                NonFiniteFloat::PosInfinity => f64::INFINITY,
                NonFiniteFloat::NegInfinity => f64::NEG_INFINITY,
                NonFiniteFloat::NaN => f64::NAN,
            }),
            Self::Bool(_) => None,
        }
    }

    /// Interpret the fill value as a [`bool`].
    #[must_use]
    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(bool) => Some(*bool),
            _ => None,
        }
    }

    /// Create a float fill value, selecting the non-finite string form when needed.
    #[must_use]
    pub fn from_float(float: f64) -> Self {
        if float.is_nan() {
            Self::NonFinite(NonFiniteFloat::NaN)
        } else if float == f64::INFINITY {
            Self::NonFinite(NonFiniteFloat::PosInfinity)
        } else if float == f64::NEG_INFINITY {
            Self::NonFinite(NonFiniteFloat::NegInfinity)
        } else {
            Self::Float(float)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_value_metadata_int() {
        let metadata: FillValueMetadata = serde_json::from_str("-2147483647").unwrap();
        assert_eq!(metadata, FillValueMetadata::Int(-2_147_483_647));
        assert_eq!(metadata.try_as_int(), Some(-2_147_483_647));
        assert_eq!(metadata.try_as_uint(), None);
    }

    #[test]
    fn fill_value_metadata_uint64_sentinel() {
        let metadata: FillValueMetadata = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(metadata, FillValueMetadata::UInt(u64::MAX));
        assert_eq!(metadata.try_as_uint(), Some(u64::MAX));
    }

    #[test]
    fn fill_value_metadata_float() {
        let metadata: FillValueMetadata = serde_json::from_str("9.9692099683868690e+36").unwrap();
        assert_eq!(metadata.try_as_float(), Some(9.969_209_968_386_869e36));

        let nan: FillValueMetadata = serde_json::from_str(r#""NaN""#).unwrap();
        assert!(nan.try_as_float().unwrap().is_nan());
        assert_eq!(serde_json::to_string(&nan).unwrap(), r#""NaN""#);
        assert_eq!(
            serde_json::to_string(&FillValueMetadata::from_float(f64::NEG_INFINITY)).unwrap(),
            r#""-Infinity""#
        );
    }

    #[test]
    fn fill_value_metadata_bool() {
        let metadata: FillValueMetadata = serde_json::from_str("false").unwrap();
        assert_eq!(metadata.try_as_bool(), Some(false));
        assert_eq!(metadata.try_as_int(), None);
    }
}
