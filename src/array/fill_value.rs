//! Array fill values.
//!
//! The fill value is the value taken by every element of a chunk that is
//! absent from the store. It doubles as the in-process representation of
//! missing data: writing the fill value to a region logically erases it, and
//! a chunk holding nothing but the fill value is erased from the store on
//! flush.

/// The fill value of an array, stored as native-endian raw bytes.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl FillValue {
    /// Create a new fill value from raw bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Return the fill value bytes.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the size of the fill value in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return true if every element of `bytes` equals the fill value exactly.
    ///
    /// Elements are compared bytewise; float comparisons with tolerance are
    /// performed by [`DataType::all_fill_value`](crate::array::DataType::all_fill_value).
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        bytes.len() % self.0.len() == 0
            && bytes
                .chunks_exact(self.0.len())
                .all(|element| element == self.0)
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        Self(vec![u8::from(value)])
    }
}

macro_rules! impl_fill_value_from {
    ($($type:ty),*) => {
        $(
            impl From<$type> for FillValue {
                fn from(value: $type) -> Self {
                    Self(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_value_bytes() {
        assert_eq!(FillValue::from(false).as_ne_bytes(), &[0]);
        assert_eq!(FillValue::from(true).as_ne_bytes(), &[1]);
        assert_eq!(FillValue::from(255u8).as_ne_bytes(), &[255]);
        assert_eq!(FillValue::from(-32767i16).size(), 2);
        assert_eq!(FillValue::from(1.5f64).size(), 8);
    }

    #[test]
    fn fill_value_equals_all() {
        let fill_value = FillValue::from(42u16);
        let mut bytes = Vec::new();
        for _ in 0..4 {
            bytes.extend(42u16.to_ne_bytes());
        }
        assert!(fill_value.equals_all(&bytes));
        bytes.extend(43u16.to_ne_bytes());
        assert!(!fill_value.equals_all(&bytes));
    }
}
