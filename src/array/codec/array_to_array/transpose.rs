//! The `transpose` array to array codec.
//!
//! Permutes the dimensions of chunks so that the stored layout can differ
//! from the in-memory layout.

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array::{codec::Codec, ChunkRepresentation},
    metadata::MetadataV3,
};

use super::super::{
    ArrayToArrayCodecTraits, CodecCreateError, CodecError, CodecTraits,
};

/// The identifier of the `transpose` codec.
pub const IDENTIFIER: &str = "transpose";

/// A transpose permutation order.
///
/// A permutation of `0..n` with `n ≥ 2`.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct TransposeOrder(Vec<usize>);

/// An invalid permutation order error.
#[derive(Clone, Debug, Error, From)]
#[error("permutation order {_0:?} is invalid; it must be a permutation of 0, 1, …, n-1 with n ≥ 2")]
pub struct InvalidPermutationError(Vec<usize>);

impl TransposeOrder {
    /// Create a new transpose order.
    ///
    /// # Errors
    /// Returns [`InvalidPermutationError`] if `order` is not a permutation of
    /// `0..n` with `n ≥ 2`.
    pub fn new(order: &[usize]) -> Result<Self, InvalidPermutationError> {
        let valid = order.len() >= 2 && {
            let mut seen = vec![false; order.len()];
            for &axis in order {
                if axis >= order.len() || seen[axis] {
                    return Err(InvalidPermutationError(order.to_vec()));
                }
                seen[axis] = true;
            }
            true
        };
        if valid {
            Ok(Self(order.to_vec()))
        } else {
            Err(InvalidPermutationError(order.to_vec()))
        }
    }

    /// Return the permutation order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.0
    }

    /// Return true if the order is the identity permutation.
    ///
    /// An identity transpose matches the in-memory layout, so encode and
    /// decode are no-ops.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(axis, &order)| axis == order)
    }

    /// Return the inverse permutation.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.0.len()];
        for (axis, &order) in self.0.iter().enumerate() {
            inverse[order] = axis;
        }
        Self(inverse)
    }
}

impl<'de> serde::Deserialize<'de> for TransposeOrder {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let order = Vec::<usize>::deserialize(d)?;
        Self::new(&order).map_err(serde::de::Error::custom)
    }
}

/// `transpose` codec configuration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct TransposeCodecConfiguration {
    /// The permutation of the chunk dimensions.
    pub order: TransposeOrder,
}

pub(crate) fn create_codec_transpose(metadata: &MetadataV3) -> Result<Codec, CodecCreateError> {
    let configuration: TransposeCodecConfiguration = metadata.to_configuration("codec")?;
    let codec = Box::new(TransposeCodec::new(configuration.order));
    Ok(Codec::ArrayToArray(codec))
}

/// A `transpose` codec implementation.
#[derive(Clone, Debug)]
pub struct TransposeCodec {
    order: TransposeOrder,
}

impl TransposeCodec {
    /// Create a new `transpose` codec.
    #[must_use]
    pub const fn new(order: TransposeOrder) -> Self {
        Self { order }
    }

    /// Create a new `transpose` codec with a reversed dimension order.
    ///
    /// # Errors
    /// Returns [`InvalidPermutationError`] if `dimensionality` is below 2.
    pub fn new_reverse(dimensionality: usize) -> Result<Self, InvalidPermutationError> {
        let order: Vec<usize> = (0..dimensionality).rev().collect();
        Ok(Self::new(TransposeOrder::new(&order)?))
    }
}

fn permute(shape: &[u64], order: &TransposeOrder) -> Vec<u64> {
    order.order().iter().map(|&axis| shape[axis]).collect()
}

/// Transpose `data` with `untransposed_shape` and `element_size` by `order`.
fn transpose_array(
    order: &TransposeOrder,
    untransposed_shape: &[u64],
    element_size: usize,
    data: &[u8],
) -> Result<Vec<u8>, CodecError> {
    // the element bytes are an extra innermost axis that is never permuted
    let mut shape = Vec::with_capacity(untransposed_shape.len() + 1);
    for &size in untransposed_shape {
        shape.push(usize::try_from(size).unwrap());
    }
    shape.push(element_size);
    let mut permutation = Vec::with_capacity(order.order().len() + 1);
    permutation.extend_from_slice(order.order());
    permutation.push(untransposed_shape.len());

    let array = ndarray::ArrayViewD::from_shape(shape, data)
        .map_err(|err| CodecError::Other(err.to_string()))?;
    let transposed = array.permuted_axes(permutation);
    Ok(transposed.as_standard_layout().into_owned().into_raw_vec())
}

impl CodecTraits for TransposeCodec {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = TransposeCodecConfiguration {
            order: self.order.clone(),
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl ArrayToArrayCodecTraits for TransposeCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if decoded_value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                decoded_value.len(),
                decoded_representation.size(),
            ));
        }
        if self.order.order().len() != decoded_representation.dimensionality() {
            return Err(CodecError::Other(format!(
                "transpose order {:?} is incompatible with a chunk of dimensionality {}",
                self.order.order(),
                decoded_representation.dimensionality()
            )));
        }
        if self.order.is_identity() {
            return Ok(decoded_value);
        }
        transpose_array(
            &self.order,
            decoded_representation.shape(),
            decoded_representation.element_size(),
            &decoded_value,
        )
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                encoded_value.len(),
                decoded_representation.size(),
            ));
        }
        if self.order.order().len() != decoded_representation.dimensionality() {
            return Err(CodecError::Other(format!(
                "transpose order {:?} is incompatible with a chunk of dimensionality {}",
                self.order.order(),
                decoded_representation.dimensionality()
            )));
        }
        if self.order.is_identity() {
            return Ok(encoded_value);
        }
        // the inverse permutation is derived from the configured order
        let transposed_shape = permute(decoded_representation.shape(), &self.order);
        transpose_array(
            &self.order.inverse(),
            &transposed_shape,
            decoded_representation.element_size(),
            &encoded_value,
        )
    }

    fn encoded_representation(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> ChunkRepresentation {
        decoded_representation.with_shape(permute(decoded_representation.shape(), &self.order))
    }
}

#[cfg(test)]
mod tests {
    use crate::array::DataType;

    use super::*;

    const JSON_REVERSE: &str = r#"{ "order": [2, 1, 0] }"#;
    const JSON_PARTIAL: &str = r#"{ "order": [0, 2, 1] }"#;

    fn representation() -> ChunkRepresentation {
        ChunkRepresentation::new(
            vec![2, 2, 3],
            DataType::UInt8,
            DataType::UInt8.default_fill_value(),
        )
        .unwrap()
    }

    #[test]
    fn codec_transpose_configuration_invalid() {
        assert!(serde_json::from_str::<TransposeCodecConfiguration>(r#"{"order": [0]}"#).is_err());
        assert!(
            serde_json::from_str::<TransposeCodecConfiguration>(r#"{"order": [0, 0]}"#).is_err()
        );
        assert!(
            serde_json::from_str::<TransposeCodecConfiguration>(r#"{"order": [0, 2]}"#).is_err()
        );
        assert!(serde_json::from_str::<TransposeCodecConfiguration>(r#"{"order": [1, 0]}"#).is_ok());
    }

    fn codec_transpose_round_trip_impl(json: &str) {
        let representation = representation();
        let bytes: Vec<u8> = (0..representation.size()).map(|index| index as u8).collect();

        let configuration: TransposeCodecConfiguration = serde_json::from_str(json).unwrap();
        let codec = TransposeCodec::new(configuration.order);

        let encoded = codec.encode(bytes.clone(), &representation).unwrap();
        let decoded = codec.decode(encoded, &representation).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_transpose_round_trip_reverse() {
        codec_transpose_round_trip_impl(JSON_REVERSE);
    }

    #[test]
    fn codec_transpose_round_trip_partial() {
        codec_transpose_round_trip_impl(JSON_PARTIAL);
    }

    #[test]
    fn codec_transpose_encode_values() {
        // a 2x3 array [[0, 1, 2], [3, 4, 5]] transposed to [[0, 3], [1, 4], [2, 5]]
        let representation = ChunkRepresentation::new(
            vec![2, 3],
            DataType::UInt8,
            DataType::UInt8.default_fill_value(),
        )
        .unwrap();
        let codec = TransposeCodec::new_reverse(2).unwrap();
        let encoded = codec
            .encode(vec![0, 1, 2, 3, 4, 5], &representation)
            .unwrap();
        assert_eq!(encoded, vec![0, 3, 1, 4, 2, 5]);
        assert_eq!(
            codec.encoded_representation(&representation).shape(),
            &[3, 2]
        );
    }

    #[test]
    fn codec_transpose_identity_is_noop() {
        let representation = ChunkRepresentation::new(
            vec![2, 3],
            DataType::UInt8,
            DataType::UInt8.default_fill_value(),
        )
        .unwrap();
        let codec = TransposeCodec::new(TransposeOrder::new(&[0, 1]).unwrap());
        let bytes = vec![0, 1, 2, 3, 4, 5];
        assert_eq!(codec.encode(bytes.clone(), &representation).unwrap(), bytes);
    }

    #[test]
    fn codec_transpose_multi_byte_elements() {
        let representation = ChunkRepresentation::new(
            vec![2, 2],
            DataType::UInt16,
            DataType::UInt16.default_fill_value(),
        )
        .unwrap();
        let codec = TransposeCodec::new_reverse(2).unwrap();
        let elements: Vec<u16> = vec![1, 2, 3, 4];
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_ne_bytes()).collect();
        let encoded = codec.encode(bytes, &representation).unwrap();
        let transposed: Vec<u16> = encoded
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes(b.try_into().unwrap()))
            .collect();
        assert_eq!(transposed, vec![1, 3, 2, 4]);
    }
}
