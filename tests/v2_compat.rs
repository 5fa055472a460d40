#![allow(missing_docs)]

use std::sync::Arc;

use zarrio::array::{ChunkKeySeparator, DataType};
use zarrio::byte_range::ByteRange;
use zarrio::hierarchy::Dataset;
use zarrio::metadata::v2::ConsolidatedMetadataV2;
use zarrio::storage::{
    MaybeBytes, MemoryStore, StorageError, Store, StoreKey, StoreKeys, StoreKeysPrefixes,
    StorePrefix,
};

fn le_f64_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

#[test]
fn v2_hierarchy_open() {
    let storage = Arc::new(MemoryStore::new());
    storage
        .set(&".zgroup".try_into().unwrap(), br#"{"zarr_format": 2}"#)
        .unwrap();
    storage
        .set(&".zattrs".try_into().unwrap(), br#"{"source": "legacy"}"#)
        .unwrap();
    storage
        .set(
            &"temps/.zarray".try_into().unwrap(),
            br#"{
                "zarr_format": 2,
                "shape": [2, 2],
                "chunks": [2, 2],
                "dtype": "<f8",
                "compressor": null,
                "fill_value": "NaN",
                "order": "C",
                "filters": null
            }"#,
        )
        .unwrap();
    storage
        .set(
            &"temps/.zattrs".try_into().unwrap(),
            br#"{"units": "kelvin"}"#,
        )
        .unwrap();
    // v2 chunk keys are "."-joined with no "c" prefix
    storage
        .set(
            &"temps/0.0".try_into().unwrap(),
            &le_f64_bytes(&[273.15, 274.15, 275.15, 276.15]),
        )
        .unwrap();

    let dataset = Dataset::open(storage).unwrap();
    assert!(dataset.root().is_group());
    assert_eq!(
        dataset.root().as_group().unwrap().attributes()["source"],
        "legacy"
    );
    assert_eq!(dataset.array_paths(), vec!["/temps"]);

    let array = dataset.array("/temps").unwrap();
    assert_eq!(array.data_type(), &DataType::Float64);
    assert_eq!(array.shape(), &[2, 2]);
    assert_eq!(array.attributes()["units"], "kelvin");
    assert_eq!(
        array.chunk_key_encoding().separator(),
        ChunkKeySeparator::Dot
    );

    let values = array
        .retrieve_array_subset_elements::<f64>(
            &zarrio::array_subset::ArraySubset::new_with_shape(vec![2, 2]),
        )
        .unwrap();
    assert_eq!(values, vec![273.15, 274.15, 275.15, 276.15]);
}

#[test]
fn v2_unsupported_filters_abort_open() {
    let storage = Arc::new(MemoryStore::new());
    storage
        .set(&".zgroup".try_into().unwrap(), br#"{"zarr_format": 2}"#)
        .unwrap();
    storage
        .set(
            &"bad/.zarray".try_into().unwrap(),
            br#"{
                "zarr_format": 2,
                "shape": [4],
                "chunks": [4],
                "dtype": "<i4",
                "compressor": null,
                "fill_value": 0,
                "order": "C",
                "filters": [{"id": "delta"}]
            }"#,
        )
        .unwrap();
    assert!(Dataset::open(storage).is_err());
}

/// A store that can only fetch keys, mimicking the HTTP store: unlistable,
/// read-only, with consolidated metadata as the sole discovery mechanism.
#[derive(Debug)]
struct FetchOnlyStore {
    inner: MemoryStore,
}

impl Store for FetchOnlyStore {
    fn get(
        &self,
        key: &StoreKey,
        byte_range: Option<ByteRange>,
    ) -> Result<MaybeBytes, StorageError> {
        self.inner.get(key, byte_range)
    }

    fn set(&self, _key: &StoreKey, _value: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase(&self, _key: &StoreKey) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase_prefix(&self, _prefix: &StorePrefix) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn list_prefix(&self, _prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Err(StorageError::Unsupported("listing unsupported".to_string()))
    }

    fn list_dir(&self, _prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        Err(StorageError::Unsupported("listing unsupported".to_string()))
    }

    fn readonly(&self) -> bool {
        true
    }

    fn supports_listing(&self) -> bool {
        false
    }

    fn supports_consolidated_metadata(&self) -> bool {
        true
    }

    fn consolidated_metadata(&self) -> Result<Option<ConsolidatedMetadataV2>, StorageError> {
        let key: StoreKey = ".zmetadata".try_into().unwrap();
        match self.inner.get(&key, None)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| StorageError::InvalidMetadata(key, err.to_string())),
            None => Ok(None),
        }
    }
}

fn zarray_entry(shape: u64) -> String {
    format!(
        r#"{{
            "zarr_format": 2,
            "shape": [{shape}],
            "chunks": [{shape}],
            "dtype": "<f8",
            "compressor": null,
            "fill_value": "NaN",
            "order": "C",
            "filters": null
        }}"#
    )
}

#[test]
fn consolidated_metadata_open() {
    let inner = MemoryStore::new();
    let arrays = [
        "age_band_lower_bound",
        "demographic_totals",
        "latitude",
        "longitude",
        "year",
    ];
    let mut entries = vec![r#"".zgroup": {"zarr_format": 2}"#.to_string()];
    for name in arrays {
        entries.push(format!(r#""{name}/.zarray": {}"#, zarray_entry(720)));
    }
    let zmetadata = format!(
        r#"{{"zarr_consolidated_format": 1, "metadata": {{{}}}}}"#,
        entries.join(", ")
    );
    inner
        .set(&".zmetadata".try_into().unwrap(), zmetadata.as_bytes())
        .unwrap();

    // 90, 89.75, ..., -89.75
    let latitudes: Vec<f64> = (0..720).map(|index| 90.0 - 0.25 * f64::from(index)).collect();
    inner
        .set(&"latitude/0".try_into().unwrap(), &le_f64_bytes(&latitudes))
        .unwrap();

    let dataset = Dataset::open(Arc::new(FetchOnlyStore { inner })).unwrap();
    assert_eq!(
        dataset.array_paths(),
        vec![
            "/age_band_lower_bound",
            "/demographic_totals",
            "/latitude",
            "/longitude",
            "/year",
        ]
    );

    let latitude = dataset.array("/latitude").unwrap();
    assert_eq!(latitude.shape(), &[720]);
    assert_eq!(latitude.data_type(), &DataType::Float64);

    let values = latitude
        .retrieve_array_subset_elements::<f64>(
            &zarrio::array_subset::ArraySubset::new_with_shape(vec![720]),
        )
        .unwrap();
    assert_eq!(values.len(), 720);
    assert_eq!(values[0], 90.0);
    assert_eq!(values[719], -89.75);
    assert!(values
        .windows(2)
        .all(|pair| (pair[1] - pair[0] - (-0.25)).abs() < 1e-12));
}
