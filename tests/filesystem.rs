#![allow(missing_docs)]

use std::sync::Arc;

use zarrio::array::{ArrayMetadataBuilder, ChunkKeySeparator, DataType};
use zarrio::array_subset::ArraySubset;
use zarrio::hierarchy::Dataset;
use zarrio::storage::{FilesystemStore, Store};

#[test]
fn filesystem_dataset_round_trip() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(FilesystemStore::new(tempdir.path()).unwrap());
    assert_eq!(storage.separator(), ChunkKeySeparator::Slash);

    {
        let mut dataset = Dataset::create_with_root_group(storage.clone()).unwrap();
        dataset.add_group("/", "measurements").unwrap();
        let mut builder = ArrayMetadataBuilder::new();
        builder.data_type(DataType::Float32).shape(vec![6, 6]);
        builder.chunk_shape(vec![4, 4]).unwrap();
        dataset
            .add_array("/measurements", "grid", &builder)
            .unwrap();
        let array = dataset.array("/measurements/grid").unwrap();
        let values: Vec<f32> = (0..36).map(|index| index as f32 / 2.0).collect();
        array
            .store_array_subset_elements::<f32>(&ArraySubset::new_with_shape(vec![6, 6]), &values)
            .unwrap();
    }

    // metadata documents and chunks land at the expected paths
    assert!(tempdir.path().join("zarr.json").is_file());
    assert!(tempdir.path().join("measurements/zarr.json").is_file());
    assert!(tempdir.path().join("measurements/grid/zarr.json").is_file());
    assert!(tempdir.path().join("measurements/grid/c/0/0").is_file());
    assert!(tempdir.path().join("measurements/grid/c/1/1").is_file());

    let reopened = Dataset::open(Arc::new(FilesystemStore::new(tempdir.path()).unwrap())).unwrap();
    assert_eq!(reopened.array_paths(), vec!["/measurements/grid"]);
    let array = reopened.array("/measurements/grid").unwrap();
    let slab = array
        .retrieve_array_subset_elements::<f32>(&ArraySubset::new_with_ranges(&[3..5, 3..5]))
        .unwrap();
    assert_eq!(slab, vec![10.5, 11.0, 13.5, 14.0]);
}

#[test]
fn filesystem_sparse_chunks() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(FilesystemStore::new(tempdir.path()).unwrap());
    let mut dataset = Dataset::create_with_root_group(storage).unwrap();
    let mut builder = ArrayMetadataBuilder::new();
    builder.data_type(DataType::Int16).shape(vec![4, 4]);
    dataset.add_array("/", "sparse", &builder).unwrap();
    let array = dataset.array("/sparse").unwrap();

    let chunk = tempdir.path().join("sparse/c/0/0");
    assert!(!chunk.exists());

    let subset = ArraySubset::new_with_ranges(&[0..1, 0..1]);
    array
        .store_array_subset_elements::<i16>(&subset, &[7])
        .unwrap();
    assert!(chunk.is_file());

    // writing the fill value back erases the chunk file
    array
        .store_array_subset_elements::<i16>(&subset, &[-32767])
        .unwrap();
    assert!(!chunk.exists());
}

#[test]
fn filesystem_deletion() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(FilesystemStore::new(tempdir.path()).unwrap());
    let mut dataset = Dataset::create_with_root_group(storage).unwrap();
    dataset.add_group("/", "a").unwrap();
    dataset.add_group("/a", "b").unwrap();

    assert!(matches!(
        dataset.delete("/a"),
        Err(zarrio::hierarchy::DatasetError::GroupNotEmpty(_))
    ));
    dataset.delete_group("/a", true).unwrap();
    assert!(!tempdir.path().join("a").exists());
    assert!(tempdir.path().join("zarr.json").is_file());
}
