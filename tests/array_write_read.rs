#![allow(missing_docs)]

use std::sync::Arc;

use zarrio::array::{Array, ArrayError, ArrayMetadataBuilder, DataType};
use zarrio::array_subset::ArraySubset;
use zarrio::hierarchy::Dataset;
use zarrio::storage::{MemoryStore, Store};

/// The int32 fill value sentinel representing missing data.
const INT32_FILL: i32 = -2_147_483_647;

/// Populate values `1..=400` in column-major enumeration of shape `(5, 20, 4)`,
/// laid out in the row-major buffer the array APIs take.
fn column_major_values() -> Vec<i32> {
    let mut values = vec![0i32; 5 * 20 * 4];
    for k in 0..4usize {
        for j in 0..20usize {
            for i in 0..5usize {
                values[(i * 20 + j) * 4 + k] = i32::try_from(1 + i + j * 5 + k * 100).unwrap();
            }
        }
    }
    values
}

fn int32_dataset() -> Dataset {
    let mut dataset = Dataset::create_with_root_group(Arc::new(MemoryStore::new())).unwrap();
    let mut builder = ArrayMetadataBuilder::new();
    builder.data_type(DataType::Int32).shape(vec![5, 20, 4]);
    dataset.add_array("/", "my_array", &builder).unwrap();
    let array = dataset.array("/my_array").unwrap();
    array
        .store_array_subset_elements::<i32>(
            &ArraySubset::new_with_shape(vec![5, 20, 4]),
            &column_major_values(),
        )
        .unwrap();
    dataset
}

#[test]
fn full_round_trip_3d() {
    let dataset = int32_dataset();
    let array = dataset.array("/my_array").unwrap();

    let slab = array
        .retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_ranges(&[
            0..2,
            10..16,
            2..3,
        ]))
        .unwrap();
    assert_eq!(
        slab,
        vec![251, 256, 261, 266, 271, 276, 252, 257, 262, 267, 272, 277]
    );

    // reading everything back matches the write
    let all = array
        .retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_shape(vec![5, 20, 4]))
        .unwrap();
    assert_eq!(all, column_major_values());
}

#[test]
fn partial_write_with_recycling() {
    let dataset = int32_dataset();
    let array = dataset.array("/my_array").unwrap();

    // overwrite a 2x3 slab at rows 2..3, columns 5..7, slice 1 (one-indexed)
    array
        .store_array_subset_elements::<i32>(
            &ArraySubset::new_with_ranges(&[1..3, 4..7, 0..1]),
            &[-99; 6],
        )
        .unwrap();
    // erase the first column of slice 1 by writing the fill value
    array
        .store_array_subset_elements::<i32>(
            &ArraySubset::new_with_ranges(&[0..5, 0..1, 0..1]),
            &[INT32_FILL; 5],
        )
        .unwrap();

    let slab = array
        .retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_ranges(&[0..5, 0..10, 0..1]))
        .unwrap();
    for i in 0..5usize {
        for j in 0..10usize {
            let value = slab[i * 10 + j];
            if j == 0 {
                assert_eq!(value, INT32_FILL, "({i}, {j}) must be absent");
            } else if (1..3).contains(&i) && (4..7).contains(&j) {
                assert_eq!(value, -99, "({i}, {j}) must hold the overwrite");
            } else {
                assert_eq!(
                    value,
                    i32::try_from(1 + i + j * 5).unwrap(),
                    "({i}, {j}) must hold the initial population"
                );
            }
        }
    }
}

#[test]
fn sparse_chunk_never_materialized() {
    let storage = Arc::new(MemoryStore::new());
    let mut builder = ArrayMetadataBuilder::new();
    builder.data_type(DataType::Float64).shape(vec![5, 3]);
    let dataset =
        Dataset::create_with_root_array(storage.clone(), builder.metadata().unwrap()).unwrap();

    // only the metadata document exists
    assert_eq!(storage.len(), 1);
    assert!(storage.exists(&"zarr.json".try_into().unwrap()).unwrap());

    let array = dataset.root().as_array().unwrap();
    let fill = array
        .retrieve_array_subset_elements::<f64>(&ArraySubset::new_with_shape(vec![5, 3]))
        .unwrap();
    assert_eq!(fill.len(), 15);
    assert!(fill.iter().all(|&value| value == 9.969_209_968_386_869e36));
    assert_eq!(storage.len(), 1);
}

#[test]
fn all_fill_chunk_is_erased_on_flush() {
    let storage = Arc::new(MemoryStore::new());
    let mut builder = ArrayMetadataBuilder::new();
    builder.data_type(DataType::Float64).shape(vec![5, 3]);
    let dataset =
        Dataset::create_with_root_array(storage.clone(), builder.metadata().unwrap()).unwrap();
    let array = dataset.root().as_array().unwrap();

    let subset = ArraySubset::new_with_ranges(&[0..1, 0..1]);
    array
        .store_array_subset_elements::<f64>(&subset, &[1.5])
        .unwrap();
    assert_eq!(storage.len(), 2);

    // writing the fill value back erases the chunk key
    array
        .store_array_subset_elements::<f64>(&subset, &[9.969_209_968_386_869e36])
        .unwrap();
    assert_eq!(storage.len(), 1);
}

#[test]
fn multi_chunk_hyperslab() {
    let mut dataset = Dataset::create_with_root_group(Arc::new(MemoryStore::new())).unwrap();
    let mut builder = ArrayMetadataBuilder::new();
    builder.data_type(DataType::UInt16).shape(vec![7, 9]);
    builder.chunk_shape(vec![3, 4]).unwrap();
    dataset.add_array("/", "tiled", &builder).unwrap();
    let array = dataset.array("/tiled").unwrap();

    let values: Vec<u16> = (0..63).collect();
    array
        .store_array_subset_elements::<u16>(&ArraySubset::new_with_shape(vec![7, 9]), &values)
        .unwrap();

    // a subset straddling four chunks
    let slab = array
        .retrieve_array_subset_elements::<u16>(&ArraySubset::new_with_ranges(&[2..5, 3..6]))
        .unwrap();
    assert_eq!(slab, vec![21, 22, 23, 30, 31, 32, 39, 40, 41]);

    // writes to a chunk interior leave the rest of the chunk intact
    array
        .store_array_subset_elements::<u16>(&ArraySubset::new_with_ranges(&[4..5, 4..5]), &[999])
        .unwrap();
    let slab = array
        .retrieve_array_subset_elements::<u16>(&ArraySubset::new_with_ranges(&[3..6, 4..5]))
        .unwrap();
    assert_eq!(slab, vec![31, 999, 49]);
}

#[test]
fn array_errors() {
    let dataset = int32_dataset();
    let array: &Array = dataset.array("/my_array").unwrap();

    assert!(matches!(
        array.retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_ranges(&[
            0..6,
            0..1,
            0..1
        ])),
        Err(ArrayError::InvalidArraySubset(_, _))
    ));
    assert!(matches!(
        array.retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_ranges(&[0..1, 0..1])),
        Err(ArrayError::InvalidArraySubset(_, _))
    ));
    assert!(matches!(
        array.retrieve_array_subset_elements::<f32>(&ArraySubset::new_with_ranges(&[
            0..1,
            0..1,
            0..1
        ])),
        Err(ArrayError::IncompatibleElementType(_, _))
    ));
    assert!(matches!(
        array.store_array_subset_elements::<i32>(
            &ArraySubset::new_with_ranges(&[0..1, 0..1, 0..1]),
            &[1, 2]
        ),
        Err(ArrayError::InvalidElementsLength(2, 1))
    ));
    assert!(matches!(
        array.retrieve_chunk(&[1, 0, 0]),
        Err(ArrayError::InvalidChunkIndices(_, _))
    ));
}

#[test]
fn read_after_write_same_dataset() {
    let dataset = int32_dataset();
    let array = dataset.array("/my_array").unwrap();
    let subset = ArraySubset::new_with_ranges(&[4..5, 19..20, 3..4]);
    array
        .store_array_subset_elements::<i32>(&subset, &[12345])
        .unwrap();
    assert_eq!(
        array.retrieve_array_subset_elements::<i32>(&subset).unwrap(),
        vec![12345]
    );
}
