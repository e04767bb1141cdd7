#![allow(missing_docs)]
#![cfg(feature = "ndarray")]

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use diced::array::{Array, ArrayBuilder, ArrayBytes, ArrayError, Region, Tensor};
use diced::data_type::DataType;
use diced::storage::storage_adapter::performance_metrics::PerformanceMetricsStorageAdapter;
use diced::storage::store::MemoryBlockStore;
use diced::storage::{
    BoundingBox, Bytes, InstanceMetadata, InstanceMetadataTraits, ReadableBlockStoreTraits,
    StorageError, WritableBlockStoreTraits,
};

fn create_instance(
    store: &MemoryBlockStore,
    instance: &str,
    data_type: DataType,
    block_shape: Vec<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = ArrayBuilder::new(data_type);
    builder
        .dimensionality(block_shape.len())
        .block_shape(block_shape);
    store.create_instance(instance, builder.build_metadata()?)?;
    Ok(())
}

fn cap(max_transfer_volume: u64) -> NonZeroU64 {
    NonZeroU64::new(max_transfer_volume).unwrap()
}

#[test]
fn array_sync_tiling_transparency() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![8, 8, 8])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store.clone()));
    let mut array = Array::open(metrics.clone(), "grayscale")?;

    let data: Vec<u8> = (0..24 * 10 * 27).map(|i| (i % 251) as u8).collect();
    array.store(&(-5..19, 1..11, 3..30), data.clone())?;

    array.set_max_transfer_volume(cap(1000));
    metrics.reset();
    let tiled_a = array.retrieve::<Vec<u8>, _>(&(-8..24, 0..16, 0..32))?;
    assert!(metrics.reads() > 1);
    assert!(metrics.max_request_volume() <= 1000);

    array.set_max_transfer_volume(cap(7));
    metrics.reset();
    let tiled_b = array.retrieve::<Vec<u8>, _>(&(-8..24, 0..16, 0..32))?;
    assert!(metrics.max_request_volume() <= 7);
    assert_eq!(tiled_a, tiled_b);
    assert_eq!(array.retrieve::<Vec<u8>, _>(&(-5..19, 1..11, 3..30))?, data);

    array.set_max_transfer_volume(cap(1_000_000));
    metrics.reset();
    assert_eq!(array.retrieve::<Vec<u8>, _>(&(-8..24, 0..16, 0..32))?, tiled_a);
    assert_eq!(metrics.reads(), 1);
    Ok(())
}

#[test]
fn array_sync_tiled_store() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    let data: Vec<u16> = (0..24 * 10 * 27).map(|i| (i * 7) as u16).collect();
    create_instance(&store, "reference", DataType::UInt16, vec![8, 8, 8])?;
    let reference = Array::open(store.clone(), "reference")?;
    reference.store(&(-5..19, 1..11, 3..30), data.clone())?;
    let expected = reference.retrieve::<Vec<u16>, _>(&(-8..24, 0..16, 0..32))?;

    for max_transfer_volume in [512, 4096] {
        let instance = format!("tiled_{max_transfer_volume}");
        create_instance(&store, &instance, DataType::UInt16, vec![8, 8, 8])?;
        let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store.clone()));
        let mut array = Array::open(metrics.clone(), &instance)?;
        array.set_max_transfer_volume(cap(max_transfer_volume));
        array.store(&(-5..19, 1..11, 3..30), data.clone())?;
        assert!(metrics.writes() > 1);
        assert!(metrics.max_request_volume() <= max_transfer_volume);
        assert_eq!(
            array.retrieve::<Vec<u16>, _>(&(-8..24, 0..16, 0..32))?,
            expected
        );
    }
    Ok(())
}

#[test]
fn array_sync_tiled_store_aligned() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt32, vec![8, 8, 8])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store.clone()));
    let mut array = Array::open(metrics.clone(), "grayscale")?;
    array.set_max_transfer_volume(cap(1024)).set_concurrent_target(4);

    // Tiles fall on the block grid, so no tile needs a merge
    let data: Vec<u32> = (0..32 * 16 * 16).collect();
    array.store(&(0..32, -16..0, 0..16), data.clone())?;
    assert_eq!(metrics.reads(), 0);
    assert_eq!(metrics.writes(), 8);
    assert!(metrics.max_request_volume() <= 1024);
    assert_eq!(store.num_blocks("grayscale")?, 16);
    assert_eq!(array.retrieve::<Vec<u32>, _>(&(0..32, -16..0, 0..16))?, data);
    Ok(())
}

#[test]
fn array_sync_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "image", DataType::UInt16, vec![4, 4])?;
    let array = Array::open(store.clone(), "image")?;

    // Aligned
    let aligned = ndarray::Array2::<u16>::from_shape_fn((8, 8), |(i, j)| (i * 8 + j) as u16);
    array.store(&(0..8, -4..4), aligned.clone())?;
    assert_eq!(
        array.retrieve::<ndarray::Array2<u16>, _>(&(0..8, -4..4))?,
        aligned
    );

    // Unaligned
    let unaligned: Vec<u16> = (100..130).collect();
    array.store(&(1..7, -3..2), &unaligned)?;
    assert_eq!(array.retrieve::<Vec<u16>, _>(&(1..7, -3..2))?, unaligned);

    // Unaligned, spanning blocks never written
    let region = Region::new_with_ranges(&[7..13, 2..3])?;
    let tensor = Tensor::new(vec![1u8; 12], DataType::UInt16, vec![6, 1]);
    array.store_region(&region, &tensor)?;
    assert_eq!(array.retrieve_region::<Tensor>(&region)?, tensor);
    assert_eq!(
        array.retrieve_region::<ArrayBytes>(&region)?,
        vec![1u8; 12].into()
    );

    // Empty
    array.store(&(3..3, 0..4), Vec::<u16>::new())?;
    assert!(array.retrieve::<Vec<u16>, _>(&(3..3, 0..4))?.is_empty());
    Ok(())
}

#[test]
fn array_sync_unaligned_store_preserves_neighbours() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt32, vec![4, 4, 4])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));
    let array = Array::open(metrics.clone(), "grayscale")?;

    array.store(&(0..4, 0..4, 0..4), vec![1u32; 64])?;
    metrics.reset();
    array.store(&(1..3, 2..3, 0..2), vec![9u32; 4])?;
    assert_eq!(metrics.reads(), 1);
    assert_eq!(metrics.writes(), 1);
    assert_eq!(metrics.max_request_volume(), 64);

    let block: ndarray::Array3<u32> = array.retrieve(&(0..4, 0..4, 0..4))?;
    for ((z, y, x), &value) in block.indexed_iter() {
        let written = (1..3).contains(&z) && y == 2 && x < 2;
        assert_eq!(value, if written { 9 } else { 1 }, "element ({z}, {y}, {x})");
    }
    Ok(())
}

#[test]
fn array_sync_squeeze() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    let mut builder = ArrayBuilder::new(DataType::UInt64);
    builder.label(true).block_shape(vec![8, 8, 8]);
    store.create_instance("segmentation", builder.build_metadata()?)?;
    let array = Array::open(store, "segmentation")?;
    assert!(array.is_label());

    let data: Vec<u64> = (0..4 * 5 * 6).collect();
    array.store(&(0..4, 0..5, 0..6), data.clone())?;

    let full: ndarray::ArrayD<u64> = array.retrieve(&(0..4, 0..5, 0..6))?;
    assert_eq!(full.shape(), &[4, 5, 6]);
    assert_eq!(full.into_raw_vec_and_offset().0, data);

    let plane: ndarray::ArrayD<u64> = array.retrieve(&(2, 0..5, 0..6))?;
    assert_eq!(plane.shape(), &[5, 6]);
    assert_eq!(plane[[3, 4]], 82);

    let row: ndarray::ArrayD<u64> = array.retrieve(&(2, 3, 0..6))?;
    assert_eq!(row.shape(), &[6]);
    assert_eq!(
        row.iter().copied().collect::<Vec<_>>(),
        vec![78, 79, 80, 81, 82, 83]
    );

    let column: Vec<u64> = array.retrieve(&(0..4, 1, 2))?;
    assert_eq!(column, vec![8, 38, 68, 98]);

    let element: u64 = array.retrieve(&(2, 3, 4))?;
    assert_eq!(element, 82);
    assert_eq!(array.retrieve::<Vec<u64>, _>(&(2, 3, 4))?, vec![82]);
    let scalar: ndarray::ArrayD<u64> = array.retrieve(&(2, 3, 4))?;
    assert_eq!(scalar.shape(), &[] as &[usize]);

    assert!(matches!(
        array.retrieve::<u64, _>(&(2, 3, 0..6)),
        Err(ArrayError::NotAScalar(shape)) if shape == vec![6]
    ));
    assert!(matches!(
        array.retrieve::<u64, _>(&(2, 3, 4..5)),
        Err(ArrayError::NotAScalar(_))
    ));

    // Squeezed and full shapes are both accepted for shaped data
    array.store(&(3, 0..2, 0..2), ndarray::array![[1u64, 2], [3, 4]])?;
    array.store(&(3, 2..4, 0..2), ndarray::array![[[5u64, 6], [7, 8]]])?;
    array.store(&(3, 4, 5), 99u64)?;
    assert_eq!(
        array.retrieve::<Vec<u64>, _>(&(3, 0..4, 0..2))?,
        vec![1, 2, 3, 4, 5, 6, 7, 8]
    );
    assert_eq!(array.retrieve::<u64, _>(&(3, 4, 5))?, 99);
    assert!(matches!(
        array.store(&(3, 0..2, 0..2), ndarray::array![[1u64, 2, 3, 4]]),
        Err(ArrayError::InvalidDataShape(_, _))
    ));
    Ok(())
}

#[test]
fn array_sync_extent() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());

    create_instance(&store, "volume", DataType::UInt8, vec![64, 64, 64])?;
    let array = Array::open(store.clone(), "volume")?;
    assert_eq!(array.extent()?.to_ranges(), vec![0..0, 0..0, 0..0]);
    array.store(&(1..401, 2..202, 3..103), vec![1u8; 400 * 200 * 100])?;
    assert_eq!(array.extent()?.to_ranges(), vec![0..448, 0..256, 0..128]);

    let mut builder = ArrayBuilder::new(DataType::UInt8);
    builder.dimensionality(2);
    store.create_instance("image", builder.build_metadata()?)?;
    let array = Array::open(store.clone(), "image")?;
    assert_eq!(array.extent()?.to_ranges(), vec![0..0, 0..0]);
    array.store(&(0, 600), 5u8)?;
    assert_eq!(array.extent()?.to_ranges(), vec![0..512, 512..1024]);

    let mut builder = ArrayBuilder::new(DataType::UInt16);
    builder.dimensionality(1);
    store.create_instance("series", builder.build_metadata()?)?;
    let array = Array::open(store, "series")?;
    array.store(&(-1..1), vec![1u16, 2])?;
    assert_eq!(array.extent()?.to_ranges(), vec![-262_144..262_144]);
    assert_eq!(array.retrieve::<Vec<u16>, _>(&(-2..2))?, vec![0, 1, 2, 0]);
    Ok(())
}

#[test]
fn array_sync_negative_coordinates() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![64, 64, 64])?;
    let array = Array::open(store, "grayscale")?;

    array.store(&(-3, -1, 3..5), vec![7u8, 8])?;
    assert_eq!(array.retrieve::<u8, _>(&(-3, -1, 4))?, 8);
    assert_eq!(array.retrieve::<Vec<u8>, _>(&(-3, -1, 3..5))?, vec![7, 8]);
    assert_eq!(array.retrieve::<Vec<u8>, _>(&(-4..-2, -1, 3))?, vec![0, 7]);
    assert_eq!(
        array.extent()?.to_ranges(),
        vec![-64..0, -64..0, 0..64]
    );
    Ok(())
}

#[test]
fn array_sync_dimension_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "volume", DataType::UInt8, vec![8, 8, 8])?;
    create_instance(&store, "image", DataType::UInt8, vec![8, 8])?;
    create_instance(&store, "series", DataType::UInt8, vec![8])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));

    let volume = Array::open(metrics.clone(), "volume")?;
    assert!(matches!(
        volume.retrieve::<Vec<u8>, _>(&(0, 5)),
        Err(ArrayError::DimensionMismatch(_))
    ));
    assert!(matches!(
        volume.store(&(0, 5), vec![0u8]),
        Err(ArrayError::DimensionMismatch(_))
    ));
    assert!(matches!(
        volume.retrieve_region::<Vec<u8>>(&Region::new_with_ranges(&[0..1, 0..1])?),
        Err(ArrayError::DimensionMismatch(_))
    ));

    let image = Array::open(metrics.clone(), "image")?;
    assert!(matches!(
        image.retrieve::<Vec<u8>, _>(&0),
        Err(ArrayError::DimensionMismatch(_))
    ));

    let series = Array::open(metrics.clone(), "series")?;
    assert!(matches!(
        series.retrieve::<Vec<u8>, _>(&(0..3, 0..3)),
        Err(ArrayError::DimensionMismatch(_))
    ));
    let (start, stop) = (5, 2);
    assert!(matches!(
        series.retrieve::<Vec<u8>, _>(&(start..stop)),
        Err(ArrayError::InvalidSpan(span)) if span == (5..2)
    ));

    assert_eq!(metrics.reads(), 0);
    assert_eq!(metrics.writes(), 0);
    Ok(())
}

#[test]
fn array_sync_coordinate_overflow() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "volume", DataType::UInt8, vec![8, 8, 8])?;
    create_instance(&store, "series", DataType::UInt8, vec![8])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));

    let series = Array::open(metrics.clone(), "series")?;
    assert!(matches!(
        series.retrieve::<u8, _>(&i64::MAX),
        Err(ArrayError::RegionError(_))
    ));
    assert!(matches!(
        series.store(&i64::MAX, 1u8),
        Err(ArrayError::RegionError(_))
    ));
    // The enclosing block ends past i64::MAX
    assert!(matches!(
        series.store(&(i64::MAX - 4..i64::MAX), vec![1u8; 4]),
        Err(ArrayError::RegionError(_))
    ));

    let volume = Array::open(metrics.clone(), "volume")?;
    assert!(matches!(
        volume.retrieve::<Vec<u8>, _>(&(0..i64::MAX, 0..i64::MAX, 0..2)),
        Err(ArrayError::RegionError(_))
    ));

    assert_eq!(metrics.reads(), 0);
    assert_eq!(metrics.writes(), 0);
    Ok(())
}

#[test]
fn array_sync_read_only() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "locked", DataType::UInt8, vec![4, 4, 4])?;
    create_instance(&store, "unlocked", DataType::UInt8, vec![4, 4, 4])?;
    store.lock_instance("locked")?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));

    let array = Array::open(metrics.clone(), "locked")?;
    assert!(!array.is_writable());
    assert!(matches!(
        array.store(&(0..4, 0..4, 0..4), vec![1u8; 64]),
        Err(ArrayError::ReadOnlyArray(instance)) if instance == "locked"
    ));
    assert!(matches!(
        array.store(&(0, 0, 0), 1u8),
        Err(ArrayError::ReadOnlyArray(_))
    ));
    assert_eq!(metrics.reads(), 0);
    assert_eq!(metrics.writes(), 0);

    // Reads are still permitted
    assert_eq!(array.retrieve::<u8, _>(&(0, 0, 0))?, 0);

    let array = Array::open(metrics.clone(), "unlocked")?;
    array.store(&(0, 0, 0), 1u8)?;
    array.lock();
    metrics.reset();
    assert!(matches!(
        array.store_region(&Region::new_with_shape(vec![4, 4, 4]), vec![1u8; 64]),
        Err(ArrayError::ReadOnlyArray(_))
    ));
    assert_eq!(metrics.reads(), 0);
    assert_eq!(metrics.writes(), 0);
    Ok(())
}

#[test]
fn array_sync_type_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![4, 4, 4])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));
    let array = Array::open(metrics.clone(), "grayscale")?;

    assert!(matches!(
        array.store(&(0..2, 0..2, 0..2), vec![1u64; 8]),
        Err(ArrayError::TypeMismatch(DataType::UInt8))
    ));
    assert!(matches!(
        array.store(&(0, 0, 0), 1u16),
        Err(ArrayError::TypeMismatch(DataType::UInt8))
    ));
    assert!(matches!(
        array.store(
            &(0..2, 0, 0),
            Tensor::new(vec![0u8; 4], DataType::UInt16, vec![2])
        ),
        Err(ArrayError::TypeMismatch(DataType::UInt8))
    ));
    assert_eq!(metrics.writes(), 0);

    assert!(matches!(
        array.retrieve::<Vec<u16>, _>(&(0..2, 0..2, 0..2)),
        Err(ArrayError::TypeMismatch(DataType::UInt8))
    ));
    assert!(matches!(
        array.retrieve::<u64, _>(&(0, 0, 0)),
        Err(ArrayError::TypeMismatch(DataType::UInt8))
    ));

    // Raw bytes are only checked for their length
    assert!(matches!(
        array.store(&(0..2, 0..2, 0..2), ArrayBytes::from(vec![0u8; 7])),
        Err(ArrayError::InvalidBytesInputSize(7, 8))
    ));
    array.store(&(0..2, 0..2, 0..2), ArrayBytes::from(vec![2u8; 8]))?;
    assert_eq!(array.retrieve::<u8, _>(&(1, 1, 1))?, 2);
    Ok(())
}

#[test]
fn array_sync_transfer_volume_too_small() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![8, 8, 8])?;
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(store));
    let mut array = Array::open(metrics.clone(), "grayscale")?;
    array.set_max_transfer_volume(cap(100));

    assert!(matches!(
        array.store(&(0, 0, 0), 1u8),
        Err(ArrayError::TransferVolumeTooSmall {
            max_volume: 100,
            min_volume: 512
        })
    ));
    assert_eq!(metrics.writes(), 0);

    // Reads are not constrained by the block grid
    assert_eq!(array.retrieve::<Vec<u8>, _>(&(0..8, 0..8, 0..8))?, vec![0; 512]);
    assert!(metrics.max_request_volume() <= 100);
    Ok(())
}

/// A block store that fails a put at a single origin.
struct FailingBlockStore {
    storage: Arc<MemoryBlockStore>,
    fail_origin: Vec<i64>,
}

impl ReadableBlockStoreTraits for FailingBlockStore {
    fn get(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        is_label: bool,
    ) -> Result<Bytes, StorageError> {
        self.storage.get(instance, origin, shape, is_label)
    }

    fn bounding_box(&self, _instance: &str) -> Result<BoundingBox, StorageError> {
        Err(StorageError::Other("bounding box unavailable".to_string()))
    }
}

impl WritableBlockStoreTraits for FailingBlockStore {
    fn put(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        value: Bytes,
        is_label: bool,
    ) -> Result<(), StorageError> {
        if origin == self.fail_origin.as_slice() {
            Err(StorageError::Other("connection reset".to_string()))
        } else {
            self.storage.put(instance, origin, shape, value, is_label)
        }
    }
}

impl InstanceMetadataTraits for FailingBlockStore {
    fn instance_metadata(&self, instance: &str) -> Result<Option<InstanceMetadata>, StorageError> {
        self.storage.instance_metadata(instance)
    }
}

#[test]
fn array_sync_remote_store_failure() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![8, 8, 8])?;
    let failing = Arc::new(FailingBlockStore {
        storage: store.clone(),
        fail_origin: vec![16, 0, 0],
    });
    let mut array = Array::open(failing, "grayscale")?;
    array.set_max_transfer_volume(cap(512));

    // Tiles along the first axis are 4..8, 8..12, 12..16 and 16..20, stored in order
    let result = array.store(&(4..20, 0..8, 0..8), vec![3u8; 16 * 8 * 8]);
    match result {
        Err(ArrayError::RemoteStoreFailure {
            origin,
            shape,
            source,
        }) => {
            assert_eq!(origin, vec![16, 0, 0]);
            assert_eq!(shape, vec![8, 8, 8]);
            assert_eq!(source.to_string(), "connection reset");
        }
        result => panic!("expected a remote store failure, got {result:?}"),
    }

    // Earlier tiles are committed
    let committed = Array::open(store, "grayscale")?;
    assert_eq!(
        committed.retrieve::<Vec<u8>, _>(&(4..16, 0..8, 0..8))?,
        vec![3u8; 12 * 8 * 8]
    );
    assert_eq!(
        committed.retrieve::<Vec<u8>, _>(&(16..20, 0..8, 0..8))?,
        vec![0u8; 4 * 8 * 8]
    );
    Ok(())
}

#[test]
fn array_sync_extent_failure() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![8, 8, 8])?;
    let failing = Arc::new(FailingBlockStore {
        storage: store,
        fail_origin: vec![],
    });
    let array = Array::open(failing, "grayscale")?;
    match array.extent() {
        Err(ArrayError::StorageError(err)) => {
            assert_eq!(err.to_string(), "bounding box unavailable");
        }
        result => panic!("expected a storage error, got {result:?}"),
    }
    Ok(())
}

#[test]
fn array_sync_remote_read_failure() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryBlockStore::new_with_max_transfer_volume(cap(64)));
    create_instance(&store, "grayscale", DataType::UInt8, vec![4, 4, 4])?;
    let array = Array::open(store, "grayscale")?;

    // The array cap exceeds the store cap
    let result = array.retrieve::<Vec<u8>, _>(&(0..8, 0..8, 0..8));
    assert!(matches!(
        result,
        Err(ArrayError::RemoteStoreFailure {
            source: StorageError::TransferTooLarge { .. },
            ..
        })
    ));
    Ok(())
}

#[test]
fn array_sync_logging() -> Result<(), Box<dyn std::error::Error>> {
    testing_logger::setup();
    let store = Arc::new(MemoryBlockStore::new());
    create_instance(&store, "grayscale", DataType::UInt8, vec![8, 8, 8])?;
    let mut array = Array::open(store, "grayscale")?;
    array.set_max_transfer_volume(cap(512));
    array.store(&(4..20, 0..8, 0..8), vec![3u8; 16 * 8 * 8])?;

    testing_logger::validate(|captured_logs| {
        assert!(captured_logs.iter().any(|log| {
            log.level == log::Level::Debug
                && log.body == "store [4..20, 0..8, 0..8] to grayscale: 4 tiles with increments [4, 8, 8]"
        }));
        assert!(captured_logs
            .iter()
            .any(|log| log.body.ends_with("tiles share blocks, storing serially")));
        assert!(captured_logs
            .iter()
            .any(|log| log.level == log::Level::Trace && log.body.contains("merging into block-aligned")));
    });
    Ok(())
}

fn random_region(rng: &mut StdRng, dimensionality: usize) -> Result<Region, Box<dyn std::error::Error>> {
    let ranges: Vec<_> = (0..dimensionality)
        .map(|_| {
            let start = rng.random_range(-20..20);
            start..start + rng.random_range(0..12)
        })
        .collect();
    Ok(Region::new_with_ranges(&ranges)?)
}

/// The indices of the elements of `region` in C-contiguous order.
fn region_indices(region: &Region) -> Vec<Vec<i64>> {
    let mut indices = vec![vec![]];
    for range in region.to_ranges() {
        indices = indices
            .into_iter()
            .flat_map(|prefix| {
                range.clone().map(move |index| {
                    let mut indices = prefix.clone();
                    indices.push(index);
                    indices
                })
            })
            .collect();
    }
    indices
}

#[test]
fn array_sync_random_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(0x00d1_ced0);
    for case in 0..100 {
        let dimensionality = rng.random_range(1..=3);
        let block_shape: Vec<u64> = (0..dimensionality)
            .map(|_| rng.random_range(1..=6))
            .collect();
        let block_volume: u64 = block_shape.iter().product();

        let store = Arc::new(MemoryBlockStore::new());
        let instance = format!("random{case}");
        create_instance(&store, &instance, DataType::UInt16, block_shape)?;
        let mut array = Array::open(store, &instance)?;
        array
            .set_max_transfer_volume(cap(rng.random_range(block_volume..=block_volume * 16)))
            .set_concurrent_target(rng.random_range(1..=4));

        let mut model: HashMap<Vec<i64>, u16> = HashMap::new();
        for _ in 0..3 {
            let region = random_region(&mut rng, dimensionality)?;
            let indices = region_indices(&region);
            let elements: Vec<u16> = indices.iter().map(|_| rng.random()).collect();
            array.store_region(&region, &elements)?;
            model.extend(indices.into_iter().zip(elements));
        }

        let region = random_region(&mut rng, dimensionality)?;
        let expected: Vec<u16> = region_indices(&region)
            .iter()
            .map(|indices| model.get(indices).copied().unwrap_or_default())
            .collect();
        let elements = array.retrieve_region::<Vec<u16>>(&region)?;
        assert_eq!(elements, expected, "case {case}: {region}");

        array.set_max_transfer_volume(cap(rng.random_range(1..=8)));
        let elements = array.retrieve_region::<Vec<u16>>(&region)?;
        assert_eq!(elements, expected, "case {case}: {region} with a small cap");
    }
    Ok(())
}
