//! A storage adapter which records performance metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::{
    BoundingBox, Bytes, InstanceMetadata, InstanceMetadataTraits, ReadableBlockStoreTraits,
    StorageError, WritableBlockStoreTraits,
};

/// The performance metrics storage adapter. Accumulates metrics, such as bytes read and written.
///
/// It is intended to aid in testing by allowing the application to validate that metrics (e.g., bytes read/written, total get/put requests) match expected values for specific operations.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use diced_storage::store::MemoryBlockStore;
/// # use diced_storage::storage_adapter::performance_metrics::PerformanceMetricsStorageAdapter;
/// let store = Arc::new(MemoryBlockStore::new());
/// let store = Arc::new(PerformanceMetricsStorageAdapter::new(store));
/// // do some store operations...
/// // assert_eq!(store.bytes_read(), ...);
/// // assert_eq!(store.bytes_written(), ...);
/// // assert_eq!(store.reads(), ...);
/// // assert_eq!(store.writes(), ...);
/// assert_eq!(store.max_request_volume(), 0);
/// ```
#[derive(Debug)]
pub struct PerformanceMetricsStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    bytes_read: AtomicUsize,
    bytes_written: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    max_request_volume: AtomicU64,
}

impl<TStorage: ?Sized> PerformanceMetricsStorageAdapter<TStorage> {
    /// Create a new performance metrics storage adapter.
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        Self {
            storage,
            bytes_read: AtomicUsize::default(),
            bytes_written: AtomicUsize::default(),
            reads: AtomicUsize::default(),
            writes: AtomicUsize::default(),
            max_request_volume: AtomicU64::default(),
        }
    }

    /// Reset the performance metrics.
    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.max_request_volume.store(0, Ordering::Relaxed);
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of get requests.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of put requests.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the largest number of elements in any get or put request.
    pub fn max_request_volume(&self) -> u64 {
        self.max_request_volume.load(Ordering::Relaxed)
    }

    fn record_request_volume(&self, shape: &[u64]) {
        self.max_request_volume
            .fetch_max(shape.iter().product(), Ordering::Relaxed);
    }
}

impl<TStorage: ?Sized + ReadableBlockStoreTraits> ReadableBlockStoreTraits
    for PerformanceMetricsStorageAdapter<TStorage>
{
    fn get(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        is_label: bool,
    ) -> Result<Bytes, StorageError> {
        let value = self.storage.get(instance, origin, shape, is_label);
        let bytes_read = value.as_ref().map_or(0, Bytes::len);
        self.bytes_read.fetch_add(bytes_read, Ordering::Relaxed);
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.record_request_volume(shape);
        value
    }

    fn bounding_box(&self, instance: &str) -> Result<BoundingBox, StorageError> {
        self.storage.bounding_box(instance)
    }
}

impl<TStorage: ?Sized + WritableBlockStoreTraits> WritableBlockStoreTraits
    for PerformanceMetricsStorageAdapter<TStorage>
{
    fn put(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        value: Bytes,
        is_label: bool,
    ) -> Result<(), StorageError> {
        self.bytes_written.fetch_add(value.len(), Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.record_request_volume(shape);
        self.storage.put(instance, origin, shape, value, is_label)
    }
}

impl<TStorage: ?Sized + InstanceMetadataTraits> InstanceMetadataTraits
    for PerformanceMetricsStorageAdapter<TStorage>
{
    fn instance_metadata(&self, instance: &str) -> Result<Option<InstanceMetadata>, StorageError> {
        self.storage.instance_metadata(instance)
    }
}
