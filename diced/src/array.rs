//! Arrays.
//!
//! An [`Array`] is a handle to a 1D, 2D or 3D array instance held in a block store.
//!
//! An array instance has immutable properties fixed at creation:
//!  - **dimensionality**: the number of axes (1, 2 or 3),
//!  - **data type**: the element type (`uint8`, `uint16`, `uint32` or `uint64`),
//!  - **label variant**: whether the instance holds discrete labels (always `uint64` and 3D), and
//!  - **block shape**: the shape of the blocks the store persists, e.g. 64x64x64 for 3D.
//!
//! The documentation for [`Array`] details how to interact with arrays.

mod array_builder;
mod array_bytes;
mod array_errors;
mod array_sync_readable;
mod array_sync_readable_writable;
mod element;
mod from_array_bytes;
mod into_array_bytes;
mod tensor;

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use diced_data_type::DataType;
pub use diced_region::{
    ArrayIndices, ArrayShape, AxisIndex, BlockShape, IncompatibleDimensionalityError,
    IndexExpression, Region,
};
use diced_storage::{InstanceMetadata, InstanceMetadataTraits};

pub use self::array_builder::ArrayBuilder;
pub use self::array_bytes::ArrayBytes;
pub use self::array_errors::{ArrayCreateError, ArrayError};
pub use self::element::{Element, ElementError, ElementOwned};
pub use self::from_array_bytes::FromArrayBytes;
pub use self::into_array_bytes::IntoArrayBytes;
pub use self::tensor::Tensor;
use crate::config::global_config;

/// A handle to an array instance held in a block store.
///
/// ## Initialisation
/// A handle to an *existing* instance is created with [`Array::open`], which resolves the instance metadata from the store once.
/// A handle can also be created directly from [`InstanceMetadata`] with [`Array::new_with_metadata`], or with an [`ArrayBuilder`].
///
/// Creating an instance in a store is the responsibility of the store.
/// [`ArrayBuilder::build_metadata`] produces metadata suitable for instance creation.
///
/// ## Array Data
/// Array operations are divided into several categories based on the traits implemented for the backing [storage](crate::storage).
///  - [`ReadableBlockStoreTraits`](crate::storage::ReadableBlockStoreTraits): read array data
///    - [`retrieve`](Array::retrieve)
///    - [`retrieve_region`](Array::retrieve_region)
///    - [`extent`](Array::extent)
///  - [`ReadableWritableBlockStoreTraits`](crate::storage::ReadableWritableBlockStoreTraits): write array data
///    - [`store`](Array::store)
///    - [`store_region`](Array::store_region)
///
/// Index expressions are per-axis points or spans, e.g. `(-3, -1, 3..5)`.
/// An axis indexed with a point is collapsed (squeezed) out of a retrieved result.
/// If every axis is collapsed, the result is a single element.
///
/// Array `retrieve` methods are generic over the return type:
/// - Raw bytes: [`ArrayBytes`]
/// - Typed elements: `Vec<T>` where `T: Element`
/// - A single typed element: `T` where `T: Element`, if every axis is collapsed
/// - `ndarray` variants: `ndarray::ArrayD<T>` where `T: Element` (requires `ndarray` feature)
/// - [`Tensor`]: bytes with a data type and shape
///
/// Similarly, array `store` methods are generic over the input type.
///
/// ## Request Tiling
/// A block store bounds the number of elements in a single request by a maximum transfer volume.
/// Requests exceeding the maximum transfer volume are split into tiles.
/// Tile increments start at the region shape and the largest increment is halved (rounding up) until a tile fits.
/// Ties are broken in favour of the first axis.
///
/// Tiling never changes the values retrieved or stored.
///
/// ## Writing
/// Block stores only accept block-aligned writes.
/// A write that is not block-aligned retrieves the enclosing block-aligned region, merges the new data and stores the merged region.
/// Write tiles are chosen such that each enclosing block-aligned region is within the maximum transfer volume.
///
/// **Writes are not atomic across tiles**.
/// If storing a tile fails, earlier tiles may already be stored.
/// The error ([`ArrayError::RemoteStoreFailure`]) identifies the origin and shape of the failed request.
///
/// ## Parallel Writing
/// It is the responsibility of `diced` consumers to ensure that writes to overlapping blocks are not issued concurrently.
/// If a block is written more than once concurrently, partial writes to the block may be lost.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The block store.
    storage: Arc<TStorage>,
    /// The instance name.
    instance: String,
    /// The element data type.
    data_type: DataType,
    /// True if the instance holds labels.
    is_label: bool,
    /// The block shape of the instance.
    block_shape: BlockShape,
    /// True if blocks are stored with lossy compression.
    lossy_compression: bool,
    /// False once the version holding the instance is locked.
    writable: AtomicBool,
    /// The maximum number of elements in a single block store request.
    max_transfer_volume: NonZeroU64,
    /// The number of tiles transferred concurrently.
    concurrent_target: usize,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array handle for `instance` in `storage` with `metadata`.
    ///
    /// This does **not** create the instance in the store.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is invalid.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        instance: &str,
        metadata: InstanceMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let (data_type, is_label) = metadata.data_type()?;
        let block_shape = validate_metadata(&metadata, data_type, is_label)?;
        let config = global_config();
        Ok(Self {
            storage,
            instance: instance.to_string(),
            data_type,
            is_label,
            block_shape,
            lossy_compression: metadata.lossy_compression,
            writable: AtomicBool::new(metadata.writable),
            max_transfer_volume: config.max_transfer_volume(),
            concurrent_target: config.concurrent_target(),
        })
    }

    /// Replace the storage backing an array.
    pub fn with_storage<TStorage2: ?Sized>(&self, storage: Arc<TStorage2>) -> Array<TStorage2> {
        Array {
            storage,
            instance: self.instance.clone(),
            data_type: self.data_type,
            is_label: self.is_label,
            block_shape: self.block_shape.clone(),
            lossy_compression: self.lossy_compression,
            writable: AtomicBool::new(self.is_writable()),
            max_transfer_volume: self.max_transfer_volume,
            concurrent_target: self.concurrent_target,
        }
    }

    /// Get the underlying storage backing the array.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }

    /// Get the instance name.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Get the number of axes.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.block_shape.len()
    }

    /// Get the element data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns true if the array holds labels.
    #[must_use]
    pub const fn is_label(&self) -> bool {
        self.is_label
    }

    /// Get the block shape.
    #[must_use]
    pub fn block_shape(&self) -> &[NonZeroU64] {
        &self.block_shape
    }

    /// Returns true if blocks are stored with lossy compression.
    #[must_use]
    pub const fn lossy_compression(&self) -> bool {
        self.lossy_compression
    }

    /// Returns true if the array is writable.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable.load(Ordering::Acquire)
    }

    /// Make the array read only.
    ///
    /// This mirrors locking the version holding the instance.
    /// An array cannot be made writable again.
    pub fn lock(&self) {
        if self.writable.swap(false, Ordering::AcqRel) {
            log::debug!("array {} locked", self.instance);
        }
    }

    /// Get the maximum number of elements in a single block store request.
    #[must_use]
    pub const fn max_transfer_volume(&self) -> NonZeroU64 {
        self.max_transfer_volume
    }

    /// Set the maximum number of elements in a single block store request.
    ///
    /// This should not exceed the maximum transfer volume supported by the store.
    pub fn set_max_transfer_volume(&mut self, max_transfer_volume: NonZeroU64) -> &mut Self {
        self.max_transfer_volume = max_transfer_volume;
        self
    }

    /// Get the number of tiles transferred concurrently.
    #[must_use]
    pub const fn concurrent_target(&self) -> usize {
        self.concurrent_target
    }

    /// Set the number of tiles transferred concurrently.
    ///
    /// A target of zero is treated as one.
    pub fn set_concurrent_target(&mut self, concurrent_target: usize) -> &mut Self {
        self.concurrent_target = std::cmp::max(concurrent_target, 1);
        self
    }

    /// Create [`InstanceMetadata`] describing the array.
    #[must_use]
    pub fn metadata(&self) -> InstanceMetadata {
        InstanceMetadata::new(
            self.data_type,
            self.is_label,
            self.block_shape.iter().map(|block| block.get()).collect(),
        )
        .with_lossy_compression(self.lossy_compression)
    }

    /// Return the size in bytes of one element.
    fn element_size(&self) -> usize {
        self.data_type.size()
    }
}

impl<TStorage: ?Sized + InstanceMetadataTraits> Array<TStorage> {
    /// Open an existing array instance in `storage`.
    ///
    /// The instance metadata is resolved once and treated as immutable for the lifetime of the handle.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the instance does not exist, there is a storage error, or the metadata is invalid.
    pub fn open(storage: Arc<TStorage>, instance: &str) -> Result<Self, ArrayCreateError> {
        let metadata = storage
            .instance_metadata(instance)?
            .ok_or_else(|| ArrayCreateError::InstanceNotFound(instance.to_string()))?;
        Self::new_with_metadata(storage, instance, metadata)
    }
}

/// Validate instance metadata and return its block shape.
fn validate_metadata(
    metadata: &InstanceMetadata,
    data_type: DataType,
    is_label: bool,
) -> Result<BlockShape, ArrayCreateError> {
    let dimensionality = metadata.dimensionality;
    if !(1..=3).contains(&dimensionality) {
        return Err(ArrayCreateError::UnsupportedDimensionality(dimensionality));
    }
    if is_label && (data_type != DataType::UInt64 || dimensionality != 3) {
        return Err(ArrayCreateError::LabelRequires64Bit3D);
    }
    if is_label && metadata.lossy_compression {
        return Err(ArrayCreateError::LossyCompressionLabel);
    }
    if metadata.block_shape.len() != dimensionality {
        return Err(ArrayCreateError::InvalidBlockShape(
            metadata.block_shape.clone(),
        ));
    }
    metadata
        .block_shape
        .iter()
        .map(|&block| NonZeroU64::new(block))
        .collect::<Option<BlockShape>>()
        .ok_or_else(|| ArrayCreateError::InvalidBlockShape(metadata.block_shape.clone()))
}

/// Return the default block shape for an array with `dimensionality` axes.
///
/// - 1D: `[262144]`
/// - 2D: `[512, 512]`
/// - 3D: `[64, 64, 64]`
///
/// Returns [`None`] if the dimensionality is unsupported.
#[must_use]
pub fn default_block_shape(dimensionality: usize) -> Option<ArrayShape> {
    match dimensionality {
        1 => Some(vec![262_144]),
        2 => Some(vec![512, 512]),
        3 => Some(vec![64, 64, 64]),
        _ => None,
    }
}

/// Convert from `&[u8]` to `Vec<T>`.
#[must_use]
pub fn convert_from_bytes_slice<T: bytemuck::Pod>(from: &[u8]) -> Vec<T> {
    bytemuck::allocation::pod_collect_to_vec(from)
}

/// Transmute from `Vec<T>` to `Vec<u8>`.
#[must_use]
pub fn transmute_to_bytes_vec<T: bytemuck::NoUninit>(from: Vec<T>) -> Vec<u8> {
    bytemuck::allocation::try_cast_vec(from)
        .unwrap_or_else(|(_err, from)| bytemuck::allocation::pod_collect_to_vec(&from))
}

/// Transmute from `&[T]` to `&[u8]`.
#[must_use]
pub fn transmute_to_bytes<T: bytemuck::NoUninit>(from: &[T]) -> &[u8] {
    bytemuck::must_cast_slice(from)
}
