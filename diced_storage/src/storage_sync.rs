use auto_impl::auto_impl;

use super::{BoundingBox, Bytes, InstanceMetadata, StorageError};

/// Readable block store traits.
#[auto_impl(Arc)]
pub trait ReadableBlockStoreTraits: Send + Sync {
    /// Retrieve the elements of `instance` in the region at `origin` with `shape`.
    ///
    /// The returned bytes hold the elements of the region in C-contiguous order.
    /// Elements that were never written are zero.
    /// The region does not need to be aligned to the block grid.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the instance does not exist, the request exceeds the maximum transfer volume, or there is an underlying storage error.
    fn get(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        is_label: bool,
    ) -> Result<Bytes, StorageError>;

    /// Return the bounding box of the data written to `instance`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the instance does not exist or there is an underlying storage error.
    fn bounding_box(&self, instance: &str) -> Result<BoundingBox, StorageError>;
}

/// Writable block store traits.
#[auto_impl(Arc)]
pub trait WritableBlockStoreTraits: Send + Sync {
    /// Store the elements of `instance` in the region at `origin` with `shape`.
    ///
    /// The region must be aligned to the block grid of the instance.
    /// `value` holds the elements of the region in C-contiguous order.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the instance does not exist or is read only, the region is not block-aligned, the request exceeds the maximum transfer volume, or there is an underlying storage error.
    fn put(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        value: Bytes,
        is_label: bool,
    ) -> Result<(), StorageError>;
}

/// A trait combining [`ReadableBlockStoreTraits`] and [`WritableBlockStoreTraits`].
pub trait ReadableWritableBlockStoreTraits:
    ReadableBlockStoreTraits + WritableBlockStoreTraits
{
}

impl<T> ReadableWritableBlockStoreTraits for T where
    T: ReadableBlockStoreTraits + WritableBlockStoreTraits + ?Sized
{
}

/// Instance metadata provider traits.
///
/// Instance metadata is resolved once when an array is opened.
#[auto_impl(Arc)]
pub trait InstanceMetadataTraits: Send + Sync {
    /// Return the metadata of `instance`, or [`None`] if it does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn instance_metadata(&self, instance: &str) -> Result<Option<InstanceMetadata>, StorageError>;
}
