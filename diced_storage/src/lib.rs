//! The block store API for the [`diced`](https://docs.rs/diced/latest/diced/index.html) crate.
//!
//! A block store persists the elements of array instances in fixed-size blocks.
//! It serves requests for rectangular regions up to a maximum transfer volume, zero-filling anything never written.
//! Writes must cover whole blocks.
//!
//! This crate defines the store traits, instance metadata, and includes an in-memory block store and a performance metrics adapter.
//!
//! ## Licence
//! `diced_storage` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod bounding_box;
mod instance_metadata;
pub mod storage_adapter;
mod storage_sync;
pub mod store;

use std::sync::Arc;

use thiserror::Error;

use diced_data_type::DataTypeError;
use diced_region::{ArrayIndices, ArrayShape, RegionError};

pub use bounding_box::BoundingBox;
pub use instance_metadata::InstanceMetadata;
pub use storage_sync::{
    InstanceMetadataTraits, ReadableBlockStoreTraits, ReadableWritableBlockStoreTraits,
    WritableBlockStoreTraits,
};

/// [`Arc`] wrapped readable block store.
pub type ReadableBlockStore = Arc<dyn ReadableBlockStoreTraits>;

/// [`Arc`] wrapped writable block store.
pub type WritableBlockStore = Arc<dyn WritableBlockStoreTraits>;

/// [`Arc`] wrapped readable and writable block store.
pub type ReadableWritableBlockStore = Arc<dyn ReadableWritableBlockStoreTraits>;

/// The type for bytes used in block store get and put methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// The default maximum number of elements in a single block store request (`512^3`).
pub const DEFAULT_MAX_TRANSFER_VOLUME: u64 = 512 * 512 * 512;

/// A storage error.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A request exceeded the maximum transfer volume of the store.
    #[error("request of {volume} elements exceeds the maximum transfer volume {max_volume}")]
    TransferTooLarge {
        /// The number of elements requested.
        volume: u64,
        /// The maximum transfer volume.
        max_volume: u64,
    },
    /// A put was not aligned to the block grid.
    #[error("put at origin {origin:?} with shape {shape:?} is not aligned to blocks of shape {block_shape:?}")]
    UnalignedPut {
        /// The origin of the put.
        origin: ArrayIndices,
        /// The shape of the put.
        shape: ArrayShape,
        /// The block shape of the instance.
        block_shape: ArrayShape,
    },
    /// The instance does not exist.
    #[error("unknown instance {0}")]
    UnknownInstance(String),
    /// The instance already exists.
    #[error("instance {0} already exists")]
    InstanceExists(String),
    /// A write operation was attempted on a read only (locked) instance.
    #[error("instance {0} is read only")]
    ReadOnlyInstance(String),
    /// A put value has the wrong length.
    #[error("invalid value length {got}, expected {expected}")]
    InvalidValueLength {
        /// The supplied length in bytes.
        got: usize,
        /// The expected length in bytes.
        expected: usize,
    },
    /// Invalid instance metadata.
    #[error(transparent)]
    InvalidDataType(#[from] DataTypeError),
    /// An invalid request region.
    #[error(transparent)]
    InvalidRegion(#[from] RegionError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
