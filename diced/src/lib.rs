//! `diced` gives array-like random access to 1D, 2D and 3D arrays held in a versioned block store.
//!
//! A block store persists array elements in fixed-size, block-aligned units and bounds every request to a maximum transfer volume.
//! `diced` hides those constraints behind an [`Array`](crate::array::Array) handle:
//! - index expressions mixing points and spans are normalised into regions, and axes indexed with a point are squeezed out of results,
//! - oversized requests are split into tiles that each fit within the maximum transfer volume,
//! - writes are expanded to the block grid, merging with existing data where a write is not block-aligned, and
//! - the extent of written data is reported from the store bounding box.
//!
//! Coordinates are signed, so data can be addressed before the logical origin of an array.
//!
//! ## Crates
//! - [`diced_data_type`] (re-exported as [`data_type`]): the element data types.
//! - [`diced_region`] (re-exported as [`region`]): regions, index normalisation, tiling and block alignment.
//! - [`diced_storage`] (re-exported as [`storage`]): the block store API, an in-memory block store and storage adapters.
//!
//! ## Example
#![cfg_attr(feature = "ndarray", doc = "```rust")]
#![cfg_attr(not(feature = "ndarray"), doc = "```rust,ignore")]
//! # use std::sync::Arc;
//! use diced::array::{Array, ArrayBuilder};
//! use diced::data_type::DataType;
//! use diced::storage::store::MemoryBlockStore;
//!
//! let store = Arc::new(MemoryBlockStore::new());
//! let mut builder = ArrayBuilder::new(DataType::UInt64);
//! builder.dimensionality(3).label(true);
//! store.create_instance("segmentation", builder.build_metadata()?)?;
//! let array = Array::open(store, "segmentation")?;
//!
//! // Write a region that is not aligned to the 64x64x64 block grid
//! let data: Vec<u64> = (0..40 * 20 * 10).collect();
//! array.store(&(1..41, 2..22, 3..13), data)?;
//! assert_eq!(array.extent()?.to_ranges(), vec![0..64, 0..64, 0..64]);
//!
//! // Axes indexed with a point are squeezed out of the result
//! let row: ndarray::ArrayD<u64> = array.retrieve(&(1, 2, 3..8))?;
//! assert_eq!(row.shape(), &[5]);
//! let element: u64 = array.retrieve(&(40, 21, 12))?;
//! assert_eq!(element, 40 * 20 * 10 - 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Parallelism and Concurrency
//! Tiles of a single request are transferred in parallel, bounded by a concurrent target.
//! Writes whose tiles share blocks are transferred serially.
//! See [`config`] for global defaults.
//!
//! `diced` does not offer a synchronisation API.
//! **It is the responsibility of `diced` consumers to ensure that overlapping regions of an array are not written concurrently**.
//!
//! ## Logging
//! `diced` logs tiling and dispatch decisions using the [`log`] crate.
//! A logging implementation must be enabled to capture logs.
//! See the [`log`] crate documentation for more details.
//!
//! ## Licence
//! `diced` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

pub mod array;
pub mod config;

pub use diced_data_type as data_type;
pub use diced_region as region;
pub use diced_storage as storage;

use rayon_iter_concurrent_limit::iter_concurrent_limit;
