//! Regions, index normalisation, request tiling and block alignment for the [`diced`](https://docs.rs/diced/latest/diced/index.html) crate.
//!
//! - A [`Region`] is a rectangular `[start, stop)` region of an array. Coordinates are signed and may be negative.
//! - [`normalize`] converts an index expression (points, spans, or a mix of both) into a canonical [`Region`] and per-axis collapse flags.
//! - [`Tiling`] splits a region into tiles that each fit within a maximum transfer volume.
//! - [`BlockAlignment`] expands a tile to the block grid of an array.
//!
//! ## Licence
//! `diced_region` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod block_alignment;
pub use block_alignment::BlockAlignment;

mod index;
pub use index::{AxisIndex, IndexError, IndexExpression, NormalizedIndex, normalize};

mod region;
pub use region::{Region, RegionError};

mod tiling;
pub use tiling::{Tiles, Tiling, TilingError, TilingStrategy};

pub mod iterators;

use std::num::NonZeroU64;

/// An ND index to an element in an array.
///
/// Indices are signed, elements may be addressed before the logical origin of an array.
pub type ArrayIndices = Vec<i64>;

/// The shape of an array or region.
pub type ArrayShape = Vec<u64>;

/// The shape of a storage block.
pub type BlockShape = Vec<NonZeroU64>;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }

    /// The dimensionality that was supplied.
    #[must_use]
    pub const fn got(&self) -> usize {
        self.0
    }

    /// The dimensionality that was expected.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.1
    }
}

/// Round `value` down to a multiple of `block` (towards negative infinity).
///
/// Returns [`None`] if the result is less than [`i64::MIN`].
#[must_use]
pub fn floor_to_block(value: i64, block: NonZeroU64) -> Option<i64> {
    let block = block.get().cast_signed();
    value.checked_sub(value.rem_euclid(block))
}

/// Round `value` up to a multiple of `block` (towards positive infinity).
///
/// Returns [`None`] if the result exceeds [`i64::MAX`].
#[must_use]
pub fn ceil_to_block(value: i64, block: NonZeroU64) -> Option<i64> {
    let block = block.get().cast_signed();
    let remainder = value.rem_euclid(block);
    if remainder == 0 {
        Some(value)
    } else {
        value.checked_add(block - remainder)
    }
}
