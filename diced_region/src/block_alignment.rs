//! Block alignment of tiles.
//!
//! A store only accepts writes of whole blocks.
//! A [`BlockAlignment`] expands a tile to the enclosing block-aligned region and locates the tile within it.

use std::num::NonZeroU64;

use itertools::izip;

use crate::{IncompatibleDimensionalityError, Region, RegionError, ceil_to_block, floor_to_block};

/// The expansion of a tile to the block grid of an array.
///
/// The block grid has a block boundary at every multiple of the block shape, including negative multiples.
/// The aligned region is the smallest block-aligned region containing the tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockAlignment {
    tile: Region,
    aligned: Region,
    tile_in_aligned: Region,
}

impl BlockAlignment {
    /// Align `tile` to a block grid with `block_shape`.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if `block_shape` does not match the tile dimensionality.
    /// Returns [`RegionError::Overflow`] if the aligned region is not representable.
    pub fn new(tile: &Region, block_shape: &[NonZeroU64]) -> Result<Self, RegionError> {
        if block_shape.len() != tile.dimensionality() {
            return Err(
                IncompatibleDimensionalityError::new(block_shape.len(), tile.dimensionality())
                    .into(),
            );
        }
        let (start, shape): (Vec<i64>, Vec<u64>) = izip!(tile.start(), tile.end_exc(), block_shape)
            .map(|(&start, end, &block)| {
                let aligned_start = floor_to_block(start, block)?;
                let aligned_end = ceil_to_block(end, block)?;
                Some((aligned_start, aligned_start.abs_diff(aligned_end)))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| RegionError::Overflow {
                start: tile.start().to_vec(),
                shape: tile.shape().to_vec(),
            })?
            .into_iter()
            .unzip();
        let aligned = Region::new_with_start_shape(start, shape)?;
        Ok(Self {
            tile: tile.clone(),
            tile_in_aligned: tile.relative_to(aligned.start())?,
            aligned,
        })
    }

    /// Return the tile.
    #[must_use]
    pub fn tile(&self) -> &Region {
        &self.tile
    }

    /// Return the block-aligned region containing the tile.
    #[must_use]
    pub fn aligned_region(&self) -> &Region {
        &self.aligned
    }

    /// Returns true if the tile is already aligned to the block grid.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.tile == self.aligned
    }

    /// Return the tile in the local coordinates of the aligned region.
    #[must_use]
    pub fn tile_in_aligned(&self) -> &Region {
        &self.tile_in_aligned
    }
}
