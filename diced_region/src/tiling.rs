//! Request tiling.
//!
//! A store bounds the number of elements in a single request.
//! A [`Tiling`] splits a region into row-major tiles, each within a maximum transfer volume.
//!
//! Tile increments start at the region shape and the largest increment is repeatedly halved (rounding up) until a tile fits.
//! If several axes share the largest increment, the first (slowest varying) of them is halved.

use std::iter::FusedIterator;
use std::num::NonZeroU64;

use itertools::izip;
use thiserror::Error;

use crate::{ArrayShape, IncompatibleDimensionalityError, Region, ceil_to_block, floor_to_block};

/// A tiling error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TilingError {
    /// Even single element tiles exceed the maximum transfer volume.
    #[error("the maximum transfer volume {max_volume} is smaller than the minimum tile volume {min_volume}")]
    VolumeTooSmall {
        /// The maximum transfer volume.
        max_volume: u64,
        /// The smallest achievable tile volume.
        min_volume: u64,
    },
    /// The block shape dimensionality does not match the region.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
}

/// How the volume of a tile is measured against the maximum transfer volume.
#[derive(Copy, Clone, Debug)]
pub enum TilingStrategy<'a> {
    /// The tile itself must fit.
    Exact,
    /// The block-aligned envelope of every tile must fit.
    ///
    /// Used when tiles are expanded to the block grid before they are transferred.
    BlockEnvelope(&'a [NonZeroU64]),
}

/// A row-major tiling of a region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tiling {
    region: Region,
    increments: ArrayShape,
    tiles_per_axis: ArrayShape,
}

fn saturating_product(values: impl IntoIterator<Item = u64>) -> u64 {
    values
        .into_iter()
        .fold(1u64, |product, value| product.saturating_mul(value))
}

/// The largest block-aligned span of any tile along one axis.
fn max_aligned_span(start: i64, size: u64, increment: u64, block: NonZeroU64) -> u64 {
    let end = start.saturating_add_unsigned(size);
    let mut max_span = 0;
    let mut tile_start = start;
    while tile_start < end {
        let tile_end = std::cmp::min(tile_start.saturating_add_unsigned(increment), end);
        let span = match (floor_to_block(tile_start, block), ceil_to_block(tile_end, block)) {
            (Some(aligned_start), Some(aligned_end)) => aligned_start.abs_diff(aligned_end),
            _ => u64::MAX,
        };
        max_span = std::cmp::max(max_span, span);
        tile_start = tile_end;
    }
    max_span
}

impl Tiling {
    /// Create a tiling of `region` where every tile fits within `max_volume` elements, as measured by `strategy`.
    ///
    /// # Errors
    /// Returns [`TilingError::VolumeTooSmall`] if no tiling satisfies `max_volume`.
    /// Returns [`TilingError::IncompatibleDimensionality`] if a block shape does not match the region dimensionality.
    pub fn new(
        region: &Region,
        max_volume: NonZeroU64,
        strategy: TilingStrategy,
    ) -> Result<Self, TilingError> {
        if let TilingStrategy::BlockEnvelope(block_shape) = strategy
            && block_shape.len() != region.dimensionality()
        {
            return Err(
                IncompatibleDimensionalityError::new(block_shape.len(), region.dimensionality())
                    .into(),
            );
        }

        let volume = |increments: &[u64]| match strategy {
            TilingStrategy::Exact => saturating_product(increments.iter().copied()),
            TilingStrategy::BlockEnvelope(block_shape) => saturating_product(
                izip!(region.start(), region.shape(), increments, block_shape).map(
                    |(&start, &size, &increment, &block)| {
                        max_aligned_span(start, size, increment, block)
                    },
                ),
            ),
        };

        let mut increments = region.shape().to_vec();
        loop {
            let tile_volume = volume(&increments);
            if tile_volume <= max_volume.get() {
                break;
            }
            let Some((axis, largest)) = increments
                .iter()
                .copied()
                .enumerate()
                .rev()
                .max_by_key(|&(_, increment)| increment)
            else {
                break;
            };
            if largest <= 1 {
                return Err(TilingError::VolumeTooSmall {
                    max_volume: max_volume.get(),
                    min_volume: tile_volume,
                });
            }
            increments[axis] = largest.div_ceil(2);
        }

        let tiles_per_axis = std::iter::zip(region.shape(), &increments)
            .map(|(&size, &increment)| {
                if increment == 0 {
                    0
                } else {
                    size.div_ceil(increment)
                }
            })
            .collect();
        Ok(Self {
            region: region.clone(),
            increments,
            tiles_per_axis,
        })
    }

    /// Return the tiled region.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Return the tile increments (the shape of a full tile).
    #[must_use]
    pub fn increments(&self) -> &[u64] {
        &self.increments
    }

    /// Return the number of tiles along each axis.
    #[must_use]
    pub fn tiles_per_axis(&self) -> &[u64] {
        &self.tiles_per_axis
    }

    /// Return the total number of tiles.
    #[must_use]
    pub fn num_tiles(&self) -> u64 {
        self.tiles_per_axis.iter().product()
    }

    /// Returns true if the region is covered by a single tile.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.tiles_per_axis.iter().all(|&tiles| tiles <= 1)
    }

    /// Return the tile with row-major index `index`.
    ///
    /// The last tile along each axis is clamped to the extent of the region.
    /// Returns [`None`] if `index` is out of bounds.
    #[must_use]
    pub fn tile(&self, index: u64) -> Option<Region> {
        if index >= self.num_tiles() {
            return None;
        }
        let dimensionality = self.region.dimensionality();
        let mut start = vec![0; dimensionality];
        let mut shape = vec![0; dimensionality];
        let mut remainder = index;
        for (start_i, shape_i, &tiles, &increment, &region_start, &region_size) in izip!(
            start.iter_mut().rev(),
            shape.iter_mut().rev(),
            self.tiles_per_axis.iter().rev(),
            self.increments.iter().rev(),
            self.region.start().iter().rev(),
            self.region.shape().iter().rev(),
        ) {
            let offset = (remainder % tiles) * increment;
            remainder /= tiles;
            *start_i = region_start.saturating_add_unsigned(offset);
            *shape_i = std::cmp::min(increment, region_size - offset);
        }
        Region::new_with_start_shape(start, shape).ok()
    }

    /// Returns an iterator over the tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> Tiles<'_> {
        Tiles {
            tiling: self,
            index: 0,
            length: self.num_tiles(),
        }
    }

    /// Returns true if every boundary between adjacent tiles lies on the block grid.
    ///
    /// If so, the block-aligned envelopes of distinct tiles are disjoint.
    #[must_use]
    pub fn is_block_aligned(&self, block_shape: &[NonZeroU64]) -> bool {
        izip!(
            self.region.start(),
            &self.increments,
            &self.tiles_per_axis,
            block_shape
        )
        .all(|(&start, &increment, &tiles, &block)| {
            tiles <= 1
                || (start.rem_euclid(block.get().cast_signed()) == 0
                    && increment % block.get() == 0)
        })
    }
}

/// An iterator over the tiles of a [`Tiling`].
#[derive(Clone, Debug)]
pub struct Tiles<'a> {
    tiling: &'a Tiling,
    index: u64,
    length: u64,
}

impl Iterator for Tiles<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.length {
            let tile = self.tiling.tile(self.index);
            self.index += 1;
            tile
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Tiles<'_> {}

impl FusedIterator for Tiles<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_shape(shape: &[u64]) -> Vec<NonZeroU64> {
        shape.iter().map(|&b| NonZeroU64::new(b).unwrap()).collect()
    }

    #[test]
    fn tiling_single() {
        let region = Region::new_with_ranges(&[1..401, 2..202, 3..103]).unwrap();
        let tiling = Tiling::new(
            &region,
            NonZeroU64::new(512 * 512 * 512).unwrap(),
            TilingStrategy::Exact,
        )
        .unwrap();
        assert!(tiling.is_single());
        assert_eq!(tiling.num_tiles(), 1);
        assert_eq!(tiling.tiles().collect::<Vec<_>>(), vec![region]);
    }

    #[test]
    fn tiling_halves_largest() {
        let region = Region::new_with_ranges(&[1..1401, 2..1202, 3..1003]).unwrap();
        let tiling = Tiling::new(
            &region,
            NonZeroU64::new(512 * 512 * 512).unwrap(),
            TilingStrategy::Exact,
        )
        .unwrap();
        // 1400 -> 700, 1200 -> 600, 1000 -> 500, 700 -> 350
        assert_eq!(tiling.increments(), &[350, 600, 500]);
        assert_eq!(tiling.tiles_per_axis(), &[4, 2, 2]);
        assert_eq!(tiling.num_tiles(), 16);
        assert!(tiling.tiles().all(|tile| tile.num_elements() <= 512 * 512 * 512));
    }

    #[test]
    fn tiling_tie_break_first_axis() {
        let region = Region::new_with_shape(vec![10, 10, 4]);
        let tiling =
            Tiling::new(&region, NonZeroU64::new(200).unwrap(), TilingStrategy::Exact).unwrap();
        assert_eq!(tiling.increments(), &[5, 10, 4]);

        let tiling =
            Tiling::new(&region, NonZeroU64::new(100).unwrap(), TilingStrategy::Exact).unwrap();
        assert_eq!(tiling.increments(), &[5, 5, 4]);
    }

    #[test]
    fn tiling_clamps_last_tile() {
        let region = Region::new_with_ranges(&[-3..4, 10..15]).unwrap();
        let tiling =
            Tiling::new(&region, NonZeroU64::new(20).unwrap(), TilingStrategy::Exact).unwrap();
        assert_eq!(tiling.increments(), &[4, 5]);
        let tiles: Vec<_> = tiling.tiles().map(|tile| tile.to_ranges()).collect();
        assert_eq!(tiles, vec![vec![-3..1, 10..15], vec![1..4, 10..15]]);
        assert_eq!(tiling.tile(2), None);
    }

    #[test]
    fn tiling_covers_region_exactly() {
        let region = Region::new_with_ranges(&[-5..12, 3..20, 0..9]).unwrap();
        let tiling =
            Tiling::new(&region, NonZeroU64::new(64).unwrap(), TilingStrategy::Exact).unwrap();
        let tiles: Vec<_> = tiling.tiles().collect();
        assert_eq!(tiles.len() as u64, tiling.num_tiles());
        assert_eq!(
            tiles.iter().map(Region::num_elements).sum::<u64>(),
            region.num_elements()
        );
        assert!(tiles.iter().all(|tile| region.contains_region(tile)));
        assert!(tiles.iter().all(|tile| tile.num_elements() <= 64));
    }

    #[test]
    fn tiling_empty() {
        let region = Region::new_with_ranges(&[0..0, 0..10]).unwrap();
        let tiling =
            Tiling::new(&region, NonZeroU64::new(1).unwrap(), TilingStrategy::Exact).unwrap();
        assert_eq!(tiling.num_tiles(), 0);
        assert_eq!(tiling.tiles().count(), 0);
    }

    #[test]
    fn tiling_block_envelope() {
        let blocks = block_shape(&[4, 4]);
        let region = Region::new_with_ranges(&[1..9, 1..9]).unwrap();

        // Exact tiling fits 64 elements in one tile, but its envelope is 12x12
        let tiling =
            Tiling::new(&region, NonZeroU64::new(64).unwrap(), TilingStrategy::Exact).unwrap();
        assert!(tiling.is_single());

        let tiling = Tiling::new(
            &region,
            NonZeroU64::new(64).unwrap(),
            TilingStrategy::BlockEnvelope(&blocks),
        )
        .unwrap();
        assert_eq!(tiling.increments(), &[4, 4]);
        assert_eq!(tiling.num_tiles(), 4);
        assert!(!tiling.is_block_aligned(&blocks));
    }

    #[test]
    fn tiling_block_envelope_too_small() {
        let blocks = block_shape(&[4, 4]);
        let region = Region::new_with_shape(vec![8, 8]);
        assert_eq!(
            Tiling::new(
                &region,
                NonZeroU64::new(8).unwrap(),
                TilingStrategy::BlockEnvelope(&blocks)
            ),
            Err(TilingError::VolumeTooSmall {
                max_volume: 8,
                min_volume: 16
            })
        );
        assert!(
            Tiling::new(
                &region,
                NonZeroU64::new(8).unwrap(),
                TilingStrategy::BlockEnvelope(&blocks[..1])
            )
            .is_err()
        );
    }

    #[test]
    fn tiling_block_aligned() {
        let blocks = block_shape(&[4, 4]);
        let region = Region::new_with_shape(vec![16, 16]);
        let tiling = Tiling::new(
            &region,
            NonZeroU64::new(64).unwrap(),
            TilingStrategy::BlockEnvelope(&blocks),
        )
        .unwrap();
        assert_eq!(tiling.increments(), &[8, 8]);
        assert!(tiling.is_block_aligned(&blocks));
    }
}
