use std::ops::Range;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use unsafe_cell_slice::UnsafeCellSlice;

use diced_region::{Tiling, TilingStrategy, normalize};
use diced_storage::{Bytes, ReadableBlockStoreTraits, StorageError};

use super::{
    Array, ArrayBytes, ArrayError, FromArrayBytes, IncompatibleDimensionalityError,
    IndexExpression, Region,
};
use crate::iter_concurrent_limit;

impl<TStorage: ?Sized + ReadableBlockStoreTraits + 'static> Array<TStorage> {
    /// Read and return the elements addressed by an index expression.
    ///
    /// Each axis is indexed with a point or a span, e.g. `(-3, -1, 3..5)`.
    /// Axes indexed with a point are collapsed out of the result shape.
    /// If every axis is collapsed the result shape is empty, and a bare element type (e.g. `u64`) can be returned.
    ///
    /// Elements that have never been written are zero.
    /// The request is split into tiles if it exceeds the [maximum transfer volume](Array::max_transfer_volume).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the number of axis indices does not match the dimensionality of the array ([`ArrayError::DimensionMismatch`]),
    ///  - a span has `stop < start` ([`ArrayError::InvalidSpan`]),
    ///  - `T` does not match the data type of the array ([`ArrayError::TypeMismatch`]), or
    ///  - a block store request fails ([`ArrayError::RemoteStoreFailure`]).
    pub fn retrieve<T: FromArrayBytes, I: IndexExpression + ?Sized>(
        &self,
        index: &I,
    ) -> Result<T, ArrayError> {
        let index = normalize(index, self.dimensionality())?;
        let bytes = self.retrieve_region_bytes(index.region())?;
        T::from_array_bytes(bytes, &index.squeezed_shape(), self.data_type())
    }

    /// Read and return the elements of a region.
    ///
    /// No axes are collapsed, so the result shape is the region shape.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the dimensionality of `region` does not match the array ([`ArrayError::DimensionMismatch`]),
    ///  - `T` does not match the data type of the array ([`ArrayError::TypeMismatch`]), or
    ///  - a block store request fails ([`ArrayError::RemoteStoreFailure`]).
    pub fn retrieve_region<T: FromArrayBytes>(&self, region: &Region) -> Result<T, ArrayError> {
        self.check_region_dimensionality(region)?;
        let bytes = self.retrieve_region_bytes(region)?;
        T::from_array_bytes(bytes, region.shape(), self.data_type())
    }

    /// Return the extent of the data written to the array.
    ///
    /// The extent is the smallest block-aligned region enclosing every stored block, as reported by the block store bounding box.
    /// If nothing has been written, the extent is empty with a zero start on every axis.
    ///
    /// # Errors
    /// Returns [`ArrayError::StorageError`] if the bounding box cannot be retrieved.
    /// A failing bounding box query is not reported as an [`ArrayError::RemoteStoreFailure`], which identifies a tile.
    pub fn extent(&self) -> Result<Region, ArrayError> {
        let bounding_box = self.storage.bounding_box(&self.instance)?;
        let dimensionality = self.dimensionality();
        let (Some(min_point), Some(max_point)) =
            (bounding_box.min_point(), bounding_box.max_point())
        else {
            return Ok(Region::new_empty(dimensionality));
        };
        // Array axes are the reverse of the (x, y, z) point components
        let ranges: Vec<Range<i64>> = (0..dimensionality)
            .map(|axis| {
                let component = dimensionality - 1 - axis;
                min_point[component]..max_point[component] + 1
            })
            .collect();
        Ok(Region::new_with_ranges(&ranges)?)
    }

    /// Retrieve the bytes of a region, tiling the request if required.
    fn retrieve_region_bytes(&self, region: &Region) -> Result<ArrayBytes<'static>, ArrayError> {
        if region.is_empty() {
            return Ok(ArrayBytes::new_zeros(0, self.data_type()));
        }
        let tiling = Tiling::new(region, self.max_transfer_volume(), TilingStrategy::Exact)?;
        log::debug!(
            "retrieve {region} from {}: {} tiles with increments {:?}",
            self.instance,
            tiling.num_tiles(),
            tiling.increments()
        );
        if tiling.is_single() {
            let bytes = self.get_tile(region)?;
            return Ok(ArrayBytes::from(Vec::from(bytes)));
        }

        let element_size = self.element_size();
        let mut output = vec![0u8; region.num_bytes(element_size)?];
        {
            let output_slice = UnsafeCellSlice::new(output.as_mut_slice());
            let retrieve_tile = |tile: Region| {
                let tile_bytes = self.get_tile(&tile)?;
                let byte_ranges = tile
                    .relative_to(region.start())?
                    .contiguous_byte_ranges(region.shape(), element_size)?;
                let mut offset = 0;
                for byte_range in byte_ranges {
                    let length = byte_range.len();
                    unsafe {
                        // SAFETY: tiles are disjoint
                        output_slice
                            .index_mut(byte_range)
                            .copy_from_slice(&tile_bytes[offset..offset + length]);
                    }
                    offset += length;
                }
                Ok::<_, ArrayError>(())
            };
            let tiles: Vec<Region> = tiling.tiles().collect();
            iter_concurrent_limit!(self.concurrent_target(), tiles, try_for_each, retrieve_tile)?;
        }
        Ok(ArrayBytes::from(output))
    }

    /// Get a tile from the block store and check its length.
    pub(super) fn get_tile(&self, tile: &Region) -> Result<Bytes, ArrayError> {
        let bytes = self
            .storage
            .get(&self.instance, tile.start(), tile.shape(), self.is_label())
            .map_err(|err| ArrayError::remote(tile.start(), tile.shape(), err))?;
        let expected = tile.num_bytes(self.element_size())?;
        if bytes.len() == expected {
            Ok(bytes)
        } else {
            Err(ArrayError::remote(
                tile.start(),
                tile.shape(),
                StorageError::InvalidValueLength {
                    got: bytes.len(),
                    expected,
                },
            ))
        }
    }
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Check that `region` has the dimensionality of the array.
    pub(super) fn check_region_dimensionality(&self, region: &Region) -> Result<(), ArrayError> {
        if region.dimensionality() == self.dimensionality() {
            Ok(())
        } else {
            Err(IncompatibleDimensionalityError::new(
                region.dimensionality(),
                self.dimensionality(),
            )
            .into())
        }
    }
}
