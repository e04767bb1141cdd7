use rayon::iter::{IntoParallelIterator, ParallelIterator};

use diced_region::{BlockAlignment, Tiling, TilingStrategy, normalize};
use diced_storage::{Bytes, ReadableWritableBlockStoreTraits};

use super::{Array, ArrayBytes, ArrayError, IndexExpression, IntoArrayBytes, Region};
use crate::iter_concurrent_limit;

impl<TStorage: ?Sized + ReadableWritableBlockStoreTraits + 'static> Array<TStorage> {
    /// Write `data` to the elements addressed by an index expression.
    ///
    /// Each axis is indexed with a point or a span, e.g. `(-3, -1, 3..5)`.
    /// Shaped `data` (e.g. an `ndarray` or a [`Tensor`](super::Tensor)) must have either the shape of the addressed region, or that shape with collapsed axes removed.
    /// Unshaped `data` (e.g. a `Vec`) must hold exactly the number of addressed elements in C-contiguous order.
    ///
    /// Writes that are not aligned to the block grid preserve neighbouring elements by merging with the enclosing block-aligned region.
    /// Writes are **not atomic** if the request is split into tiles.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array is read only ([`ArrayError::ReadOnlyArray`]), in which case the block store is not contacted,
    ///  - the number of axis indices does not match the dimensionality of the array ([`ArrayError::DimensionMismatch`]),
    ///  - the element type of `data` does not match the data type of the array ([`ArrayError::TypeMismatch`]),
    ///  - the shape or length of `data` does not match the addressed region,
    ///  - the maximum transfer volume cannot hold a block-aligned write ([`ArrayError::TransferVolumeTooSmall`]), or
    ///  - a block store request fails ([`ArrayError::RemoteStoreFailure`]).
    pub fn store<'a, I: IndexExpression + ?Sized>(
        &self,
        index: &I,
        data: impl IntoArrayBytes<'a>,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        let index = normalize(index, self.dimensionality())?;
        if let Some(data_shape) = data.data_shape() {
            let squeezed_shape = index.squeezed_shape();
            if data_shape != index.region().shape() && data_shape != squeezed_shape {
                return Err(ArrayError::InvalidDataShape(data_shape, squeezed_shape));
            }
        }
        let bytes = data.into_array_bytes(self.data_type())?;
        self.store_region_bytes(index.region(), &bytes)
    }

    /// Write `data` to the elements of a region.
    ///
    /// Shaped `data` must have the shape of the region.
    ///
    /// # Errors
    /// See [`store`](Array::store).
    pub fn store_region<'a>(
        &self,
        region: &Region,
        data: impl IntoArrayBytes<'a>,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        self.check_region_dimensionality(region)?;
        if let Some(data_shape) = data.data_shape() {
            if data_shape != region.shape() {
                return Err(ArrayError::InvalidDataShape(
                    data_shape,
                    region.shape().to_vec(),
                ));
            }
        }
        let bytes = data.into_array_bytes(self.data_type())?;
        self.store_region_bytes(region, &bytes)
    }

    fn check_writable(&self) -> Result<(), ArrayError> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(ArrayError::ReadOnlyArray(self.instance.clone()))
        }
    }

    /// Store the bytes of a region, tiling the request if required.
    fn store_region_bytes(&self, region: &Region, bytes: &ArrayBytes<'_>) -> Result<(), ArrayError> {
        bytes.validate(region.num_elements(), self.data_type())?;
        if region.is_empty() {
            return Ok(());
        }
        // Tile envelopes lie within the envelope of the region
        BlockAlignment::new(region, self.block_shape())?;
        let tiling = Tiling::new(
            region,
            self.max_transfer_volume(),
            TilingStrategy::BlockEnvelope(self.block_shape()),
        )?;
        log::debug!(
            "store {region} to {}: {} tiles with increments {:?}",
            self.instance,
            tiling.num_tiles(),
            tiling.increments()
        );
        if tiling.is_single() {
            return self.store_tile(region, bytes);
        }

        let element_size = self.element_size();
        let store_tile = |tile: Region| {
            let tile_bytes = tile.relative_to(region.start())?.extract_bytes(
                bytes,
                region.shape(),
                element_size,
            )?;
            self.store_tile(&tile, &tile_bytes)
        };
        if tiling.is_block_aligned(self.block_shape()) {
            // Tiles cover disjoint blocks
            log::debug!("store {region}: tiles are block-aligned, storing concurrently");
            let tiles: Vec<Region> = tiling.tiles().collect();
            iter_concurrent_limit!(self.concurrent_target(), tiles, try_for_each, store_tile)
        } else {
            // Neighbouring tiles share blocks, so each merge must see the previous tile
            log::debug!("store {region}: tiles share blocks, storing serially");
            tiling.tiles().try_for_each(store_tile)
        }
    }

    /// Store a tile, merging with the enclosing block-aligned region if it is not aligned.
    fn store_tile(&self, tile: &Region, tile_bytes: &[u8]) -> Result<(), ArrayError> {
        let alignment = BlockAlignment::new(tile, self.block_shape())?;
        if alignment.is_aligned() {
            return self.put_region(tile, Bytes::copy_from_slice(tile_bytes));
        }
        let aligned = alignment.aligned_region();
        log::trace!("store {tile}: merging into block-aligned {aligned}");
        let mut merged = Vec::from(self.get_tile(aligned)?);
        alignment.tile_in_aligned().update_bytes(
            &mut merged,
            aligned.shape(),
            self.element_size(),
            tile_bytes,
        )?;
        self.put_region(aligned, Bytes::from(merged))
    }

    fn put_region(&self, region: &Region, value: Bytes) -> Result<(), ArrayError> {
        self.storage
            .put(
                &self.instance,
                region.start(),
                region.shape(),
                value,
                self.is_label(),
            )
            .map_err(|err| ArrayError::remote(region.start(), region.shape(), err))
    }
}
