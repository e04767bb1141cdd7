//! A synchronous in-memory block store.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use itertools::Itertools;
use parking_lot::RwLock;

use diced_region::{ArrayIndices, BlockAlignment, Region};

use crate::{
    BoundingBox, Bytes, DEFAULT_MAX_TRANSFER_VOLUME, InstanceMetadata, InstanceMetadataTraits,
    ReadableBlockStoreTraits, StorageError, WritableBlockStoreTraits,
};

#[derive(Debug)]
struct MemoryInstance {
    metadata: InstanceMetadata,
    block_shape: Vec<NonZeroU64>,
    element_size: usize,
    blocks: BTreeMap<ArrayIndices, Vec<u8>>,
}

impl MemoryInstance {
    fn block_region(&self, block_indices: &[i64]) -> Region {
        let start = std::iter::zip(block_indices, &self.metadata.block_shape)
            .map(|(&index, &block)| index * block.cast_signed())
            .collect();
        Region::new_with_start_shape(start, self.metadata.block_shape.clone())
            .unwrap_or_else(|_| Region::new_empty(self.metadata.dimensionality))
    }

    fn block_bytes(&self) -> usize {
        Region::new_with_shape(self.metadata.block_shape.clone())
            .num_bytes(self.element_size)
            .unwrap_or(usize::MAX)
    }

    /// The indices of every block intersecting an aligned region.
    fn block_indices(aligned: &Region, block_shape: &[u64]) -> impl Iterator<Item = ArrayIndices> {
        std::iter::zip(aligned.to_ranges(), block_shape)
            .map(|(range, &block)| {
                let block = block.cast_signed();
                range.start / block..range.end / block
            })
            .multi_cartesian_product()
    }

    fn check_request(&self, region: &Region, max_volume: u64) -> Result<(), StorageError> {
        if region.dimensionality() != self.metadata.dimensionality {
            return Err(StorageError::Other(format!(
                "request {region} does not match instance dimensionality {}",
                self.metadata.dimensionality
            )));
        }
        let volume = region.num_elements();
        if volume > max_volume {
            return Err(StorageError::TransferTooLarge {
                volume,
                max_volume,
            });
        }
        Ok(())
    }
}

/// A synchronous in-memory block store.
///
/// Instances are created with [`create_instance`](MemoryBlockStore::create_instance) and hold blocks in memory.
/// Requests exceeding the maximum transfer volume are rejected.
#[derive(Debug)]
pub struct MemoryBlockStore {
    max_transfer_volume: u64,
    instances: RwLock<BTreeMap<String, MemoryInstance>>,
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlockStore {
    /// Create a new memory block store with the default maximum transfer volume.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_transfer_volume: DEFAULT_MAX_TRANSFER_VOLUME,
            instances: RwLock::default(),
        }
    }

    /// Create a new memory block store with a maximum transfer volume.
    #[must_use]
    pub fn new_with_max_transfer_volume(max_transfer_volume: NonZeroU64) -> Self {
        Self {
            max_transfer_volume: max_transfer_volume.get(),
            instances: RwLock::default(),
        }
    }

    /// Return the maximum number of elements in a single request.
    #[must_use]
    pub fn max_transfer_volume(&self) -> u64 {
        self.max_transfer_volume
    }

    /// Create an instance.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the instance already exists or its metadata is invalid.
    pub fn create_instance(
        &self,
        instance: &str,
        metadata: InstanceMetadata,
    ) -> Result<(), StorageError> {
        let (data_type, _) = metadata.data_type()?;
        if metadata.block_shape.len() != metadata.dimensionality {
            return Err(StorageError::Other(format!(
                "block shape {:?} does not match dimensionality {}",
                metadata.block_shape, metadata.dimensionality
            )));
        }
        let block_shape = metadata
            .block_shape
            .iter()
            .map(|&block| NonZeroU64::new(block))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                StorageError::Other(format!("invalid block shape {:?}", metadata.block_shape))
            })?;

        let mut instances = self.instances.write();
        if instances.contains_key(instance) {
            return Err(StorageError::InstanceExists(instance.to_string()));
        }
        instances.insert(
            instance.to_string(),
            MemoryInstance {
                metadata,
                block_shape,
                element_size: data_type.size(),
                blocks: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Lock an instance, making it read only.
    ///
    /// # Errors
    /// Returns [`StorageError::UnknownInstance`] if the instance does not exist.
    pub fn lock_instance(&self, instance: &str) -> Result<(), StorageError> {
        let mut instances = self.instances.write();
        let memory_instance = instances
            .get_mut(instance)
            .ok_or_else(|| StorageError::UnknownInstance(instance.to_string()))?;
        memory_instance.metadata.writable = false;
        Ok(())
    }

    /// Return the number of blocks stored for an instance.
    ///
    /// # Errors
    /// Returns [`StorageError::UnknownInstance`] if the instance does not exist.
    pub fn num_blocks(&self, instance: &str) -> Result<usize, StorageError> {
        let instances = self.instances.read();
        instances
            .get(instance)
            .map(|memory_instance| memory_instance.blocks.len())
            .ok_or_else(|| StorageError::UnknownInstance(instance.to_string()))
    }
}

impl InstanceMetadataTraits for MemoryBlockStore {
    fn instance_metadata(&self, instance: &str) -> Result<Option<InstanceMetadata>, StorageError> {
        let instances = self.instances.read();
        Ok(instances
            .get(instance)
            .map(|memory_instance| memory_instance.metadata.clone()))
    }
}

impl ReadableBlockStoreTraits for MemoryBlockStore {
    fn get(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        _is_label: bool,
    ) -> Result<Bytes, StorageError> {
        let instances = self.instances.read();
        let memory_instance = instances
            .get(instance)
            .ok_or_else(|| StorageError::UnknownInstance(instance.to_string()))?;
        let region = Region::new_with_start_shape(origin.to_vec(), shape.to_vec())?;
        memory_instance.check_request(&region, self.max_transfer_volume)?;

        let element_size = memory_instance.element_size;
        let mut bytes = vec![0u8; region.num_bytes(element_size)?];
        if region.is_empty() {
            return Ok(Bytes::from(bytes));
        }
        let alignment = BlockAlignment::new(&region, &memory_instance.block_shape)?;
        for block_indices in MemoryInstance::block_indices(
            alignment.aligned_region(),
            &memory_instance.metadata.block_shape,
        ) {
            if let Some(block) = memory_instance.blocks.get(&block_indices) {
                let block_region = memory_instance.block_region(&block_indices);
                let overlap = block_region.overlap(&region)?;
                let overlap_bytes = overlap.relative_to(block_region.start())?.extract_bytes(
                    block,
                    block_region.shape(),
                    element_size,
                )?;
                overlap.relative_to(origin)?.update_bytes(
                    &mut bytes,
                    shape,
                    element_size,
                    &overlap_bytes,
                )?;
            }
        }
        Ok(Bytes::from(bytes))
    }

    fn bounding_box(&self, instance: &str) -> Result<BoundingBox, StorageError> {
        let instances = self.instances.read();
        let memory_instance = instances
            .get(instance)
            .ok_or_else(|| StorageError::UnknownInstance(instance.to_string()))?;
        let dimensionality = memory_instance.metadata.dimensionality;
        let mut min_point: Option<[i64; 3]> = None;
        let mut max_point: Option<[i64; 3]> = None;
        for block_indices in memory_instance.blocks.keys() {
            let block_region = memory_instance.block_region(block_indices);
            let mut block_min = [0; 3];
            let mut block_max = [0; 3];
            // Point components are (x, y, z), the reverse of the array axis order
            for (axis, (&start, end)) in
                std::iter::zip(block_region.start(), block_region.end_exc()).enumerate()
            {
                let component = dimensionality - 1 - axis;
                block_min[component] = start;
                block_max[component] = end - 1;
            }
            min_point = Some(min_point.map_or(block_min, |point| {
                std::array::from_fn(|i| std::cmp::min(point[i], block_min[i]))
            }));
            max_point = Some(max_point.map_or(block_max, |point| {
                std::array::from_fn(|i| std::cmp::max(point[i], block_max[i]))
            }));
        }
        Ok(BoundingBox::new(min_point, max_point))
    }
}

impl WritableBlockStoreTraits for MemoryBlockStore {
    fn put(
        &self,
        instance: &str,
        origin: &[i64],
        shape: &[u64],
        value: Bytes,
        _is_label: bool,
    ) -> Result<(), StorageError> {
        let mut instances = self.instances.write();
        let memory_instance = instances
            .get_mut(instance)
            .ok_or_else(|| StorageError::UnknownInstance(instance.to_string()))?;
        if !memory_instance.metadata.writable {
            return Err(StorageError::ReadOnlyInstance(instance.to_string()));
        }
        let region = Region::new_with_start_shape(origin.to_vec(), shape.to_vec())?;
        memory_instance.check_request(&region, self.max_transfer_volume)?;

        let element_size = memory_instance.element_size;
        let expected = region.num_bytes(element_size)?;
        if value.len() != expected {
            return Err(StorageError::InvalidValueLength {
                got: value.len(),
                expected,
            });
        }
        let alignment = BlockAlignment::new(&region, &memory_instance.block_shape)?;
        if !alignment.is_aligned() {
            return Err(StorageError::UnalignedPut {
                origin: origin.to_vec(),
                shape: shape.to_vec(),
                block_shape: memory_instance.metadata.block_shape.clone(),
            });
        }
        if region.is_empty() {
            return Ok(());
        }

        let block_indices = MemoryInstance::block_indices(&region, &memory_instance.metadata.block_shape)
            .collect::<Vec<_>>();
        log::trace!(
            "memory block store put {region} to {instance}: {} blocks",
            block_indices.len()
        );
        for block_indices in block_indices {
            let block_region = memory_instance.block_region(&block_indices);
            let block = block_region.relative_to(origin)?.extract_bytes(
                &value,
                shape,
                element_size,
            )?;
            debug_assert_eq!(block.len(), memory_instance.block_bytes());
            memory_instance.blocks.insert(block_indices, block);
        }
        Ok(())
    }
}
