use std::num::NonZeroU64;
use std::sync::Arc;

use diced_storage::InstanceMetadata;

use super::{
    Array, ArrayCreateError, ArrayShape, DataType, default_block_shape, validate_metadata,
};

/// An [`Array`] builder.
///
/// [`ArrayBuilder`] is initialised from a data type.
///  - The default dimensionality is 3.
///  - The default block shape depends on the dimensionality (see [`default_block_shape`]).
///  - Arrays are not labels and are losslessly compressed by default.
///  - The maximum transfer volume and concurrent target default to the [global configuration](crate::config).
///
/// Use the methods in the array builder to change the configuration away from these defaults.
/// [`build_metadata`](ArrayBuilder::build_metadata) validates the configuration and returns [`InstanceMetadata`] for creating an instance in a store.
/// [`build`](ArrayBuilder::build) creates a handle to an instance.
///
/// [`build`](ArrayBuilder::build) does not modify the store!
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use diced::array::ArrayBuilder;
/// use diced::data_type::DataType;
/// # let store = Arc::new(diced::storage::store::MemoryBlockStore::new());
/// let mut builder = ArrayBuilder::new(DataType::UInt8);
/// builder.dimensionality(2).lossy_compression(true);
/// store.create_instance("grayscale", builder.build_metadata()?)?;
/// let array = builder.build(store.clone(), "grayscale")?;
/// assert_eq!(array.block_shape().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    /// The element data type.
    pub data_type: DataType,
    /// The number of axes.
    pub dimensionality: usize,
    /// The block shape. If [`None`], chooses a default based on the dimensionality.
    pub block_shape: Option<ArrayShape>,
    /// True if the array holds labels.
    pub label: bool,
    /// True if blocks are stored with lossy compression.
    pub lossy_compression: bool,
    /// The maximum transfer volume. If [`None`], uses the global configuration.
    pub max_transfer_volume: Option<NonZeroU64>,
    /// The concurrent target. If [`None`], uses the global configuration.
    pub concurrent_target: Option<usize>,
}

impl ArrayBuilder {
    /// Create a new array builder for a 3D array with `data_type` elements.
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            dimensionality: 3,
            block_shape: None,
            label: false,
            lossy_compression: false,
            max_transfer_volume: None,
            concurrent_target: None,
        }
    }

    /// Create a new builder copying the configuration of an existing array.
    #[must_use]
    pub fn from_array<T: ?Sized>(array: &Array<T>) -> Self {
        let mut builder = Self::new(array.data_type());
        builder
            .dimensionality(array.dimensionality())
            .block_shape(array.block_shape().iter().map(|block| block.get()).collect())
            .label(array.is_label())
            .lossy_compression(array.lossy_compression())
            .max_transfer_volume(array.max_transfer_volume())
            .concurrent_target(array.concurrent_target());
        builder
    }

    /// Set the data type.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    /// Set the number of axes.
    pub fn dimensionality(&mut self, dimensionality: usize) -> &mut Self {
        self.dimensionality = dimensionality;
        self
    }

    /// Set the block shape.
    pub fn block_shape(&mut self, block_shape: ArrayShape) -> &mut Self {
        self.block_shape = Some(block_shape);
        self
    }

    /// Set whether the array holds labels.
    ///
    /// Label arrays must be `uint64` and 3D.
    pub fn label(&mut self, label: bool) -> &mut Self {
        self.label = label;
        self
    }

    /// Set whether blocks are stored with lossy compression.
    ///
    /// Ignored for label arrays, which are always stored losslessly.
    pub fn lossy_compression(&mut self, lossy_compression: bool) -> &mut Self {
        self.lossy_compression = lossy_compression;
        self
    }

    /// Set the maximum transfer volume.
    pub fn max_transfer_volume(&mut self, max_transfer_volume: NonZeroU64) -> &mut Self {
        self.max_transfer_volume = Some(max_transfer_volume);
        self
    }

    /// Set the concurrent target.
    pub fn concurrent_target(&mut self, concurrent_target: usize) -> &mut Self {
        self.concurrent_target = Some(concurrent_target);
        self
    }

    /// Get the metadata of an instance that would be created with the current builder state.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if:
    ///  - the dimensionality is not 1, 2 or 3,
    ///  - a label array is not `uint64` or not 3D, or
    ///  - the block shape contains zero or does not match the dimensionality.
    pub fn build_metadata(&self) -> Result<InstanceMetadata, ArrayCreateError> {
        if self.label && self.data_type != DataType::UInt64 {
            return Err(ArrayCreateError::LabelRequires64Bit3D);
        }
        let block_shape = match &self.block_shape {
            Some(block_shape) => block_shape.clone(),
            None => default_block_shape(self.dimensionality)
                .ok_or(ArrayCreateError::UnsupportedDimensionality(self.dimensionality))?,
        };
        let mut metadata = InstanceMetadata::new(self.data_type, self.label, block_shape)
            .with_lossy_compression(self.lossy_compression && !self.label);
        metadata.dimensionality = self.dimensionality;
        validate_metadata(&metadata, self.data_type, self.label)?;
        Ok(metadata)
    }

    /// Build into an [`Array`] handle for `instance` in `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the configuration is invalid.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        instance: &str,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        let mut array = Array::new_with_metadata(storage, instance, self.build_metadata()?)?;
        if let Some(max_transfer_volume) = self.max_transfer_volume {
            array.set_max_transfer_volume(max_transfer_volume);
        }
        if let Some(concurrent_target) = self.concurrent_target {
            array.set_concurrent_target(concurrent_target);
        }
        Ok(array)
    }

    /// Build into an [`Arc<Array>`].
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the configuration is invalid.
    pub fn build_arc<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        instance: &str,
    ) -> Result<Arc<Array<TStorage>>, ArrayCreateError> {
        Ok(Arc::new(self.build(storage, instance)?))
    }
}
