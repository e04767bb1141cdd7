use serde::{Deserialize, Serialize};

use diced_data_type::{DataType, DataTypeError};

/// The metadata of an array instance held by a block store.
///
/// ### Example JSON
/// ```json
/// {
///     "typename": "uint8blk",
///     "numdims": 3,
///     "block_shape": [64, 64, 64],
///     "writable": true,
///     "lossy_compression": false
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// The block type name, e.g. `uint8blk` or `labelblk`.
    #[serde(rename = "typename")]
    pub type_name: String,
    /// The number of array axes.
    #[serde(rename = "numdims")]
    pub dimensionality: usize,
    /// The block shape, one extent per axis.
    pub block_shape: Vec<u64>,
    /// False once the version holding the instance is locked.
    #[serde(default = "default_writable")]
    pub writable: bool,
    /// Whether blocks are stored with lossy compression.
    #[serde(default)]
    pub lossy_compression: bool,
}

const fn default_writable() -> bool {
    true
}

impl InstanceMetadata {
    /// Create writable instance metadata for `data_type`.
    #[must_use]
    pub fn new(data_type: DataType, is_label: bool, block_shape: Vec<u64>) -> Self {
        Self {
            type_name: data_type.block_type_name(is_label),
            dimensionality: block_shape.len(),
            block_shape,
            writable: true,
            lossy_compression: false,
        }
    }

    /// Set whether blocks are stored with lossy compression.
    #[must_use]
    pub fn with_lossy_compression(mut self, lossy_compression: bool) -> Self {
        self.lossy_compression = lossy_compression;
        self
    }

    /// Parse the type name into a data type and a label flag.
    ///
    /// # Errors
    /// Returns [`DataTypeError`] if the type name is not a supported block type.
    pub fn data_type(&self) -> Result<(DataType, bool), DataTypeError> {
        DataType::from_block_type_name(&self.type_name)
    }
}
