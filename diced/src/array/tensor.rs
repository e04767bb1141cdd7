use std::borrow::Cow;

use super::DataType;

/// A tensor holding element bytes with data type and shape metadata.
///
/// This represents a multidimensional array of fixed-size elements in C-contiguous (row-major) order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tensor {
    bytes: Cow<'static, [u8]>,
    data_type: DataType,
    shape: Vec<u64>,
}

impl Tensor {
    /// Create a new [`Tensor`].
    #[must_use]
    pub fn new(bytes: impl Into<Cow<'static, [u8]>>, data_type: DataType, shape: Vec<u64>) -> Self {
        Self {
            bytes: bytes.into(),
            data_type,
            shape,
        }
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Get the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Consume self and return the parts.
    #[must_use]
    pub fn into_parts(self) -> (Cow<'static, [u8]>, DataType, Vec<u64>) {
        (self.bytes, self.data_type, self.shape)
    }
}
