//! The [`FromArrayBytes`] trait for converting retrieved [`ArrayBytes`] into other types.

use super::element::ElementOwned;
use super::{ArrayBytes, ArrayError, DataType};

/// A trait for types that can be constructed from [`ArrayBytes`], a result shape and a [`DataType`].
///
/// The result shape has collapsed axes removed, so it is empty if a single element was retrieved.
pub trait FromArrayBytes: Sized {
    /// Convert [`ArrayBytes`] into `Self`.
    ///
    /// # Arguments
    /// * `bytes` - The array bytes to convert
    /// * `shape` - The shape of the result
    /// * `data_type` - The datatype of the array elements
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the conversion fails.
    fn from_array_bytes(
        bytes: ArrayBytes<'static>,
        shape: &[u64],
        data_type: DataType,
    ) -> Result<Self, ArrayError>;
}

impl FromArrayBytes for ArrayBytes<'static> {
    fn from_array_bytes(
        bytes: ArrayBytes<'static>,
        _shape: &[u64],
        _data_type: DataType,
    ) -> Result<Self, ArrayError> {
        Ok(bytes)
    }
}

impl<T: ElementOwned> FromArrayBytes for Vec<T> {
    fn from_array_bytes(
        bytes: ArrayBytes<'static>,
        _shape: &[u64],
        data_type: DataType,
    ) -> Result<Self, ArrayError> {
        Ok(T::from_array_bytes(&data_type, bytes)?)
    }
}

macro_rules! impl_from_array_bytes_scalar {
    ($($t:ty),+) => {
        $(
            impl FromArrayBytes for $t {
                fn from_array_bytes(
                    bytes: ArrayBytes<'static>,
                    shape: &[u64],
                    data_type: DataType,
                ) -> Result<Self, ArrayError> {
                    if !shape.is_empty() {
                        return Err(ArrayError::NotAScalar(shape.to_vec()));
                    }
                    let elements = <$t as ElementOwned>::from_array_bytes(&data_type, bytes)?;
                    match elements.as_slice() {
                        [element] => Ok(*element),
                        _ => Err(ArrayError::InvalidBytesInputSize(
                            elements.len() * size_of::<$t>(),
                            size_of::<$t>() as u64,
                        )),
                    }
                }
            }
        )+
    };
}

impl_from_array_bytes_scalar!(u8, u16, u32, u64);

#[cfg(feature = "ndarray")]
impl<T: ElementOwned, D: ndarray::Dimension> FromArrayBytes for ndarray::Array<T, D> {
    fn from_array_bytes(
        bytes: ArrayBytes<'static>,
        shape: &[u64],
        data_type: DataType,
    ) -> Result<Self, ArrayError> {
        let elements = T::from_array_bytes(&data_type, bytes)?;
        let length = elements.len();
        let shape_usize = shape
            .iter()
            .map(|&size| usize::try_from(size))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ArrayError::Other(format!("`shape` {shape:?} exceeds usize")))?;
        let arrayd = ndarray::ArrayD::from_shape_vec(shape_usize, elements).map_err(|_| {
            ArrayError::Other(format!(
                "`shape`: {shape:?} is not compatible with the number of elements: {length:?}"
            ))
        })?;
        arrayd.into_dimensionality::<D>().map_err(|_| {
            ArrayError::Other(format!(
                "`shape` {shape:?} is incompatible with requested dimensionality of size {}",
                D::NDIM.unwrap_or(0)
            ))
        })
    }
}

impl FromArrayBytes for super::Tensor {
    fn from_array_bytes(
        bytes: ArrayBytes<'static>,
        shape: &[u64],
        data_type: DataType,
    ) -> Result<Self, ArrayError> {
        Ok(Self::new(bytes.into_bytes(), data_type, shape.to_vec()))
    }
}
