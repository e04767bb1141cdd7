//! The [`IntoArrayBytes`] trait for converting input types into [`ArrayBytes`] for storage.

use super::{ArrayBytes, ArrayError, DataType, element::Element};

/// A trait for types that can be converted into [`ArrayBytes`] for storage.
pub trait IntoArrayBytes<'a> {
    /// Return the shape of the data, if it carries one.
    ///
    /// A shaped input must match either the shape of the region being stored or its squeezed shape.
    /// Unshaped inputs (e.g. slices and vectors) are only checked for their length.
    fn data_shape(&self) -> Option<Vec<u64>> {
        None
    }

    /// Convert `self` into [`ArrayBytes`].
    ///
    /// # Arguments
    /// * `data_type` - The data type of the array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the conversion fails.
    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError>;
}

impl<'a> IntoArrayBytes<'a> for ArrayBytes<'a> {
    fn into_array_bytes(self, _data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError> {
        Ok(self)
    }
}

impl<T: Element> IntoArrayBytes<'static> for Vec<T> {
    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'static>, ArrayError> {
        Ok(T::into_array_bytes(&data_type, self)?)
    }
}

impl<'a, T: Element> IntoArrayBytes<'a> for &'a Vec<T> {
    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError> {
        Ok(T::to_array_bytes(&data_type, self)?)
    }
}

impl<'a, T: Element> IntoArrayBytes<'a> for &'a [T] {
    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError> {
        Ok(T::to_array_bytes(&data_type, self)?)
    }
}

impl<'a, T: Element, const N: usize> IntoArrayBytes<'a> for &'a [T; N] {
    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError> {
        Ok(T::to_array_bytes(&data_type, self)?)
    }
}

macro_rules! impl_into_array_bytes_scalar {
    ($($t:ty),+) => {
        $(
            impl IntoArrayBytes<'static> for $t {
                fn data_shape(&self) -> Option<Vec<u64>> {
                    Some(vec![])
                }

                fn into_array_bytes(
                    self,
                    data_type: DataType,
                ) -> Result<ArrayBytes<'static>, ArrayError> {
                    Ok(<$t as Element>::into_array_bytes(&data_type, vec![self])?)
                }
            }
        )+
    };
}

impl_into_array_bytes_scalar!(u8, u16, u32, u64);

#[cfg(feature = "ndarray")]
impl<T: Element, D: ndarray::Dimension> IntoArrayBytes<'static> for ndarray::Array<T, D> {
    fn data_shape(&self) -> Option<Vec<u64>> {
        Some(self.shape().iter().map(|&size| size as u64).collect())
    }

    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'static>, ArrayError> {
        let elements = if self.is_standard_layout() {
            self
        } else {
            self.as_standard_layout().into_owned()
        }
        .into_raw_vec_and_offset()
        .0;
        Ok(T::into_array_bytes(&data_type, elements)?)
    }
}

impl IntoArrayBytes<'static> for super::Tensor {
    fn data_shape(&self) -> Option<Vec<u64>> {
        Some(self.shape().to_vec())
    }

    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'static>, ArrayError> {
        let (bytes, tensor_data_type, _) = self.into_parts();
        if tensor_data_type != data_type {
            return Err(ArrayError::TypeMismatch(data_type));
        }
        Ok(ArrayBytes::from(bytes))
    }
}

impl<'a> IntoArrayBytes<'a> for &'a super::Tensor {
    fn data_shape(&self) -> Option<Vec<u64>> {
        Some(self.shape().to_vec())
    }

    fn into_array_bytes(self, data_type: DataType) -> Result<ArrayBytes<'a>, ArrayError> {
        if self.data_type() != data_type {
            return Err(ArrayError::TypeMismatch(data_type));
        }
        Ok(ArrayBytes::from(self.bytes()))
    }
}
