use std::borrow::Cow;

use derive_more::Deref;

use super::{ArrayError, DataType};

/// Array element bytes.
///
/// These represent elements in C-contiguous order (i.e. row-major order) where the last dimension varies the fastest.
#[derive(Clone, Debug, PartialEq, Eq, Deref)]
#[deref(forward)]
pub struct ArrayBytes<'a>(Cow<'a, [u8]>);

impl<'a> ArrayBytes<'a> {
    /// Create a new [`ArrayBytes`].
    pub fn new(bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Create [`ArrayBytes`] of zeros for `num_elements` elements of `data_type`.
    #[must_use]
    pub fn new_zeros(num_elements: usize, data_type: DataType) -> ArrayBytes<'static> {
        ArrayBytes(Cow::Owned(vec![0; num_elements * data_type.size()]))
    }

    /// Convert into owned [`ArrayBytes<'static>`].
    #[must_use]
    pub fn into_owned(self) -> ArrayBytes<'static> {
        ArrayBytes(Cow::Owned(self.0.into_owned()))
    }

    /// Return the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> Cow<'a, [u8]> {
        self.0
    }

    /// Validate that the bytes hold exactly `num_elements` elements of `data_type`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesInputSize`] if the length is incorrect.
    pub fn validate(&self, num_elements: u64, data_type: DataType) -> Result<(), ArrayError> {
        let expected = num_elements.saturating_mul(data_type.size() as u64);
        if self.0.len() as u64 == expected {
            Ok(())
        } else {
            Err(ArrayError::InvalidBytesInputSize(self.0.len(), expected))
        }
    }
}

impl From<Vec<u8>> for ArrayBytes<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Cow::Owned(bytes))
    }
}

impl<'a> From<&'a [u8]> for ArrayBytes<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(Cow::Borrowed(bytes))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for ArrayBytes<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self(Cow::Borrowed(bytes))
    }
}

impl<'a> From<Cow<'a, [u8]>> for ArrayBytes<'a> {
    fn from(bytes: Cow<'a, [u8]>) -> Self {
        Self(bytes)
    }
}
