//! Regions.
//!
//! A [`Region`] represents a rectangular region of an array with a signed start and an unsigned shape.

use std::fmt::{Debug, Display};
use std::ops::Range;

use itertools::izip;
use thiserror::Error;

use crate::iterators::ContiguousLinearisedIndices;
use crate::{ArrayIndices, ArrayShape, IncompatibleDimensionalityError};

/// A region error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum RegionError {
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// Incompatible start and shape.
    #[error("incompatible start {start:?} with shape {shape:?}")]
    IncompatibleStartShape {
        start: ArrayIndices,
        shape: ArrayShape,
    },
    /// A range with `stop < start`.
    #[error("invalid range {0:?}, stop is less than start")]
    InvalidRange(Range<i64>),
    /// The region is not within the bounds of an array with a given shape.
    #[error("region {region} is out of bounds of shape {shape:?}")]
    OutOfBounds { region: Region, shape: ArrayShape },
    /// The length of bytes does not match the expected length.
    #[error("invalid bytes length {got}, expected {expected}")]
    InvalidBytesLength { got: usize, expected: usize },
    /// The end or the size of the region exceeds the representable range.
    #[error("region with start {start:?} and shape {shape:?} overflows")]
    Overflow { start: ArrayIndices, shape: ArrayShape },
}

fn check_overflow(start: &[i64], shape: &[u64]) -> Result<(), RegionError> {
    let ends_fit = std::iter::zip(start, shape)
        .all(|(&start, &size)| start.checked_add_unsigned(size).is_some());
    let num_elements_fit = shape
        .iter()
        .try_fold(1u64, |product, &size| product.checked_mul(size))
        .is_some();
    if ends_fit && num_elements_fit {
        Ok(())
    } else {
        Err(RegionError::Overflow {
            start: start.to_vec(),
            shape: shape.to_vec(),
        })
    }
}

/// A rectangular region of an array.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Region {
    /// The start of the region.
    start: ArrayIndices,
    /// The shape of the region.
    shape: ArrayShape,
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_ranges().fmt(f)
    }
}

impl Region {
    /// Create a new empty region.
    #[must_use]
    pub fn new_empty(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            shape: vec![0; dimensionality],
        }
    }

    /// Create a new region from a list of half-open [`Range`]s.
    ///
    /// # Errors
    /// Returns [`RegionError::InvalidRange`] if any range has `end < start`.
    /// Returns [`RegionError::Overflow`] if the number of elements exceeds [`u64::MAX`].
    pub fn new_with_ranges(ranges: &[Range<i64>]) -> Result<Self, RegionError> {
        let mut start = Vec::with_capacity(ranges.len());
        let mut shape = Vec::with_capacity(ranges.len());
        for range in ranges {
            if range.end < range.start {
                return Err(RegionError::InvalidRange(range.clone()));
            }
            start.push(range.start);
            shape.push(range.start.abs_diff(range.end));
        }
        check_overflow(&start, &shape)?;
        Ok(Self { start, shape })
    }

    /// Create a new region with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new region.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleStartShape`] if the lengths of `start` and `shape` do not match.
    /// Returns [`RegionError::Overflow`] if the end of the region exceeds [`i64::MAX`] or the number of elements exceeds [`u64::MAX`].
    pub fn new_with_start_shape(start: ArrayIndices, shape: ArrayShape) -> Result<Self, RegionError> {
        if start.len() != shape.len() {
            return Err(RegionError::IncompatibleStartShape { start, shape });
        }
        check_overflow(&start, &shape)?;
        Ok(Self { start, shape })
    }

    /// Return the start of the region.
    #[must_use]
    pub fn start(&self) -> &[i64] {
        &self.start
    }

    /// Return the shape of the region.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Returns the exclusive end of the region.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start.saturating_add_unsigned(size))
            .collect()
    }

    /// Converts the region to half-open ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<i64>> {
        std::iter::zip(&self.start, self.end_exc())
            .map(|(&start, end)| start..end)
            .collect()
    }

    /// Returns if the region is empty (i.e. has a zero element in its shape).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Return the dimensionality of the region.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the number of elements of the region.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape
            .iter()
            .fold(1u64, |product, &size| product.saturating_mul(size))
    }

    /// Return the number of bytes of the region for elements of `element_size` bytes.
    ///
    /// # Errors
    /// Returns [`RegionError::Overflow`] if the number of bytes exceeds [`usize::MAX`].
    pub fn num_bytes(&self, element_size: usize) -> Result<usize, RegionError> {
        usize::try_from(self.num_elements())
            .ok()
            .and_then(|num_elements| num_elements.checked_mul(element_size))
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> RegionError {
        RegionError::Overflow {
            start: self.start.clone(),
            shape: self.shape.clone(),
        }
    }

    /// Returns true if `other` lies entirely within this region.
    #[must_use]
    pub fn contains_region(&self, other: &Self) -> bool {
        self.dimensionality() == other.dimensionality()
            && izip!(&self.start, self.end_exc(), &other.start, other.end_exc())
                .all(|(&s, e, &os, oe)| os >= s && oe <= e)
    }

    /// Return the region relative to `origin`, i.e. with `origin` subtracted from its start.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if `origin` does not match the region dimensionality.
    /// Returns [`RegionError::Overflow`] if the relative region is not representable.
    pub fn relative_to(&self, origin: &[i64]) -> Result<Self, RegionError> {
        if origin.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(origin.len(), self.dimensionality()).into());
        }
        let start = std::iter::zip(&self.start, origin)
            .map(|(&start, &origin)| start.checked_sub(origin))
            .collect::<Option<ArrayIndices>>()
            .ok_or_else(|| self.overflow())?;
        Self::new_with_start_shape(start, self.shape.clone())
    }

    /// Return the overlapping region of this region and `other`.
    ///
    /// The result is empty if the regions do not intersect.
    ///
    /// # Errors
    /// Returns [`RegionError::IncompatibleDimensionality`] if the dimensionalities do not match.
    pub fn overlap(&self, other: &Self) -> Result<Self, RegionError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            )
            .into());
        }
        let (start, shape) = izip!(&self.start, self.end_exc(), &other.start, other.end_exc())
            .map(|(&start, end, &other_start, other_end)| {
                let overlap_start = std::cmp::max(start, other_start);
                let overlap_end = std::cmp::max(overlap_start, std::cmp::min(end, other_end));
                (overlap_start, overlap_start.abs_diff(overlap_end))
            })
            .unzip();
        Ok(Self { start, shape })
    }

    /// Extract the bytes of this region from the bytes of an array with `array_shape` at the origin.
    ///
    /// The output holds the elements of the region in C-contiguous order.
    ///
    /// # Errors
    /// Returns [`RegionError`] if `array_shape` does not encapsulate this region or `bytes` has the wrong length.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, RegionError> {
        check_bytes_length(bytes.len(), array_shape, element_size)?;
        let byte_ranges = self.contiguous_byte_ranges(array_shape, element_size)?;
        let mut output = Vec::with_capacity(self.num_bytes(element_size)?);
        for byte_range in byte_ranges {
            output.extend_from_slice(&bytes[byte_range]);
        }
        Ok(output)
    }

    /// Overwrite this region within the bytes of an array with `array_shape` at the origin.
    ///
    /// `region_bytes` holds the elements of the region in C-contiguous order.
    ///
    /// # Errors
    /// Returns [`RegionError`] if `array_shape` does not encapsulate this region or either byte slice has the wrong length.
    pub fn update_bytes(
        &self,
        bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
        region_bytes: &[u8],
    ) -> Result<(), RegionError> {
        check_bytes_length(bytes.len(), array_shape, element_size)?;
        check_bytes_length(region_bytes.len(), &self.shape, element_size)?;
        let mut offset = 0;
        for byte_range in self.contiguous_byte_ranges(array_shape, element_size)? {
            let length = byte_range.len();
            bytes[byte_range].copy_from_slice(&region_bytes[offset..offset + length]);
            offset += length;
        }
        Ok(())
    }

    /// Returns an iterator over the linearised indices of contiguous elements within the region.
    ///
    /// The region is interpreted in the local coordinates of an array with shape `array_shape` starting at the origin.
    ///
    /// # Errors
    /// Returns [`RegionError`] if `array_shape` does not encapsulate this region.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndices, RegionError> {
        ContiguousLinearisedIndices::new(self, array_shape)
    }

    /// Returns an iterator over the byte ranges of contiguous elements within the region.
    ///
    /// # Errors
    /// Returns [`RegionError`] if `array_shape` does not encapsulate this region.
    /// Returns [`RegionError::Overflow`] if the bytes of an array with `array_shape` are not addressable with [`usize`].
    pub fn contiguous_byte_ranges(
        &self,
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<impl Iterator<Item = Range<usize>> + use<>, RegionError> {
        // Byte offsets are bounded by the array size
        Self::new_with_shape(array_shape.to_vec()).num_bytes(element_size)?;
        let indices = self.contiguous_linearised_indices(array_shape)?;
        let length = usize::try_from(indices.contiguous_elements())
            .ok()
            .and_then(|contiguous_elements| contiguous_elements.checked_mul(element_size))
            .ok_or_else(|| self.overflow())?;
        Ok(indices.map(move |index| {
            let start = usize::try_from(index)
                .unwrap_or(usize::MAX)
                .saturating_mul(element_size);
            start..start.saturating_add(length)
        }))
    }
}

fn check_bytes_length(
    length: usize,
    shape: &[u64],
    element_size: usize,
) -> Result<(), RegionError> {
    let expected = usize::try_from(shape.iter().product::<u64>())
        .unwrap_or(usize::MAX)
        .saturating_mul(element_size);
    if length == expected {
        Ok(())
    } else {
        Err(RegionError::InvalidBytesLength {
            got: length,
            expected,
        })
    }
}
