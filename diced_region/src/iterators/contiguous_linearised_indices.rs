use std::iter::FusedIterator;

use itertools::izip;

use crate::{Region, RegionError};

/// Iterates over linearised indices of contiguous elements in a region of an array.
///
/// The iterator item is the linearised index of the first element of a contiguous run.
/// Every run has [`contiguous_elements`](Self::contiguous_elements) elements.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, consider a 4x3 array with linearised element indices
/// ```text
/// 0   1   2
/// 3   4   5
/// 6   7   8
/// 9  10  11
/// ```
/// An iterator over the entire array will produce `[0]` with 12 contiguous elements.
/// An iterator over the lower right 2x2 region will produce `[7, 10]` with 2 contiguous elements.
#[derive(Clone, Debug)]
pub struct ContiguousLinearisedIndices {
    start: Vec<u64>,
    outer_shape: Vec<u64>,
    strides: Vec<u64>,
    contiguous_elements: u64,
    index: u64,
    length: u64,
}

impl ContiguousLinearisedIndices {
    /// Create a new contiguous linearised indices iterator.
    ///
    /// # Errors
    /// Returns [`RegionError`] if `array_shape` (at the origin) does not encapsulate `region` or its size overflows.
    pub fn new(region: &Region, array_shape: &[u64]) -> Result<Self, RegionError> {
        let array =
            Region::new_with_start_shape(vec![0; array_shape.len()], array_shape.to_vec())?;
        if !array.contains_region(region) {
            return Err(RegionError::OutOfBounds {
                region: region.clone(),
                shape: array_shape.to_vec(),
            });
        }
        let start: Vec<u64> = region.start().iter().map(|s| s.unsigned_abs()).collect();

        let mut strides = vec![0; array_shape.len()];
        let mut stride = 1;
        for (stride_i, &size) in std::iter::zip(strides.iter_mut().rev(), array_shape.iter().rev()) {
            *stride_i = stride;
            stride *= size;
        }

        // Fold trailing dimensions into a single contiguous run while the region spans them fully
        let mut contiguous = true;
        let mut contiguous_elements = 1;
        let mut outer_shape = region.shape().to_vec();
        for (&region_start, &region_size, &array_size, outer_size) in izip!(
            start.iter().rev(),
            region.shape().iter().rev(),
            array_shape.iter().rev(),
            outer_shape.iter_mut().rev(),
        ) {
            if contiguous {
                contiguous_elements *= region_size;
                *outer_size = 1;
                contiguous = region_start == 0 && region_size == array_size;
            }
        }

        let length = if region.is_empty() {
            0
        } else {
            outer_shape.iter().product()
        };
        Ok(Self {
            start,
            outer_shape,
            strides,
            contiguous_elements,
            index: 0,
            length,
        })
    }

    /// Return the number of elements in each contiguous run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }
}

impl Iterator for ContiguousLinearisedIndices {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.length {
            return None;
        }
        let mut remainder = self.index;
        let mut linearised = 0;
        for (&start, &size, &stride) in izip!(
            self.start.iter().rev(),
            self.outer_shape.iter().rev(),
            self.strides.iter().rev(),
        ) {
            linearised += (start + remainder % size) * stride;
            remainder /= size;
        }
        self.index += 1;
        Some(linearised)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndices {}

impl FusedIterator for ContiguousLinearisedIndices {}
