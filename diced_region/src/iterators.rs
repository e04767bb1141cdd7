//! Region iterators.
//!
//! - [`ContiguousLinearisedIndices`]: iterate over linearised indices of contiguous runs of elements within a region.

mod contiguous_linearised_indices;

pub use contiguous_linearised_indices::ContiguousLinearisedIndices;
