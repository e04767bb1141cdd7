//! Index expressions and their normalisation into regions.
//!
//! An index expression addresses an array with one [`AxisIndex`] per axis.
//! A [`AxisIndex::Point`] selects a single coordinate and collapses (squeezes) that axis out of a result.
//! A [`AxisIndex::Span`] selects a half-open range of coordinates.

use std::ops::Range;

use thiserror::Error;

use crate::{ArrayShape, IncompatibleDimensionalityError, Region, RegionError};

/// An index error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IndexError {
    /// The number of axis indices does not match the array dimensionality.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(#[from] IncompatibleDimensionalityError),
    /// A span with `stop < start`.
    #[error("invalid span {0:?}, stop is less than start")]
    InvalidSpan(Range<i64>),
    /// Any other region error.
    #[error(transparent)]
    Region(RegionError),
}

impl From<RegionError> for IndexError {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::InvalidRange(range) => Self::InvalidSpan(range),
            err => Self::Region(err),
        }
    }
}

/// The index along a single axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AxisIndex {
    /// A single coordinate. The axis is collapsed out of a result.
    Point(i64),
    /// A half-open range of coordinates.
    Span(Range<i64>),
}

impl AxisIndex {
    /// Return the axis index as a half-open range.
    ///
    /// Returns [`None`] for a point at [`i64::MAX`], which has no exclusive end.
    #[must_use]
    pub fn to_range(&self) -> Option<Range<i64>> {
        match self {
            Self::Point(point) => Some(*point..point.checked_add(1)?),
            Self::Span(span) => Some(span.clone()),
        }
    }

    /// Returns true if the axis index is a [`AxisIndex::Point`].
    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point(_))
    }
}

impl From<i64> for AxisIndex {
    fn from(point: i64) -> Self {
        Self::Point(point)
    }
}

impl From<i32> for AxisIndex {
    fn from(point: i32) -> Self {
        Self::Point(point.into())
    }
}

impl From<Range<i64>> for AxisIndex {
    fn from(span: Range<i64>) -> Self {
        Self::Span(span)
    }
}

impl From<Range<i32>> for AxisIndex {
    fn from(span: Range<i32>) -> Self {
        Self::Span(span.start.into()..span.end.into())
    }
}

/// An index expression: a single axis index, or an ordered sequence of axis indices (one per axis).
///
/// Implemented for integers, ranges, [`AxisIndex`], tuples of up to three axis indices, and slices, arrays and vectors of axis indices.
/// ```rust
/// # use diced_region::{AxisIndex, IndexExpression};
/// assert_eq!(
///     (-3i64, -1i64, 3i64..5).axis_indices(),
///     vec![AxisIndex::Point(-3), AxisIndex::Point(-1), AxisIndex::Span(3..5)]
/// );
/// assert_eq!(7i64.axis_indices(), vec![AxisIndex::Point(7)]);
/// ```
pub trait IndexExpression {
    /// Return the axis indices of the expression.
    fn axis_indices(&self) -> Vec<AxisIndex>;
}

impl IndexExpression for AxisIndex {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        vec![self.clone()]
    }
}

macro_rules! impl_index_expression_single {
    ($($t:ty),+) => {
        $(
            impl IndexExpression for $t {
                fn axis_indices(&self) -> Vec<AxisIndex> {
                    vec![AxisIndex::from(self.clone())]
                }
            }
        )+
    };
}

impl_index_expression_single!(i32, i64, Range<i32>, Range<i64>);

impl<T: Clone + Into<AxisIndex>> IndexExpression for [T] {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<T: Clone + Into<AxisIndex>, const N: usize> IndexExpression for [T; N] {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        self.as_slice().axis_indices()
    }
}

impl<T: Clone + Into<AxisIndex>> IndexExpression for Vec<T> {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        self.as_slice().axis_indices()
    }
}

impl<A: Clone + Into<AxisIndex>> IndexExpression for (A,) {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        vec![self.0.clone().into()]
    }
}

impl<A: Clone + Into<AxisIndex>, B: Clone + Into<AxisIndex>> IndexExpression for (A, B) {
    fn axis_indices(&self) -> Vec<AxisIndex> {
        vec![self.0.clone().into(), self.1.clone().into()]
    }
}

impl<A: Clone + Into<AxisIndex>, B: Clone + Into<AxisIndex>, C: Clone + Into<AxisIndex>>
    IndexExpression for (A, B, C)
{
    fn axis_indices(&self) -> Vec<AxisIndex> {
        vec![
            self.0.clone().into(),
            self.1.clone().into(),
            self.2.clone().into(),
        ]
    }
}

/// A normalised index expression: a canonical region and per-axis collapse flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedIndex {
    region: Region,
    collapsed: Vec<bool>,
}

impl NormalizedIndex {
    /// Return the canonical region.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Return the collapse flags. An axis is collapsed if it was indexed with a single point.
    #[must_use]
    pub fn collapsed(&self) -> &[bool] {
        &self.collapsed
    }

    /// Returns true if every axis is collapsed, so the expression addresses a single element.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.collapsed.iter().all(|&collapsed| collapsed)
    }

    /// Return the shape of the region with collapsed axes removed.
    ///
    /// The shape is empty if every axis is collapsed.
    #[must_use]
    pub fn squeezed_shape(&self) -> ArrayShape {
        std::iter::zip(self.region.shape(), &self.collapsed)
            .filter(|(_, collapsed)| !**collapsed)
            .map(|(&size, _)| size)
            .collect()
    }

    /// Consume the normalised index and return the region and collapse flags.
    #[must_use]
    pub fn into_parts(self) -> (Region, Vec<bool>) {
        (self.region, self.collapsed)
    }
}

/// Normalise an index expression for an array with `dimensionality` axes.
///
/// Each point `k` becomes the range `k..k+1` and its axis is flagged as collapsed.
/// Each span is passed through unchanged.
///
/// # Errors
/// Returns [`IndexError::DimensionMismatch`] if the number of axis indices is not equal to `dimensionality`.
/// Returns [`IndexError::InvalidSpan`] if a span has `stop < start`.
/// Returns [`IndexError::Region`] if a point has no exclusive end or the number of elements overflows.
pub fn normalize<I: IndexExpression + ?Sized>(
    index: &I,
    dimensionality: usize,
) -> Result<NormalizedIndex, IndexError> {
    let axis_indices = index.axis_indices();
    if axis_indices.len() != dimensionality {
        return Err(IncompatibleDimensionalityError::new(axis_indices.len(), dimensionality).into());
    }
    let ranges = axis_indices
        .iter()
        .map(|axis_index| {
            axis_index.to_range().ok_or_else(|| RegionError::Overflow {
                start: vec![i64::MAX],
                shape: vec![1],
            })
        })
        .collect::<Result<Vec<Range<i64>>, RegionError>>()?;
    let collapsed = axis_indices.iter().map(AxisIndex::is_point).collect();
    Ok(NormalizedIndex {
        region: Region::new_with_ranges(&ranges)?,
        collapsed,
    })
}
