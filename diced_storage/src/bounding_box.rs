use serde::{Deserialize, Serialize};

/// The bounding box of the data written to an instance.
///
/// Points are in `(x, y, z)` order, where `x` is the fastest varying axis.
/// An absent point means no data has been written.
/// The maximum point is inclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "MinPoint")]
    min_point: Option<[i64; 3]>,
    #[serde(rename = "MaxPoint")]
    max_point: Option<[i64; 3]>,
}

impl BoundingBox {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(min_point: Option<[i64; 3]>, max_point: Option<[i64; 3]>) -> Self {
        Self {
            min_point,
            max_point,
        }
    }

    /// Create an empty bounding box (no data written).
    #[must_use]
    pub const fn new_empty() -> Self {
        Self::new(None, None)
    }

    /// Return the minimum point.
    #[must_use]
    pub const fn min_point(&self) -> Option<[i64; 3]> {
        self.min_point
    }

    /// Return the inclusive maximum point.
    #[must_use]
    pub const fn max_point(&self) -> Option<[i64; 3]> {
        self.max_point
    }
}
