use thiserror::Error;

use diced_data_type::DataTypeError;
use diced_region::{
    ArrayIndices, ArrayShape, IncompatibleDimensionalityError, IndexError, RegionError,
    TilingError,
};
use diced_storage::StorageError;

use super::ElementError;

/// An array creation error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArrayCreateError {
    /// The type name of the instance is not a supported block type.
    #[error(transparent)]
    InvalidDatatype(#[from] DataTypeError),
    /// Invalid block shape (contains zero or does not match the dimensionality).
    #[error("invalid block shape {_0:?}: must have one non-zero element per axis")]
    InvalidBlockShape(ArrayShape),
    /// The dimensionality is not 1, 2 or 3.
    #[error("unsupported dimensionality {_0}, must be 1, 2 or 3")]
    UnsupportedDimensionality(usize),
    /// A label instance that is not `uint64` and 3D.
    #[error("label instances must be uint64 and 3D")]
    LabelRequires64Bit3D,
    /// A label instance with lossy compression.
    #[error("label instances do not support lossy compression")]
    LossyCompressionLabel,
    /// The instance does not exist.
    #[error("instance {_0} does not exist")]
    InstanceNotFound(String),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// Array errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArrayError {
    /// The number of axis indices does not match the array dimensionality.
    #[error("dimension mismatch: {_0}")]
    DimensionMismatch(#[from] IncompatibleDimensionalityError),
    /// A span with `stop < start`.
    #[error("invalid span {_0:?}, stop is less than start")]
    InvalidSpan(std::ops::Range<i64>),
    /// A write to a read only (locked) array.
    #[error("array {_0} is read only")]
    ReadOnlyArray(String),
    /// The element type does not match the data type of the array.
    #[error("the element type does not match the data type {_0}")]
    TypeMismatch(diced_data_type::DataType),
    /// Invalid element value.
    #[error("invalid element value")]
    InvalidElementValue,
    /// A block store request failed.
    #[error("block store request at origin {origin:?} with shape {shape:?} failed: {source}")]
    RemoteStoreFailure {
        /// The origin of the failed request.
        origin: ArrayIndices,
        /// The shape of the failed request.
        shape: ArrayShape,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
    /// Invalid data shape.
    #[error("data has shape {_0:?}, expected {_1:?}")]
    InvalidDataShape(Vec<u64>, Vec<u64>),
    /// An unexpected bytes input size.
    #[error("got bytes with size {_0}, expected {_1}")]
    InvalidBytesInputSize(usize, u64),
    /// The maximum transfer volume cannot hold a single block-aligned write tile.
    #[error("maximum transfer volume {max_volume} is smaller than the minimum write volume {min_volume}")]
    TransferVolumeTooSmall {
        /// The maximum transfer volume.
        max_volume: u64,
        /// The minimum volume of a block-aligned write tile.
        min_volume: u64,
    },
    /// A single element was requested but the index expression addresses more than one axis.
    #[error("index expression with result shape {_0:?} does not address a single element")]
    NotAScalar(ArrayShape),
    /// A region error.
    #[error(transparent)]
    RegionError(RegionError),
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl ArrayError {
    /// Wrap a storage error from a request at `origin` with `shape`.
    pub(crate) fn remote(origin: &[i64], shape: &[u64], source: StorageError) -> Self {
        Self::RemoteStoreFailure {
            origin: origin.to_vec(),
            shape: shape.to_vec(),
            source,
        }
    }
}

impl From<IndexError> for ArrayError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch(err) => Self::DimensionMismatch(err),
            IndexError::InvalidSpan(span) => Self::InvalidSpan(span),
            IndexError::Region(err) => err.into(),
            err => Self::Other(err.to_string()),
        }
    }
}

impl From<RegionError> for ArrayError {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::IncompatibleDimensionality(err) => Self::DimensionMismatch(err),
            RegionError::InvalidRange(span) => Self::InvalidSpan(span),
            err => Self::RegionError(err),
        }
    }
}

impl From<TilingError> for ArrayError {
    fn from(err: TilingError) -> Self {
        match err {
            TilingError::VolumeTooSmall {
                max_volume,
                min_volume,
            } => Self::TransferVolumeTooSmall {
                max_volume,
                min_volume,
            },
            TilingError::IncompatibleDimensionality(err) => Self::DimensionMismatch(err),
            err => Self::Other(err.to_string()),
        }
    }
}

impl From<ElementError> for ArrayError {
    fn from(err: ElementError) -> Self {
        match err {
            ElementError::IncompatibleElementType(data_type) => Self::TypeMismatch(data_type),
            ElementError::InvalidElementValue => Self::InvalidElementValue,
            ElementError::InvalidBytesLength(got, expected) => {
                Self::InvalidBytesInputSize(got, expected as u64)
            }
        }
    }
}
