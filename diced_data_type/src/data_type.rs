use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A data type error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DataTypeError {
    /// The data type name is not one of the supported unsigned integer types.
    #[error("unsupported data type `{0}`, expected one of uint8, uint16, uint32, uint64")]
    Unsupported(String),
}

/// The element data type of an array.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
}

impl DataType {
    /// All supported data types, in increasing element size.
    pub const ALL: [Self; 4] = [Self::UInt8, Self::UInt16, Self::UInt32, Self::UInt64];

    /// Returns the name of the data type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
        }
    }

    /// Returns the size in bytes of one element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 => 2,
            Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }

    /// Create a data type from its name.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] if `name` is not a supported data type.
    pub fn from_name(name: &str) -> Result<Self, DataTypeError> {
        Self::ALL
            .into_iter()
            .find(|data_type| data_type.name() == name)
            .ok_or_else(|| DataTypeError::Unsupported(name.to_string()))
    }

    /// Returns the block store type name of an instance with this data type.
    ///
    /// Label instances are always named `labelblk`, other instances are named after their data type (e.g. `uint8blk`).
    #[must_use]
    pub fn block_type_name(&self, is_label: bool) -> String {
        if is_label {
            LABEL_BLOCK_TYPE_NAME.to_string()
        } else {
            format!("{}blk", self.name())
        }
    }

    /// Parse a block store type name into a data type and a label flag.
    ///
    /// `labelblk` maps to [`DataType::UInt64`] with the label flag set.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] if `type_name` is not a supported block type name.
    pub fn from_block_type_name(type_name: &str) -> Result<(Self, bool), DataTypeError> {
        if type_name == LABEL_BLOCK_TYPE_NAME {
            return Ok((Self::UInt64, true));
        }
        type_name
            .strip_suffix("blk")
            .and_then(|name| Self::from_name(name).ok())
            .map(|data_type| (data_type, false))
            .ok_or_else(|| DataTypeError::Unsupported(type_name.to_string()))
    }
}

const LABEL_BLOCK_TYPE_NAME: &str = "labelblk";

impl FromStr for DataType {
    type Err = DataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
