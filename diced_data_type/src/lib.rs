//! The element data type API for the [`diced`](https://docs.rs/diced/latest/diced/index.html) crate.
//!
//! Arrays hold fixed-size unsigned integer elements.
//! A label array always uses [`DataType::UInt64`].
//!
//! ## Licence
//! `diced_data_type` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod data_type;

pub use data_type::{DataType, DataTypeError};
