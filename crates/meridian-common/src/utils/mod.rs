//! Common utilities used throughout Meridian.
//!
//! - [`error`] - The crate-wide [`Error`] and [`Result`]

pub mod error;

pub use error::{Error, Result};
