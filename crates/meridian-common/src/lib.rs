//! # meridian-common
//!
//! Foundation types shared by every Meridian crate.
//!
//! ## Modules
//!
//! - [`types`] - Node, edge and entity-type identifiers
//! - [`collections`] - Hash map aliases with consistent hashing
//! - [`utils`] - The crate-wide [`Error`](utils::Error) and [`Result`](utils::Result)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod types;
pub mod utils;

pub use types::{EdgeId, EntityTypeId, NodeId};
pub use utils::{Error, Result};
