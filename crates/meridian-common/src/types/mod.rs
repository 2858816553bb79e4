//! Core type definitions.
//!
//! - Dense identifiers ([`NodeId`], [`EdgeId`]) used as CSR array indices
//! - Sparse entity type identifiers ([`EntityTypeId`])

mod id;

pub use id::{EdgeId, EntityTypeId, NodeId};
