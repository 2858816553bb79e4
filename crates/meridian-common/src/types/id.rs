//! Identifier types for graph elements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense node identifier in `[0, num_nodes)`.
///
/// Nodes index directly into adjacency arrays, so the id is a plain integer
/// rather than a wrapper.
pub type NodeId = u32;

/// Dense edge identifier in `[0, num_edges)`.
///
/// Edge ids are local to one topology's physical array layout. Reordered
/// topologies carry an edge property index to get back to the stable id.
pub type EdgeId = u64;

/// Externally assigned entity type identifier for a node or an edge.
///
/// Type ids are sparse in `0..=255`; `0` is reserved for "unknown".
/// The condensed type map in `meridian-core` maps the ids that actually
/// occur onto a dense index space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct EntityTypeId(pub u8);

impl EntityTypeId {
    /// The reserved "unknown" type.
    pub const UNKNOWN: Self = Self(0);

    /// Number of distinct values an entity type id can take.
    pub const CARDINALITY: usize = u8::MAX as usize + 1;

    /// Creates a new EntityTypeId from a raw u8 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the raw u8 value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the id as an array index.
    #[inline]
    #[must_use]
    pub const fn as_index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is a known (non-reserved) type.
    #[inline]
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "EntityTypeId({})", self.0)
        } else {
            write!(f, "EntityTypeId(UNKNOWN)")
        }
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for EntityTypeId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl From<EntityTypeId> for u8 {
    fn from(id: EntityTypeId) -> Self {
        id.0
    }
}
