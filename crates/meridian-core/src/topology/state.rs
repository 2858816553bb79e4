//! State tags carried by every derived topology, and the descriptor used to
//! look topologies up in the cache and in storage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a topology's edges point in the original or reversed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransposeKind {
    /// Original direction.
    No,
    /// Every edge reversed.
    Yes,
    /// Wildcard, only meaningful in a lookup.
    Any,
}

/// How edges are ordered inside each node's out-edge range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeSortKind {
    /// No ordering guarantee. In a lookup, matches any stored ordering.
    Any,
    /// Destination id ascending.
    ByDestId,
    /// Edge type ascending, then destination id ascending.
    ByEdgeType,
    /// Destination node type ascending. Not implemented.
    ByNodeType,
}

/// How node ids are permuted relative to the canonical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeSortKind {
    /// Canonical node order. In a lookup, matches any stored ordering.
    Any,
    /// Out-degree order (see [`DegreeOrder`](crate::config::DegreeOrder)).
    ByDegree,
    /// Node type ascending, then original node id ascending.
    ByNodeType,
}

/// Which topology variant a descriptor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyKind {
    /// Edge reordering and/or transpose with nodes in canonical order.
    EdgeShuffle,
    /// Edge shuffle plus a node permutation.
    Shuffle,
    /// Type-sorted edge shuffle with a per-(node, type) index.
    EdgeTypeAware,
}

impl TransposeKind {
    fn satisfied_by(self, stored: Self) -> bool {
        self == Self::Any || self == stored
    }
}

impl EdgeSortKind {
    fn satisfied_by(self, stored: Self) -> bool {
        self == Self::Any || self == stored
    }
}

impl NodeSortKind {
    fn satisfied_by(self, stored: Self) -> bool {
        self == Self::Any || self == stored
    }
}

/// Query object describing the characteristics of a wanted topology.
///
/// A "shadow" descriptor never materializes data. The cache and the storage
/// collaborator both search with it; any field set to `Any` matches every
/// stored value for that field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShadowDescriptor {
    /// Variant being requested or described.
    pub kind: TopologyKind,
    /// Edge direction.
    pub transpose: TransposeKind,
    /// Ordering within each node's edge range.
    pub edge_sort: EdgeSortKind,
    /// Node permutation.
    pub node_sort: NodeSortKind,
}

impl ShadowDescriptor {
    /// Descriptor for an [`EdgeShuffleTopology`](super::EdgeShuffleTopology).
    #[must_use]
    pub const fn edge_shuffle(transpose: TransposeKind, edge_sort: EdgeSortKind) -> Self {
        Self {
            kind: TopologyKind::EdgeShuffle,
            transpose,
            edge_sort,
            node_sort: NodeSortKind::Any,
        }
    }

    /// Descriptor for a [`ShuffleTopology`](super::ShuffleTopology).
    #[must_use]
    pub const fn shuffle(
        transpose: TransposeKind,
        node_sort: NodeSortKind,
        edge_sort: EdgeSortKind,
    ) -> Self {
        Self {
            kind: TopologyKind::Shuffle,
            transpose,
            edge_sort,
            node_sort,
        }
    }

    /// Descriptor for an [`EdgeTypeAwareTopology`](super::EdgeTypeAwareTopology).
    #[must_use]
    pub const fn edge_type_aware(transpose: TransposeKind) -> Self {
        Self {
            kind: TopologyKind::EdgeTypeAware,
            transpose,
            edge_sort: EdgeSortKind::ByEdgeType,
            node_sort: NodeSortKind::Any,
        }
    }

    /// Returns true if a topology described by `stored` satisfies this query.
    ///
    /// Kinds must be equal. Every other field matches exactly, or matches
    /// anything when this descriptor holds `Any`.
    #[must_use]
    pub fn matches(&self, stored: &ShadowDescriptor) -> bool {
        self.kind == stored.kind
            && self.transpose.satisfied_by(stored.transpose)
            && self.edge_sort.satisfied_by(stored.edge_sort)
            && self.node_sort.satisfied_by(stored.node_sort)
    }

    /// Same query with every wildcard replaced by the value a fresh build
    /// would produce.
    ///
    /// Transpose `Any` resolves to `No`. Sort wildcards stay `Any` because
    /// "unsorted" is itself a valid state.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        if self.transpose == TransposeKind::Any {
            self.transpose = TransposeKind::No;
        }
        self
    }
}

impl fmt::Display for ShadowDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}(transpose={:?}, edges={:?}, nodes={:?})",
            self.kind, self.transpose, self.edge_sort, self.node_sort
        )
    }
}
