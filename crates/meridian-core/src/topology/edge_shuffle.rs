//! Edge permutations and transposes of the canonical topology.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use meridian_common::{EdgeId, Error, NodeId, Result};
use rayon::prelude::*;

use super::{
    EdgeSortKind, GraphTopology, NodeSortKind, ShadowDescriptor, TopologyKind, TopologyView,
    TransposeKind, equal_range_in, find_edge_in, is_sorted_by_dest, sort_edge_ranges,
};
use crate::graph::PropertyGraph;
use crate::parallel::prefix::{exclusive_begin, prefix_sum_in_place};
use crate::storage::{StoredTopology, TopologyRecord};

/// A topology whose edges may be reordered and/or reversed, with nodes kept
/// in canonical order.
///
/// `edge_prop_indices[e]` is the stable id of physical edge `e`, so edge
/// properties stay addressable after any reordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeShuffleTopology {
    topology: GraphTopology,
    edge_prop_indices: Vec<EdgeId>,
    transpose_state: TransposeKind,
    edge_sort_state: EdgeSortKind,
}

impl Default for EdgeShuffleTopology {
    fn default() -> Self {
        Self {
            topology: GraphTopology::default(),
            edge_prop_indices: Vec::new(),
            transpose_state: TransposeKind::No,
            edge_sort_state: EdgeSortKind::Any,
        }
    }
}

impl TopologyView for EdgeShuffleTopology {
    fn csr(&self) -> &GraphTopology {
        &self.topology
    }
}

impl EdgeShuffleTopology {
    /// Builds the variant described by `transpose` and `edge_sort` from the
    /// graph's canonical topology.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`] for [`EdgeSortKind::ByNodeType`].
    pub fn make(
        graph: &dyn PropertyGraph,
        transpose: TransposeKind,
        edge_sort: EdgeSortKind,
    ) -> Result<Self> {
        reject_unsupported_sort(edge_sort)?;
        let mut topo = match transpose {
            TransposeKind::Yes => Self::make_transpose_copy(graph),
            TransposeKind::No | TransposeKind::Any => Self::make_original_copy(graph),
        };
        topo.apply_edge_sort(graph, edge_sort)?;
        Ok(topo)
    }

    /// Deep copy of the canonical topology with an identity property index.
    #[must_use]
    pub fn make_original_copy(graph: &dyn PropertyGraph) -> Self {
        let topology = graph.topology().copy();
        let edge_prop_indices = topology.all_edges().into_par_iter().collect();
        Self {
            topology,
            edge_prop_indices,
            transpose_state: TransposeKind::No,
            edge_sort_state: EdgeSortKind::Any,
        }
    }

    /// Transpose of the canonical topology.
    ///
    /// Edge order inside each node is unspecified; sort afterwards if a
    /// guarantee is needed.
    #[must_use]
    pub fn make_transpose_copy(graph: &dyn PropertyGraph) -> Self {
        let (topology, edge_prop_indices) = transpose_csr(graph.topology(), None);
        Self {
            topology,
            edge_prop_indices,
            transpose_state: TransposeKind::Yes,
            edge_sort_state: EdgeSortKind::Any,
        }
    }

    /// Transpose of this topology.
    ///
    /// Property indices are carried through, so the result still addresses
    /// the original edges. The transpose state flips and the edge sort state
    /// resets to `Any`.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let (topology, edge_prop_indices) =
            transpose_csr(&self.topology, Some(&self.edge_prop_indices));
        let transpose_state = match self.transpose_state {
            TransposeKind::Yes => TransposeKind::No,
            TransposeKind::No | TransposeKind::Any => TransposeKind::Yes,
        };
        Self {
            topology,
            edge_prop_indices,
            transpose_state,
            edge_sort_state: EdgeSortKind::Any,
        }
    }

    /// Adopts a persisted edge shuffle topology.
    ///
    /// The arrays are copied into owned memory and the storage binding is
    /// released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the record is not an edge
    /// shuffle, has inconsistent array lengths, or lacks property indices
    /// for a reordered layout.
    pub fn from_stored(stored: StoredTopology) -> Result<Self> {
        let desc = stored.descriptor();
        if desc.kind != TopologyKind::EdgeShuffle || desc.transpose == TransposeKind::Any {
            return Err(Error::invalid_argument(format!(
                "cannot load {desc} as an edge shuffle topology"
            )));
        }
        reject_node_sort_on_edge_shuffle(&desc)?;
        stored.record().validate()?;

        let topology = GraphTopology::new(stored.adj_indices().to_vec(), stored.dests().to_vec());
        let edge_prop_indices = match stored.edge_prop_indices() {
            Some(props) => props.to_vec(),
            None if desc.transpose == TransposeKind::No && desc.edge_sort == EdgeSortKind::Any => {
                topology.all_edges().collect()
            }
            None => {
                return Err(Error::invalid_argument(format!(
                    "stored {desc} has no edge property indices"
                )));
            }
        };
        stored.release();

        Ok(Self {
            topology,
            edge_prop_indices,
            transpose_state: desc.transpose,
            edge_sort_state: desc.edge_sort,
        })
    }

    pub(crate) fn apply_edge_sort(
        &mut self,
        graph: &dyn PropertyGraph,
        edge_sort: EdgeSortKind,
    ) -> Result<()> {
        match edge_sort {
            EdgeSortKind::Any => {}
            EdgeSortKind::ByDestId => self.sort_edges_by_dest_id(),
            EdgeSortKind::ByEdgeType => self.sort_edges_by_type_then_dest(graph),
            EdgeSortKind::ByNodeType => reject_unsupported_sort(edge_sort)?,
        }
        Ok(())
    }

    /// Sorts every node's edges by destination, carrying property indices.
    pub fn sort_edges_by_dest_id(&mut self) {
        let (bounds, dests) = self.topology.parts_mut();
        sort_edge_ranges(bounds, dests, &mut self.edge_prop_indices, |dst, prop| {
            (dst, prop)
        });
        self.edge_sort_state = EdgeSortKind::ByDestId;
        debug_assert!(is_sorted_by_dest(&self.topology));
    }

    /// Sorts every node's edges by edge type, then destination.
    ///
    /// Types are looked up through the property index, so this works on
    /// any previously shuffled layout.
    pub fn sort_edges_by_type_then_dest(&mut self, graph: &dyn PropertyGraph) {
        let (bounds, dests) = self.topology.parts_mut();
        sort_edge_ranges(bounds, dests, &mut self.edge_prop_indices, |dst, prop| {
            (graph.type_of_edge(prop), dst, prop)
        });
        self.edge_sort_state = EdgeSortKind::ByEdgeType;
    }

    /// First edge `src -> dst`, if any.
    ///
    /// Degrees up to [`LINEAR_SEARCH_THRESHOLD`](super::LINEAR_SEARCH_THRESHOLD)
    /// are scanned. Larger ranges are binary searched when sorted by
    /// destination, otherwise scanned with a performance warning.
    #[must_use]
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        find_edge_in(&self.topology, self.has_edges_sorted_by_dest_id(), src, dst)
    }

    /// All edges `src -> dst`, as a contiguous range (possibly empty).
    ///
    /// # Panics
    ///
    /// Panics if edges are not sorted by destination. Calling this on an
    /// unsorted topology is a programming error.
    #[must_use]
    pub fn find_all_edges(&self, src: NodeId, dst: NodeId) -> Range<EdgeId> {
        assert!(
            self.has_edges_sorted_by_dest_id(),
            "find_all_edges requires edges sorted by destination"
        );
        equal_range_in(&self.topology, self.topology.out_edges(src), dst)
    }

    /// Stable id of physical edge `edge`.
    #[inline]
    #[must_use]
    pub fn edge_property_index(&self, edge: EdgeId) -> EdgeId {
        self.edge_prop_indices[edge as usize]
    }

    /// The full edge property index.
    #[must_use]
    pub fn edge_prop_indices(&self) -> &[EdgeId] {
        &self.edge_prop_indices
    }

    /// Whether edges are reversed.
    #[must_use]
    pub fn transpose_state(&self) -> TransposeKind {
        self.transpose_state
    }

    /// How edges are ordered within each node.
    #[must_use]
    pub fn edge_sort_state(&self) -> EdgeSortKind {
        self.edge_sort_state
    }

    /// Returns true if edges are reversed.
    #[must_use]
    pub fn is_transposed(&self) -> bool {
        self.transpose_state == TransposeKind::Yes
    }

    /// Returns true if each node's edges are sorted by destination.
    #[must_use]
    pub fn has_edges_sorted_by_dest_id(&self) -> bool {
        self.edge_sort_state == EdgeSortKind::ByDestId
    }

    /// Descriptor of this topology's actual state.
    #[must_use]
    pub fn descriptor(&self) -> ShadowDescriptor {
        ShadowDescriptor::edge_shuffle(self.transpose_state, self.edge_sort_state)
    }

    /// Serializes this topology for storage.
    #[must_use]
    pub fn to_stored(&self) -> StoredTopology {
        let mut record = TopologyRecord::new(
            self.descriptor(),
            self.topology.adj_indices().to_vec(),
            self.topology.dests().to_vec(),
        );
        record.edge_prop_indices = Some(self.edge_prop_indices.clone());
        StoredTopology::new(record)
    }

    pub(crate) fn from_parts(
        topology: GraphTopology,
        edge_prop_indices: Vec<EdgeId>,
        transpose_state: TransposeKind,
        edge_sort_state: EdgeSortKind,
    ) -> Self {
        debug_assert_eq!(topology.num_edges(), edge_prop_indices.len());
        Self {
            topology,
            edge_prop_indices,
            transpose_state,
            edge_sort_state,
        }
    }
}

pub(crate) fn reject_unsupported_sort(edge_sort: EdgeSortKind) -> Result<()> {
    if edge_sort == EdgeSortKind::ByNodeType {
        return Err(Error::not_implemented(
            "sorting edges by destination node type",
        ));
    }
    Ok(())
}

fn reject_node_sort_on_edge_shuffle(desc: &ShadowDescriptor) -> Result<()> {
    if desc.node_sort != NodeSortKind::Any {
        return Err(Error::invalid_argument(format!(
            "{desc}: edge shuffle topologies keep nodes in canonical order"
        )));
    }
    Ok(())
}

/// Three-phase parallel counting sort that reverses every edge.
///
/// 1. Count in-degrees with atomic increments (out-degrees of the result).
/// 2. Prefix-sum the counts into adjacency boundaries.
/// 3. Each original edge `src -> dst` takes the next slot of `dst`'s range
///    with an atomic fetch-add, writes `src` there and records its property
///    index.
///
/// Cursors are per destination, so phase 3 only contends on the increment.
fn transpose_csr(
    topology: &GraphTopology,
    prop_indices: Option<&[EdgeId]>,
) -> (GraphTopology, Vec<EdgeId>) {
    let num_nodes = topology.num_nodes();
    let num_edges = topology.num_edges();

    let counts: Vec<AtomicU64> = (0..num_nodes).map(|_| AtomicU64::new(0)).collect();
    topology.dests().par_iter().for_each(|&dst| {
        counts[dst as usize].fetch_add(1, Ordering::Relaxed);
    });

    let mut adj_indices: Vec<u64> = counts.into_iter().map(AtomicU64::into_inner).collect();
    prefix_sum_in_place(&mut adj_indices);

    let cursors: Vec<AtomicU64> = (0..num_nodes)
        .map(|n| AtomicU64::new(exclusive_begin(&adj_indices, n)))
        .collect();
    let dests: Vec<AtomicU32> = (0..num_edges).map(|_| AtomicU32::new(0)).collect();
    let props: Vec<AtomicU64> = (0..num_edges).map(|_| AtomicU64::new(0)).collect();

    topology.nodes().into_par_iter().for_each(|src| {
        for edge in topology.out_edges(src) {
            let dst = topology.out_edge_dst(edge);
            let slot = cursors[dst as usize].fetch_add(1, Ordering::Relaxed) as usize;
            dests[slot].store(src, Ordering::Relaxed);
            let prop = prop_indices.map_or(edge, |p| p[edge as usize]);
            props[slot].store(prop, Ordering::Relaxed);
        }
    });

    let dests = dests.into_iter().map(AtomicU32::into_inner).collect();
    let props = props.into_iter().map(AtomicU64::into_inner).collect();
    (GraphTopology::new(adj_indices, dests), props)
}
