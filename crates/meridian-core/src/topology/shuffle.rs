//! Node permutations on top of an edge shuffle.

use std::cmp::Ordering;

use meridian_common::{EdgeId, Error, NodeId, Result};
use rayon::prelude::*;

use super::edge_shuffle::reject_unsupported_sort;
use super::{
    EdgeShuffleTopology, EdgeSortKind, GraphTopology, NodeSortKind, ShadowDescriptor,
    TopologyKind, TopologyView, TransposeKind, find_edge_in, sort_edge_ranges, split_ranges_mut,
};
use crate::config::DegreeOrder;
use crate::graph::PropertyGraph;
use crate::parallel::prefix_sum_in_place;
use crate::storage::{StoredTopology, TopologyRecord};

/// An edge shuffle whose node ids are also permuted.
///
/// `node_prop_indices[n]` is the canonical id of physical node `n`;
/// destinations are expressed in the permuted id space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleTopology {
    topology: GraphTopology,
    edge_prop_indices: Vec<EdgeId>,
    node_prop_indices: Vec<NodeId>,
    transpose_state: TransposeKind,
    edge_sort_state: EdgeSortKind,
    node_sort_state: NodeSortKind,
}

impl TopologyView for ShuffleTopology {
    fn csr(&self) -> &GraphTopology {
        &self.topology
    }
}

impl ShuffleTopology {
    /// Builds the node sort described by `node_sort` over `seed`, then
    /// applies `edge_sort`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`] for `NodeSortKind::Any` (no node
    /// permutation, which is an edge shuffle) and for
    /// `EdgeSortKind::ByNodeType`.
    pub fn make(
        graph: &dyn PropertyGraph,
        seed: &EdgeShuffleTopology,
        node_sort: NodeSortKind,
        edge_sort: EdgeSortKind,
        degree_order: DegreeOrder,
    ) -> Result<Self> {
        reject_unsupported_sort(edge_sort)?;
        match node_sort {
            NodeSortKind::ByDegree => {
                Ok(Self::make_sorted_by_degree(graph, seed, degree_order, edge_sort))
            }
            NodeSortKind::ByNodeType => Ok(Self::make_sorted_by_node_type(graph, seed, edge_sort)),
            NodeSortKind::Any => Err(Error::not_implemented(
                "shuffle topology without a node sort",
            )),
        }
    }

    /// Nodes ordered by out-degree in `order`, ties by canonical id.
    #[must_use]
    pub fn make_sorted_by_degree(
        graph: &dyn PropertyGraph,
        seed: &EdgeShuffleTopology,
        order: DegreeOrder,
        edge_sort: EdgeSortKind,
    ) -> Self {
        Self::make_node_sorted_topo(
            graph,
            seed,
            |a, b| order.compare(seed.degree(a), seed.degree(b)).then(a.cmp(&b)),
            NodeSortKind::ByDegree,
            edge_sort,
        )
    }

    /// Nodes ordered by node type ascending, ties by canonical id.
    #[must_use]
    pub fn make_sorted_by_node_type(
        graph: &dyn PropertyGraph,
        seed: &EdgeShuffleTopology,
        edge_sort: EdgeSortKind,
    ) -> Self {
        Self::make_node_sorted_topo(
            graph,
            seed,
            |a, b| graph.type_of_node(a).cmp(&graph.type_of_node(b)).then(a.cmp(&b)),
            NodeSortKind::ByNodeType,
            edge_sort,
        )
    }

    /// Permutes nodes by `compare` and rebuilds the CSR.
    ///
    /// New adjacency comes from gathering each new-order node's degree and
    /// prefix-summing. Edges are then scattered per node, with destinations
    /// translated through the permutation. The comparator must be a total
    /// order for the result to be deterministic.
    ///
    /// Edge order within a node is not meaningful after the scatter, so
    /// `edge_sort` is re-applied at the end.
    pub fn make_node_sorted_topo<F>(
        graph: &dyn PropertyGraph,
        seed: &EdgeShuffleTopology,
        compare: F,
        node_sort: NodeSortKind,
        edge_sort: EdgeSortKind,
    ) -> Self
    where
        F: Fn(NodeId, NodeId) -> Ordering + Sync,
    {
        let num_nodes = seed.num_nodes();
        let num_edges = seed.num_edges();

        let mut node_prop_indices: Vec<NodeId> = seed.nodes().collect();
        node_prop_indices.par_sort_unstable_by(|&a, &b| compare(a, b));

        let mut old_to_new: Vec<NodeId> = vec![0; num_nodes];
        for (new, &old) in node_prop_indices.iter().enumerate() {
            old_to_new[old as usize] = new as NodeId;
        }

        let mut adj_indices: Vec<u64> = node_prop_indices
            .par_iter()
            .map(|&old| seed.degree(old))
            .collect();
        prefix_sum_in_place(&mut adj_indices);

        let mut dests: Vec<NodeId> = vec![0; num_edges];
        let mut edge_prop_indices: Vec<EdgeId> = vec![0; num_edges];
        split_ranges_mut(&adj_indices, &mut dests, &mut edge_prop_indices)
            .into_par_iter()
            .zip(node_prop_indices.par_iter())
            .for_each(|((dests, props), &old)| {
                for (slot, edge) in seed.out_edges(old).enumerate() {
                    dests[slot] = old_to_new[seed.out_edge_dst(edge) as usize];
                    props[slot] = seed.edge_property_index(edge);
                }
            });

        let mut topo = Self {
            topology: GraphTopology::new(adj_indices, dests),
            edge_prop_indices,
            node_prop_indices,
            transpose_state: seed.transpose_state(),
            edge_sort_state: EdgeSortKind::Any,
            node_sort_state: node_sort,
        };
        topo.sort_edges(graph, edge_sort);
        topo
    }

    /// Adopts a persisted shuffle topology, releasing the storage binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the record is not a shuffle
    /// topology or lacks either property index.
    pub fn from_stored(stored: StoredTopology) -> Result<Self> {
        let desc = stored.descriptor();
        if desc.kind != TopologyKind::Shuffle || desc.transpose == TransposeKind::Any {
            return Err(Error::invalid_argument(format!(
                "cannot load {desc} as a shuffle topology"
            )));
        }
        stored.record().validate()?;
        let (Some(edge_props), Some(node_props)) =
            (stored.edge_prop_indices(), stored.node_prop_indices())
        else {
            return Err(Error::invalid_argument(format!(
                "stored {desc} is missing property indices"
            )));
        };

        let topo = Self {
            topology: GraphTopology::new(stored.adj_indices().to_vec(), stored.dests().to_vec()),
            edge_prop_indices: edge_props.to_vec(),
            node_prop_indices: node_props.to_vec(),
            transpose_state: desc.transpose,
            edge_sort_state: desc.edge_sort,
            node_sort_state: desc.node_sort,
        };
        stored.release();
        Ok(topo)
    }

    fn sort_edges(&mut self, graph: &dyn PropertyGraph, edge_sort: EdgeSortKind) {
        let (bounds, dests) = self.topology.parts_mut();
        match edge_sort {
            EdgeSortKind::ByDestId => {
                sort_edge_ranges(bounds, dests, &mut self.edge_prop_indices, |dst, prop| {
                    (dst, prop)
                });
            }
            EdgeSortKind::ByEdgeType => {
                sort_edge_ranges(bounds, dests, &mut self.edge_prop_indices, |dst, prop| {
                    (graph.type_of_edge(prop), dst, prop)
                });
            }
            // ByNodeType is rejected before any work starts.
            EdgeSortKind::Any | EdgeSortKind::ByNodeType => return,
        }
        self.edge_sort_state = edge_sort;
    }

    /// First edge `src -> dst` in permuted ids.
    #[must_use]
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        find_edge_in(
            &self.topology,
            self.edge_sort_state == EdgeSortKind::ByDestId,
            src,
            dst,
        )
    }

    /// Canonical id of physical node `node`.
    #[inline]
    #[must_use]
    pub fn node_property_index(&self, node: NodeId) -> NodeId {
        self.node_prop_indices[node as usize]
    }

    /// Stable id of physical edge `edge`.
    #[inline]
    #[must_use]
    pub fn edge_property_index(&self, edge: EdgeId) -> EdgeId {
        self.edge_prop_indices[edge as usize]
    }

    /// The full node property index (new id to canonical id).
    #[must_use]
    pub fn node_prop_indices(&self) -> &[NodeId] {
        &self.node_prop_indices
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

    /// How nodes are permuted.
    #[must_use]
    pub fn node_sort_state(&self) -> NodeSortKind {
        self.node_sort_state
    }

    /// Descriptor of this topology's actual state.
    #[must_use]
    pub fn descriptor(&self) -> ShadowDescriptor {
        ShadowDescriptor::shuffle(self.transpose_state, self.node_sort_state, self.edge_sort_state)
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
        record.node_prop_indices = Some(self.node_prop_indices.clone());
        StoredTopology::new(record)
    }
}
