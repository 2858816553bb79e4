//! Per-(node, edge type) adjacency over a type-sorted edge shuffle.

use std::ops::Range;

use meridian_common::{EdgeId, EntityTypeId, Error, NodeId, Result};
use rayon::prelude::*;

use super::{
    CondensedTypeIdMap, EdgeShuffleTopology, EdgeSortKind, GraphTopology, ShadowDescriptor,
    TopologyKind, TopologyView, TransposeKind, equal_range_in,
};
use crate::graph::PropertyGraph;
use crate::storage::{StoredTopology, TopologyRecord};

/// An edge shuffle sorted by edge type, plus an `O(1)` index from
/// `(node, type)` to that type's sub-range of the node's edges.
///
/// `per_type_adj[node * k + t]` is the exclusive end of type index `t`'s
/// segment for `node`, where `k` is the number of condensed types. A type
/// with no edges at a node has an empty segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTypeAwareTopology {
    shuffle: EdgeShuffleTopology,
    type_map: CondensedTypeIdMap,
    per_type_adj: Vec<u64>,
}

impl TopologyView for EdgeTypeAwareTopology {
    fn csr(&self) -> &GraphTopology {
        self.shuffle.csr()
    }
}

impl EdgeTypeAwareTopology {
    /// Builds the per-type index over `seed`, taking ownership of it.
    ///
    /// # Panics
    ///
    /// Panics if `seed` is not sorted by edge type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an edge carries a type that
    /// `type_map` does not contain.
    pub fn make(
        graph: &dyn PropertyGraph,
        seed: EdgeShuffleTopology,
        type_map: &CondensedTypeIdMap,
    ) -> Result<Self> {
        assert_eq!(
            seed.edge_sort_state(),
            EdgeSortKind::ByEdgeType,
            "edge type aware topology requires edges sorted by edge type"
        );
        let per_type_adj = create_per_edge_type_adjacency_index(graph, &seed, type_map)?;
        Ok(Self {
            shuffle: seed,
            type_map: type_map.clone(),
            per_type_adj,
        })
    }

    /// Adopts a persisted topology after checking its type map against the
    /// live one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stale`] if the stored type map differs from
    /// `live_map`, and [`Error::InvalidArgument`] if the record is not an
    /// edge-type-aware topology or is missing arrays.
    pub fn from_stored(stored: StoredTopology, live_map: &CondensedTypeIdMap) -> Result<Self> {
        let desc = stored.descriptor();
        if desc.kind != TopologyKind::EdgeTypeAware
            || desc.transpose == TransposeKind::Any
            || desc.edge_sort != EdgeSortKind::ByEdgeType
        {
            return Err(Error::invalid_argument(format!(
                "cannot load {desc} as an edge type aware topology"
            )));
        }
        stored.record().validate()?;
        let (Some(props), Some(types), Some(per_type)) = (
            stored.edge_prop_indices(),
            stored.edge_type_ids(),
            stored.per_type_adj_indices(),
        ) else {
            return Err(Error::invalid_argument(format!(
                "stored {desc} is missing edge type arrays"
            )));
        };
        live_map.check_compatible(types)?;

        let shuffle = EdgeShuffleTopology::from_parts(
            GraphTopology::new(stored.adj_indices().to_vec(), stored.dests().to_vec()),
            props.to_vec(),
            desc.transpose,
            EdgeSortKind::ByEdgeType,
        );
        let topo = Self {
            shuffle,
            type_map: live_map.clone(),
            per_type_adj: per_type.to_vec(),
        };
        stored.release();
        Ok(topo)
    }

    /// Edges of `node` carrying type `ty`. Empty if `ty` does not occur.
    #[must_use]
    pub fn edges_of_type(&self, node: NodeId, ty: EntityTypeId) -> Range<EdgeId> {
        let all = self.out_edges(node);
        match self.type_map.get_index(ty) {
            Some(index) => self.segment(node, index, all.start),
            None => all.start..all.start,
        }
    }

    /// Number of edges of type `ty` leaving `node`.
    #[must_use]
    pub fn out_degree_of_type(&self, node: NodeId, ty: EntityTypeId) -> u64 {
        let range = self.edges_of_type(node, ty);
        range.end - range.start
    }

    /// First edge `src -> dst` of type `ty`.
    #[must_use]
    pub fn find_edge_of_type(&self, src: NodeId, dst: NodeId, ty: EntityTypeId) -> Option<EdgeId> {
        let found = self.find_all_edges_of_type(src, dst, ty);
        (!found.is_empty()).then_some(found.start)
    }

    /// All edges `src -> dst` of type `ty`. Segments are sorted by
    /// destination, so matches are contiguous.
    #[must_use]
    pub fn find_all_edges_of_type(
        &self,
        src: NodeId,
        dst: NodeId,
        ty: EntityTypeId,
    ) -> Range<EdgeId> {
        equal_range_in(self.csr(), self.edges_of_type(src, ty), dst)
    }

    fn segment(&self, node: NodeId, index: usize, node_begin: EdgeId) -> Range<EdgeId> {
        let k = self.type_map.num_unique_types();
        let base = node as usize * k;
        let begin = if index == 0 {
            node_begin
        } else {
            self.per_type_adj[base + index - 1]
        };
        begin..self.per_type_adj[base + index]
    }

    /// Stable id of physical edge `edge`.
    #[inline]
    #[must_use]
    pub fn edge_property_index(&self, edge: EdgeId) -> EdgeId {
        self.shuffle.edge_property_index(edge)
    }

    /// The condensed edge type map this index was built against.
    #[must_use]
    pub fn type_map(&self) -> &CondensedTypeIdMap {
        &self.type_map
    }

    /// Raw per-(node, type) exclusive ends.
    #[must_use]
    pub fn per_type_adj_indices(&self) -> &[u64] {
        &self.per_type_adj
    }

    /// The underlying type-sorted edge shuffle.
    #[must_use]
    pub fn edge_shuffle(&self) -> &EdgeShuffleTopology {
        &self.shuffle
    }

    /// Whether edges are reversed.
    #[must_use]
    pub fn transpose_state(&self) -> TransposeKind {
        self.shuffle.transpose_state()
    }

    /// Descriptor of this topology's actual state.
    #[must_use]
    pub fn descriptor(&self) -> ShadowDescriptor {
        ShadowDescriptor::edge_type_aware(self.transpose_state())
    }

    /// Serializes this topology, including the type map used for the
    /// staleness check on load.
    #[must_use]
    pub fn to_stored(&self) -> StoredTopology {
        let csr = self.csr();
        let mut record = TopologyRecord::new(
            self.descriptor(),
            csr.adj_indices().to_vec(),
            csr.dests().to_vec(),
        );
        record.edge_prop_indices = Some(self.shuffle.edge_prop_indices().to_vec());
        record.edge_type_ids = Some(self.type_map.index_to_type().to_vec());
        record.per_type_adj_indices = Some(self.per_type_adj.clone());
        StoredTopology::new(record)
    }
}

/// One merge-style pass per node: whenever the edge type advances past the
/// next expected type index, the skipped types end at the current edge.
/// Trailing types end at the node's range end.
fn create_per_edge_type_adjacency_index(
    graph: &dyn PropertyGraph,
    seed: &EdgeShuffleTopology,
    type_map: &CondensedTypeIdMap,
) -> Result<Vec<u64>> {
    let k = type_map.num_unique_types();
    if k == 0 {
        if seed.num_edges() > 0 {
            return Err(Error::invalid_argument(
                "edge type map is empty but the topology has edges",
            ));
        }
        return Ok(Vec::new());
    }

    let mut per_type_adj = vec![0u64; seed.num_nodes() * k];
    per_type_adj
        .par_chunks_mut(k)
        .zip(seed.nodes().into_par_iter())
        .try_for_each(|(ends, node)| {
            let range = seed.out_edges(node);
            let mut next = 0usize;
            for edge in range.clone() {
                let ty = graph.type_of_edge(seed.edge_property_index(edge));
                let index = type_map.get_index(ty).ok_or_else(|| {
                    Error::invalid_argument(format!("edge type {ty} missing from type map"))
                })?;
                debug_assert!(index >= next, "edges of node {node} not sorted by type");
                while next < index {
                    ends[next] = edge;
                    next += 1;
                }
            }
            while next < k {
                ends[next] = range.end;
                next += 1;
            }
            Ok(())
        })?;
    Ok(per_type_adj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LpgGraph, LpgGraphBuilder};

    // Node 0 -> 1 (A), 0 -> 2 (B), 0 -> 3 (A); node 2 -> 0 (B).
    fn typed_graph() -> (LpgGraph, EntityTypeId, EntityTypeId) {
        let mut builder = LpgGraphBuilder::new(4);
        let a = builder.edge_type("A").unwrap();
        let b = builder.edge_type("B").unwrap();
        builder
            .add_edge(0, 1, a)
            .add_edge(0, 2, b)
            .add_edge(0, 3, a)
            .add_edge(2, 0, b);
        (builder.build().unwrap(), a, b)
    }

    fn build(graph: &LpgGraph) -> EdgeTypeAwareTopology {
        let map = CondensedTypeIdMap::make_from_edge_types(graph);
        let seed = EdgeShuffleTopology::make(graph, TransposeKind::No, EdgeSortKind::ByEdgeType)
            .unwrap();
        EdgeTypeAwareTopology::make(graph, seed, &map).unwrap()
    }

    #[test]
    fn test_edges_of_type() {
        let (graph, a, b) = typed_graph();
        let topo = build(&graph);

        let dests: Vec<NodeId> = topo
            .edges_of_type(0, a)
            .map(|e| topo.out_edge_dst(e))
            .collect();
        assert_eq!(dests, vec![1, 3]);
        assert_eq!(topo.out_degree_of_type(0, b), 1);
        assert_eq!(topo.out_degree_of_type(1, a), 0);
        assert_eq!(topo.out_degree_of_type(2, a), 0);
        assert_eq!(topo.out_degree_of_type(2, b), 1);
    }

    #[test]
    fn test_segments_partition_each_node() {
        let (graph, a, b) = typed_graph();
        let topo = build(&graph);
        let total: u64 = topo
            .nodes()
            .map(|n| topo.out_degree_of_type(n, a) + topo.out_degree_of_type(n, b))
            .sum();
        assert_eq!(total, topo.num_edges() as u64);
        for n in topo.nodes() {
            let all = topo.out_edges(n);
            assert_eq!(topo.edges_of_type(n, a).start, all.start);
            assert_eq!(topo.edges_of_type(n, b).end, all.end);
        }
    }

    #[test]
    fn test_unknown_type_is_empty() {
        let (graph, _, _) = typed_graph();
        let topo = build(&graph);
        assert!(topo.edges_of_type(0, EntityTypeId::new(200)).is_empty());
        assert_eq!(topo.find_edge_of_type(0, 1, EntityTypeId::new(200)), None);
    }

    #[test]
    fn test_find_edge_of_type() {
        let (graph, a, b) = typed_graph();
        let topo = build(&graph);
        let edge = topo.find_edge_of_type(0, 3, a).unwrap();
        assert_eq!(topo.out_edge_dst(edge), 3);
        assert_eq!(graph.type_of_edge(topo.edge_property_index(edge)), a);
        assert_eq!(topo.find_edge_of_type(0, 3, b), None);
        assert_eq!(topo.find_all_edges_of_type(0, 2, b).count(), 1);
    }

    #[test]
    #[should_panic(expected = "requires edges sorted by edge type")]
    fn test_requires_type_sorted_seed() {
        let (graph, _, _) = typed_graph();
        let map = CondensedTypeIdMap::make_from_edge_types(&graph);
        let seed = EdgeShuffleTopology::make_original_copy(&graph);
        let _ = EdgeTypeAwareTopology::make(&graph, seed, &map);
    }

    #[test]
    fn test_type_missing_from_map() {
        let (graph, _, _) = typed_graph();
        let map = CondensedTypeIdMap::from_index_to_type(&[EntityTypeId::new(1)]).unwrap();
        let seed = EdgeShuffleTopology::make(&graph, TransposeKind::No, EdgeSortKind::ByEdgeType)
            .unwrap();
        let result = EdgeTypeAwareTopology::make(&graph, seed, &map);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_stored_round_trip() {
        let (graph, _, _) = typed_graph();
        let topo = build(&graph);
        let loaded = EdgeTypeAwareTopology::from_stored(topo.to_stored(), topo.type_map()).unwrap();
        assert_eq!(topo, loaded);
    }

    #[test]
    fn test_stale_type_map_rejected() {
        let (graph, _, _) = typed_graph();
        let topo = build(&graph);
        let live = CondensedTypeIdMap::from_index_to_type(&[
            EntityTypeId::new(1),
            EntityTypeId::new(2),
            EntityTypeId::new(3),
        ])
        .unwrap();
        let result = EdgeTypeAwareTopology::from_stored(topo.to_stored(), &live);
        assert!(matches!(result, Err(Error::Stale(_))));
    }
}
