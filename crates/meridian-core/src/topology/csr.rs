//! Base CSR adjacency.

use std::ops::Range;

use meridian_common::{EdgeId, NodeId};

use crate::parallel::prefix::{exclusive_begin, prefix_sum_in_place};

/// Compressed sparse row adjacency: the canonical topology of a graph.
///
/// `adj_indices[n]` is the exclusive end of node `n`'s out-edge range, so
/// node `n` owns edges `adj_indices[n - 1]..adj_indices[n]` (with an implicit
/// `0` before the first node). `dests[e]` is the target of edge `e`.
///
/// Immutable once built. The graph owns exactly one for its whole lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphTopology {
    adj_indices: Vec<u64>,
    dests: Vec<NodeId>,
}

impl GraphTopology {
    /// Creates a topology from raw arrays.
    ///
    /// The arrays must be consistent: `adj_indices` non-decreasing and its
    /// last entry equal to `dests.len()`. This is a caller contract checked
    /// in debug builds.
    #[must_use]
    pub fn new(adj_indices: Vec<u64>, dests: Vec<NodeId>) -> Self {
        debug_assert!(
            adj_indices.windows(2).all(|w| w[0] <= w[1]),
            "adjacency must be non-decreasing"
        );
        debug_assert_eq!(
            adj_indices.last().copied().unwrap_or(0),
            dests.len() as u64,
            "adjacency end must equal the number of edges"
        );
        debug_assert!(
            dests.iter().all(|&d| (d as usize) < adj_indices.len()),
            "destination out of range"
        );
        Self { adj_indices, dests }
    }

    /// Builds a topology from an edge list.
    ///
    /// Edges keep their relative order within each source node, so edge ids
    /// follow the order of `edges` once grouped by source.
    #[must_use]
    pub fn from_edges(num_nodes: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut adj_indices = vec![0u64; num_nodes];
        for &(src, _) in edges {
            adj_indices[src as usize] += 1;
        }
        prefix_sum_in_place(&mut adj_indices);

        let mut cursors: Vec<u64> = (0..num_nodes)
            .map(|n| exclusive_begin(&adj_indices, n))
            .collect();
        let mut dests = vec![0; edges.len()];
        for &(src, dst) in edges {
            let slot = &mut cursors[src as usize];
            dests[*slot as usize] = dst;
            *slot += 1;
        }

        Self::new(adj_indices, dests)
    }

    /// Deep copy into newly owned arrays.
    ///
    /// Used when data must outlive a transient storage binding.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            adj_indices: self.adj_indices.clone(),
            dests: self.dests.clone(),
        }
    }

    /// Returns the number of nodes.
    #[inline]
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.adj_indices.len()
    }

    /// Returns the number of edges.
    #[inline]
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.dests.len()
    }

    /// Returns true if there are no nodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adj_indices.is_empty()
    }

    /// All node ids.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> Range<NodeId> {
        0..self.num_nodes() as NodeId
    }

    /// All edge ids.
    #[inline]
    #[must_use]
    pub fn all_edges(&self) -> Range<EdgeId> {
        0..self.num_edges() as EdgeId
    }

    /// Out-edge range of `node`.
    #[inline]
    #[must_use]
    pub fn out_edges(&self, node: NodeId) -> Range<EdgeId> {
        let node = node as usize;
        exclusive_begin(&self.adj_indices, node)..self.adj_indices[node]
    }

    /// Destination of `edge`.
    #[inline]
    #[must_use]
    pub fn out_edge_dst(&self, edge: EdgeId) -> NodeId {
        self.dests[edge as usize]
    }

    /// Out-degree of `node`.
    #[inline]
    #[must_use]
    pub fn degree(&self, node: NodeId) -> u64 {
        let range = self.out_edges(node);
        range.end - range.start
    }

    /// Raw adjacency boundaries.
    #[must_use]
    pub fn adj_indices(&self) -> &[u64] {
        &self.adj_indices
    }

    /// Raw destination array.
    #[must_use]
    pub fn dests(&self) -> &[NodeId] {
        &self.dests
    }

    /// Consumes the topology and returns its arrays.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u64>, Vec<NodeId>) {
        (self.adj_indices, self.dests)
    }

    /// Mutable access for in-place per-node edge sorts.
    pub(crate) fn parts_mut(&mut self) -> (&[u64], &mut [NodeId]) {
        (&self.adj_indices, &mut self.dests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> GraphTopology {
        GraphTopology::from_edges(3, &[(0, 1), (1, 2), (2, 0)])
    }

    #[test]
    fn test_basic_accessors() {
        let topo = triangle();
        assert_eq!(topo.num_nodes(), 3);
        assert_eq!(topo.num_edges(), 3);
        assert_eq!(topo.out_edges(1), 1..2);
        assert_eq!(topo.out_edge_dst(1), 2);
        assert_eq!(topo.degree(2), 1);
        assert_eq!(topo.nodes().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_from_edges_groups_by_source() {
        let topo = GraphTopology::from_edges(4, &[(2, 0), (0, 3), (2, 1), (0, 1)]);
        assert_eq!(topo.adj_indices(), &[2, 2, 4, 4]);
        assert_eq!(topo.dests(), &[3, 1, 0, 1]);
        assert_eq!(topo.degree(1), 0);
        assert_eq!(topo.degree(3), 0);
    }

    #[test]
    fn test_degrees_sum_to_edges() {
        let topo = GraphTopology::from_edges(5, &[(0, 1), (0, 2), (3, 4), (4, 0), (4, 4)]);
        let total: u64 = topo.nodes().map(|n| topo.degree(n)).sum();
        assert_eq!(total, topo.num_edges() as u64);
    }

    #[test]
    fn test_copy_is_deep() {
        let topo = triangle();
        let copy = topo.copy();
        assert_eq!(topo, copy);
        assert_ne!(topo.dests().as_ptr(), copy.dests().as_ptr());
    }

    #[test]
    fn test_empty() {
        let topo = GraphTopology::default();
        assert!(topo.is_empty());
        assert_eq!(topo.num_edges(), 0);
        assert_eq!(topo.all_edges().count(), 0);
    }
}
