//! Topology variants derived from a graph's canonical CSR.
//!
//! | Variant | Reorders | Extra index |
//! | ------- | -------- | ----------- |
//! | [`GraphTopology`] | nothing | - |
//! | [`EdgeShuffleTopology`] | edges, optional transpose | edge property index |
//! | [`ShuffleTopology`] | edges and nodes | edge + node property index |
//! | [`EdgeTypeAwareTopology`] | edges by type | per-(node, type) ranges |
//! | [`ProjectedTopology`] | induced subgraph | original <-> projected ids |
//!
//! Every variant except the base is built with data-parallel passes over
//! disjoint node or edge ranges. Property values stay addressed by
//! original identity, so reordered variants carry property-index maps.

mod csr;
mod edge_shuffle;
mod edge_type_aware;
mod projected;
mod shuffle;
mod state;
mod type_map;

pub use csr::GraphTopology;
pub use edge_shuffle::EdgeShuffleTopology;
pub use edge_type_aware::EdgeTypeAwareTopology;
pub use projected::ProjectedTopology;
pub use shuffle::ShuffleTopology;
pub use state::{EdgeSortKind, NodeSortKind, ShadowDescriptor, TopologyKind, TransposeKind};
pub use type_map::CondensedTypeIdMap;

pub(crate) use edge_shuffle::reject_unsupported_sort;

use std::ops::Range;

use meridian_common::{EdgeId, NodeId};
use rayon::prelude::*;

/// Out-degree at or below which [`EdgeShuffleTopology::find_edge`] scans
/// linearly instead of binary searching.
pub const LINEAR_SEARCH_THRESHOLD: u64 = 64;

/// Read access shared by every topology variant.
///
/// Algorithms written against this trait run unchanged on the base CSR or on
/// any derived view.
pub trait TopologyView {
    /// The underlying CSR arrays.
    fn csr(&self) -> &GraphTopology;

    /// Returns the number of nodes.
    fn num_nodes(&self) -> usize {
        self.csr().num_nodes()
    }

    /// Returns the number of edges.
    fn num_edges(&self) -> usize {
        self.csr().num_edges()
    }

    /// All node ids.
    fn nodes(&self) -> Range<NodeId> {
        self.csr().nodes()
    }

    /// Out-edge range of `node`.
    fn out_edges(&self, node: NodeId) -> Range<EdgeId> {
        self.csr().out_edges(node)
    }

    /// Destination of `edge`.
    fn out_edge_dst(&self, edge: EdgeId) -> NodeId {
        self.csr().out_edge_dst(edge)
    }

    /// Out-degree of `node`.
    fn degree(&self, node: NodeId) -> u64 {
        self.csr().degree(node)
    }
}

impl TopologyView for GraphTopology {
    fn csr(&self) -> &GraphTopology {
        self
    }
}

/// Splits two co-indexed edge arrays into one pair of disjoint slices per
/// node, following the adjacency boundaries in `bounds`.
pub(crate) fn split_ranges_mut<'a, A, B>(
    bounds: &[u64],
    mut a: &'a mut [A],
    mut b: &'a mut [B],
) -> Vec<(&'a mut [A], &'a mut [B])> {
    debug_assert_eq!(a.len(), b.len());
    let mut ranges = Vec::with_capacity(bounds.len());
    let mut prev = 0u64;
    for &end in bounds {
        let len = (end - prev) as usize;
        let (head_a, tail_a) = std::mem::take(&mut a).split_at_mut(len);
        let (head_b, tail_b) = std::mem::take(&mut b).split_at_mut(len);
        ranges.push((head_a, head_b));
        a = tail_a;
        b = tail_b;
        prev = end;
    }
    ranges
}

/// Co-sorts `(dest, property index)` pairs inside every node's range by
/// `key`. Nodes are sorted in parallel; ranges are disjoint so no
/// synchronization is needed.
pub(crate) fn sort_edge_ranges<K, F>(
    bounds: &[u64],
    dests: &mut [NodeId],
    prop_indices: &mut [EdgeId],
    key: F,
) where
    K: Ord,
    F: Fn(NodeId, EdgeId) -> K + Sync,
{
    split_ranges_mut(bounds, dests, prop_indices)
        .into_par_iter()
        .for_each(|(dests, props)| {
            if dests.len() < 2 {
                return;
            }
            let mut pairs: Vec<(NodeId, EdgeId)> =
                dests.iter().copied().zip(props.iter().copied()).collect();
            pairs.sort_unstable_by_key(|&(dst, prop)| key(dst, prop));
            for (i, (dst, prop)) in pairs.into_iter().enumerate() {
                dests[i] = dst;
                props[i] = prop;
            }
        });
}

/// Finds the first edge `src -> dst`.
///
/// Small ranges are scanned. Larger ranges are binary searched when sorted
/// by destination, otherwise scanned with a warning.
pub(crate) fn find_edge_in(
    topology: &GraphTopology,
    sorted_by_dest: bool,
    src: NodeId,
    dst: NodeId,
) -> Option<EdgeId> {
    let range = topology.out_edges(src);
    let degree = range.end - range.start;
    match edge_search(degree, sorted_by_dest) {
        EdgeSearch::Binary => return lower_bound_in(topology, range, dst),
        EdgeSearch::UnsortedScan => tracing::warn!(
            src,
            degree,
            "find_edge on a high-degree node whose edges are not sorted by destination; \
             falling back to a linear scan"
        ),
        EdgeSearch::Scan => {}
    }
    let mut edges = range;
    edges.find(|&e| topology.out_edge_dst(e) == dst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeSearch {
    Scan,
    Binary,
    /// Scan over a range too large to scan cheaply.
    UnsortedScan,
}

fn edge_search(degree: u64, sorted_by_dest: bool) -> EdgeSearch {
    match (degree > LINEAR_SEARCH_THRESHOLD, sorted_by_dest) {
        (false, _) => EdgeSearch::Scan,
        (true, true) => EdgeSearch::Binary,
        (true, false) => EdgeSearch::UnsortedScan,
    }
}

/// Equal-range of edges to `dst` inside a destination-sorted `range`.
pub(crate) fn equal_range_in(
    topology: &GraphTopology,
    range: Range<EdgeId>,
    dst: NodeId,
) -> Range<EdgeId> {
    let slice = &topology.dests()[range.start as usize..range.end as usize];
    let lo = slice.partition_point(|&d| d < dst) as u64;
    let hi = slice.partition_point(|&d| d <= dst) as u64;
    range.start + lo..range.start + hi
}

fn lower_bound_in(topology: &GraphTopology, range: Range<EdgeId>, dst: NodeId) -> Option<EdgeId> {
    let found = equal_range_in(topology, range, dst);
    (!found.is_empty()).then_some(found.start)
}

/// Returns true if every node's destinations are non-decreasing.
pub(crate) fn is_sorted_by_dest(topology: &GraphTopology) -> bool {
    topology.nodes().into_par_iter().all(|n| {
        let range = topology.out_edges(n);
        topology.dests()[range.start as usize..range.end as usize]
            .windows(2)
            .all(|w| w[0] <= w[1])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ranges_mut() {
        let bounds = [2u64, 2, 5];
        let mut a = [1, 2, 3, 4, 5];
        let mut b = [10, 20, 30, 40, 50];
        let ranges = split_ranges_mut(&bounds, &mut a, &mut b);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].0.len(), 2);
        assert!(ranges[1].0.is_empty());
        assert_eq!(ranges[2].1, &mut [30, 40, 50]);
    }

    #[test]
    fn test_sort_edge_ranges_is_per_node() {
        let topo = GraphTopology::from_edges(2, &[(0, 1), (0, 0), (1, 1), (1, 0)]);
        let (bounds, mut dests) = topo.into_parts();
        let mut props: Vec<EdgeId> = (0..4).collect();
        sort_edge_ranges(&bounds, &mut dests, &mut props, |dst, prop| (dst, prop));
        assert_eq!(dests, vec![0, 1, 0, 1]);
        assert_eq!(props, vec![1, 0, 3, 2]);
    }

    #[test]
    fn test_find_edge_large_sorted_range_uses_binary_search() {
        let edges: Vec<(NodeId, NodeId)> = (0..200).map(|d| (0, d)).collect();
        let topo = GraphTopology::from_edges(200, &edges);
        assert!(is_sorted_by_dest(&topo));
        assert_eq!(find_edge_in(&topo, true, 0, 150), Some(150));
        assert_eq!(find_edge_in(&topo, true, 0, 199), Some(199));
        assert_eq!(find_edge_in(&topo, true, 1, 0), None);
    }

    #[test]
    fn test_find_edge_large_unsorted_range_falls_back() {
        let edges: Vec<(NodeId, NodeId)> = (0..100).rev().map(|d| (0, d)).collect();
        let topo = GraphTopology::from_edges(100, &edges);
        assert!(!is_sorted_by_dest(&topo));
        assert_eq!(find_edge_in(&topo, false, 0, 0), Some(99));
    }

    #[test]
    fn test_search_threshold_boundary() {
        assert_eq!(edge_search(64, true), EdgeSearch::Scan);
        assert_eq!(edge_search(64, false), EdgeSearch::Scan);
        assert_eq!(edge_search(65, true), EdgeSearch::Binary);
        assert_eq!(edge_search(65, false), EdgeSearch::UnsortedScan);
    }

    #[test]
    fn test_find_edge_at_threshold_scans() {
        // Descending destinations: only a scan finds the first match, a
        // binary search over this range would miss it.
        let star = |degree: NodeId| {
            let edges: Vec<(NodeId, NodeId)> = (0..degree).rev().map(|d| (0, d)).collect();
            GraphTopology::from_edges(degree as usize, &edges)
        };

        let at = star(64);
        assert_eq!(find_edge_in(&at, true, 0, 10), Some(53));
        assert_eq!(find_edge_in(&at, false, 0, 10), Some(53));

        let above = star(65);
        assert_eq!(find_edge_in(&above, false, 0, 10), Some(54));
        assert_eq!(find_edge_in(&above, false, 0, 64), Some(0));
    }

    #[test]
    fn test_equal_range_with_duplicates() {
        let topo = GraphTopology::from_edges(3, &[(0, 1), (0, 2), (0, 2), (0, 2)]);
        assert_eq!(equal_range_in(&topo, topo.out_edges(0), 2), 1..4);
        assert!(equal_range_in(&topo, topo.out_edges(0), 0).is_empty());
    }
}
