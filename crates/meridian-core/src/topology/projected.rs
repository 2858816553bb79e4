//! Induced subgraphs over node and edge type filters.

use std::sync::atomic::{AtomicU64, Ordering};

use meridian_common::{EdgeId, EntityTypeId, Error, NodeId, Result};
use rayon::prelude::*;
use smallvec::SmallVec;

use super::{GraphTopology, TopologyView, split_ranges_mut};
use crate::graph::PropertyGraph;
use crate::parallel::{parallel_count, prefix_sum_in_place};

/// Resolved type filter. Empty means "all types".
pub type TypeFilter = SmallVec<[EntityTypeId; 4]>;

/// The subgraph induced by nodes of the requested types and, among edges
/// between included nodes, edges of the requested types.
///
/// Forward maps (original to projected) hold a sentinel equal to the
/// original count for every excluded entity. Accessors return the sentinel
/// for ids past the end of a map, which covers the all-empty projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedTopology {
    topology: GraphTopology,
    original_to_projected_nodes: Vec<NodeId>,
    projected_to_original_nodes: Vec<NodeId>,
    original_to_projected_edges: Vec<EdgeId>,
    projected_to_original_edges: Vec<EdgeId>,
    node_bitmask: Vec<u8>,
    num_original_nodes: usize,
    num_original_edges: usize,
}

impl TopologyView for ProjectedTopology {
    fn csr(&self) -> &GraphTopology {
        &self.topology
    }
}

impl ProjectedTopology {
    /// Projects `graph` onto the named node and edge types. An empty list
    /// keeps every type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a name does not resolve to a
    /// type of the graph.
    pub fn make(
        graph: &dyn PropertyGraph,
        node_types: &[&str],
        edge_types: &[&str],
    ) -> Result<Self> {
        let node_filter = resolve_names(node_types, "node", |name| {
            graph.resolve_node_type_name(name)
        })?;
        let edge_filter = resolve_names(edge_types, "edge", |name| {
            graph.resolve_edge_type_name(name)
        })?;
        Ok(Self::make_from_type_ids(graph, &node_filter, &edge_filter))
    }

    /// Projects `graph` onto already-resolved type ids.
    #[must_use]
    pub fn make_from_type_ids(
        graph: &dyn PropertyGraph,
        node_types: &[EntityTypeId],
        edge_types: &[EntityTypeId],
    ) -> Self {
        let base = graph.topology();
        let num_original_nodes = base.num_nodes();
        let num_original_edges = base.num_edges();
        let node_sentinel = num_original_nodes as NodeId;

        // Phase A: nodes.
        let included: Vec<bool> = base
            .nodes()
            .into_par_iter()
            .map(|node| {
                node_types.is_empty() || node_types.iter().any(|&t| graph.node_has_type(node, t))
            })
            .collect();
        let node_bitmask = pack_bitmask(&included);
        let num_included = parallel_count(included.par_iter(), |&&flag| flag);

        if num_included == 0 {
            return Self {
                node_bitmask,
                num_original_nodes,
                num_original_edges,
                ..Self::default()
            };
        }

        let mut positions: Vec<u64> = included.par_iter().map(|&flag| u64::from(flag)).collect();
        prefix_sum_in_place(&mut positions);
        let original_to_projected_nodes: Vec<NodeId> = positions
            .par_iter()
            .zip(included.par_iter())
            .map(|(&end, &flag)| if flag { (end - 1) as NodeId } else { node_sentinel })
            .collect();
        let projected_to_original_nodes: Vec<NodeId> = base
            .nodes()
            .into_par_iter()
            .filter(|&node| included[node as usize])
            .collect();
        debug_assert_eq!(projected_to_original_nodes.len(), num_included);

        // Phase B: edges.
        let keep_edge = |edge: EdgeId| {
            original_to_projected_nodes[base.out_edge_dst(edge) as usize] != node_sentinel
                && (edge_types.is_empty()
                    || edge_types.iter().any(|&t| graph.edge_has_type(edge, t)))
        };

        let mut adj_indices: Vec<u64> = projected_to_original_nodes
            .par_iter()
            .map(|&node| base.out_edges(node).filter(|&e| keep_edge(e)).count() as u64)
            .collect();
        prefix_sum_in_place(&mut adj_indices);
        let num_edges = adj_indices.last().copied().unwrap_or(0) as usize;

        if num_edges == 0 {
            return Self {
                topology: GraphTopology::new(adj_indices, Vec::new()),
                original_to_projected_nodes,
                projected_to_original_nodes,
                node_bitmask,
                num_original_nodes,
                num_original_edges,
                ..Self::default()
            };
        }

        let mut dests: Vec<NodeId> = vec![0; num_edges];
        let mut projected_to_original_edges: Vec<EdgeId> = vec![0; num_edges];
        split_ranges_mut(&adj_indices, &mut dests, &mut projected_to_original_edges)
            .into_par_iter()
            .zip(projected_to_original_nodes.par_iter())
            .for_each(|((dests, edges), &node)| {
                let kept = base.out_edges(node).filter(|&e| keep_edge(e));
                for (slot, edge) in kept.enumerate() {
                    dests[slot] = original_to_projected_nodes[base.out_edge_dst(edge) as usize];
                    edges[slot] = edge;
                }
            });

        let edge_sentinel = num_original_edges as EdgeId;
        let forward: Vec<AtomicU64> = (0..num_original_edges)
            .into_par_iter()
            .map(|_| AtomicU64::new(edge_sentinel))
            .collect();
        projected_to_original_edges
            .par_iter()
            .enumerate()
            .for_each(|(projected, &original)| {
                forward[original as usize].store(projected as EdgeId, Ordering::Relaxed);
            });
        let original_to_projected_edges = forward.into_iter().map(AtomicU64::into_inner).collect();

        Self {
            topology: GraphTopology::new(adj_indices, dests),
            original_to_projected_nodes,
            projected_to_original_nodes,
            original_to_projected_edges,
            projected_to_original_edges,
            node_bitmask,
            num_original_nodes,
            num_original_edges,
        }
    }

    /// Sentinel for excluded nodes: the original node count.
    #[must_use]
    pub fn node_sentinel(&self) -> NodeId {
        self.num_original_nodes as NodeId
    }

    /// Sentinel for excluded edges: the original edge count.
    #[must_use]
    pub fn edge_sentinel(&self) -> EdgeId {
        self.num_original_edges as EdgeId
    }

    /// Projected id of original node `node`, or the sentinel.
    #[must_use]
    pub fn projected_node_id(&self, node: NodeId) -> NodeId {
        self.original_to_projected_nodes
            .get(node as usize)
            .copied()
            .unwrap_or_else(|| self.node_sentinel())
    }

    /// Original id of projected node `node`.
    #[must_use]
    pub fn original_node_id(&self, node: NodeId) -> NodeId {
        self.projected_to_original_nodes[node as usize]
    }

    /// Projected id of original edge `edge`, or the sentinel.
    #[must_use]
    pub fn projected_edge_id(&self, edge: EdgeId) -> EdgeId {
        self.original_to_projected_edges
            .get(edge as usize)
            .copied()
            .unwrap_or_else(|| self.edge_sentinel())
    }

    /// Original id of projected edge `edge`.
    #[must_use]
    pub fn original_edge_id(&self, edge: EdgeId) -> EdgeId {
        self.projected_to_original_edges[edge as usize]
    }

    /// Returns true if original node `node` is part of the projection.
    #[must_use]
    pub fn is_node_included(&self, node: NodeId) -> bool {
        let node = node as usize;
        self.node_bitmask
            .get(node / 8)
            .is_some_and(|byte| byte & (1 << (node % 8)) != 0)
    }

    /// Inclusion bitmask over original nodes, least significant bit first.
    #[must_use]
    pub fn node_bitmask(&self) -> &[u8] {
        &self.node_bitmask
    }

    /// Node count of the source graph.
    #[must_use]
    pub fn num_original_nodes(&self) -> usize {
        self.num_original_nodes
    }

    /// Edge count of the source graph.
    #[must_use]
    pub fn num_original_edges(&self) -> usize {
        self.num_original_edges
    }
}

fn resolve_names<F>(names: &[&str], what: &str, resolve: F) -> Result<TypeFilter>
where
    F: Fn(&str) -> Option<EntityTypeId>,
{
    names
        .iter()
        .map(|&name| {
            resolve(name).ok_or_else(|| {
                Error::invalid_argument(format!("unknown {what} type name '{name}'"))
            })
        })
        .collect()
}

fn pack_bitmask(flags: &[bool]) -> Vec<u8> {
    flags
        .par_chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (bit, &flag)| byte | (u8::from(flag) << bit))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LpgGraph, LpgGraphBuilder};

    // Person = {0, 2}, Company = {1}, Place = {3}.
    fn people_graph() -> LpgGraph {
        let mut builder = LpgGraphBuilder::new(4);
        let person = builder.node_type("Person").unwrap();
        let company = builder.node_type("Company").unwrap();
        let place = builder.node_type("Place").unwrap();
        let knows = builder.edge_type("KNOWS").unwrap();
        let works = builder.edge_type("WORKS_AT").unwrap();
        builder
            .set_node_type(0, person)
            .set_node_type(1, company)
            .set_node_type(2, person)
            .set_node_type(3, place);
        builder
            .add_edge(0, 2, knows)
            .add_edge(0, 1, works)
            .add_edge(2, 0, knows)
            .add_edge(1, 2, works)
            .add_edge(2, 3, works);
        builder.build().unwrap()
    }

    #[test]
    fn test_person_projection() {
        let graph = people_graph();
        let projected = ProjectedTopology::make(&graph, &["Person"], &[]).unwrap();

        assert_eq!(projected.num_nodes(), 2);
        assert_eq!(projected.num_edges(), 2);
        assert_eq!(projected.original_node_id(0), 0);
        assert_eq!(projected.original_node_id(1), 2);
        assert_eq!(projected.projected_node_id(1), projected.node_sentinel());
        assert!(!projected.is_node_included(1));
        assert!(projected.is_node_included(2));

        // Edges touching the company node are gone in both directions.
        for edge in [1, 2] {
            assert_eq!(projected.projected_edge_id(edge), projected.edge_sentinel());
        }
        for edge in 0..projected.num_edges() as EdgeId {
            let original = projected.original_edge_id(edge);
            assert_eq!(projected.projected_edge_id(original), edge);
        }
    }

    #[test]
    fn test_identity_projection() {
        let graph = people_graph();
        let projected = ProjectedTopology::make(&graph, &[], &[]).unwrap();
        assert_eq!(projected.csr(), graph.topology());
        for edge in 0..graph.num_edges() as EdgeId {
            assert_eq!(projected.original_edge_id(edge), edge);
        }
        assert_eq!(projected.node_bitmask(), &[0b1111]);
    }

    #[test]
    fn test_edge_type_filter() {
        let graph = people_graph();
        let projected = ProjectedTopology::make(&graph, &[], &["KNOWS"]).unwrap();
        assert_eq!(projected.num_nodes(), 4);
        assert_eq!(projected.num_edges(), 2);
        assert_eq!(projected.degree(1), 0);
    }

    #[test]
    fn test_no_nodes_included() {
        let mut builder = LpgGraphBuilder::new(3);
        let a = builder.node_type("A").unwrap();
        builder.node_type("B").unwrap();
        builder.set_node_type(0, a).set_node_type(1, a).set_node_type(2, a);
        builder.add_edge(0, 1, EntityTypeId::UNKNOWN);
        let graph = builder.build().unwrap();

        let projected = ProjectedTopology::make(&graph, &["B"], &[]).unwrap();
        assert_eq!(projected.num_nodes(), 0);
        assert_eq!(projected.num_edges(), 0);
        assert_eq!(projected.node_bitmask(), &[0]);
        assert_eq!(projected.projected_node_id(0), 3);
        assert_eq!(projected.projected_edge_id(0), 1);
    }

    #[test]
    fn test_nodes_without_edges() {
        let graph = people_graph();
        let projected = ProjectedTopology::make(&graph, &["Company", "Place"], &[]).unwrap();
        assert_eq!(projected.num_nodes(), 2);
        assert_eq!(projected.num_edges(), 0);
        assert_eq!(projected.original_node_id(1), 3);
        assert_eq!(projected.projected_edge_id(4), projected.edge_sentinel());
    }

    #[test]
    fn test_unknown_name_rejected() {
        let graph = people_graph();
        let result = ProjectedTopology::make(&graph, &["Robot"], &[]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
