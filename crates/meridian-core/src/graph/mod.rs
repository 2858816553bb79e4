//! The graph collaborator: what topology construction needs to know about
//! the property graph it derives views from.
//!
//! Topology builds only borrow the graph for the duration of a call. No
//! topology keeps a reference back to it.

mod lpg;

pub use lpg::{LpgGraph, LpgGraphBuilder};

use meridian_common::{EdgeId, EntityTypeId, NodeId};

use crate::topology::GraphTopology;

/// Read-only view of a property graph's structure and entity types.
///
/// Edge types are looked up by *property index*, the stable id of an edge in
/// the canonical layout, because derived topologies reorder edges.
pub trait PropertyGraph: Send + Sync {
    /// The canonical CSR topology.
    fn topology(&self) -> &GraphTopology;

    /// Type of the edge whose stable id is `property_index`.
    fn type_of_edge(&self, property_index: EdgeId) -> EntityTypeId;

    /// Type of `node`.
    fn type_of_node(&self, node: NodeId) -> EntityTypeId;

    /// Resolves a node type name.
    fn resolve_node_type_name(&self, name: &str) -> Option<EntityTypeId>;

    /// Resolves an edge type name.
    fn resolve_edge_type_name(&self, name: &str) -> Option<EntityTypeId>;

    /// Returns true if `node` carries type `ty`.
    fn node_has_type(&self, node: NodeId, ty: EntityTypeId) -> bool {
        self.type_of_node(node) == ty
    }

    /// Returns true if the edge with stable id `edge` carries type `ty`.
    fn edge_has_type(&self, edge: EdgeId, ty: EntityTypeId) -> bool {
        self.type_of_edge(edge) == ty
    }

    /// Number of nodes in the live graph.
    fn num_nodes(&self) -> usize {
        self.topology().num_nodes()
    }

    /// Number of edges in the live graph.
    fn num_edges(&self) -> usize {
        self.topology().num_edges()
    }
}
