//! In-memory labeled property graph with one entity type per node and edge.

use meridian_common::collections::{FxMap, fx_map};
use meridian_common::{EdgeId, EntityTypeId, Error, NodeId, Result};

use super::PropertyGraph;
use crate::topology::GraphTopology;

/// A property graph held entirely in memory.
///
/// Holds the canonical topology plus a type id for every node and edge.
/// Property values themselves live elsewhere; only the structure needed by
/// topology construction is kept here.
///
/// # Example
///
/// ```
/// use meridian_core::graph::{LpgGraphBuilder, PropertyGraph};
///
/// let mut builder = LpgGraphBuilder::new(3);
/// let person = builder.node_type("Person").unwrap();
/// let knows = builder.edge_type("KNOWS").unwrap();
/// builder.set_node_type(0, person).add_edge(0, 1, knows).add_edge(1, 2, knows);
/// let graph = builder.build().unwrap();
///
/// assert_eq!(graph.num_edges(), 2);
/// assert_eq!(graph.resolve_node_type_name("Person"), Some(person));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LpgGraph {
    topology: GraphTopology,
    node_types: Vec<EntityTypeId>,
    edge_types: Vec<EntityTypeId>,
    node_type_names: FxMap<String, EntityTypeId>,
    edge_type_names: FxMap<String, EntityTypeId>,
}

impl LpgGraph {
    /// Wraps an existing topology with per-entity types.
    ///
    /// `edge_types` is indexed by the topology's edge ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the type arrays do not match the
    /// topology's node and edge counts.
    pub fn from_parts(
        topology: GraphTopology,
        node_types: Vec<EntityTypeId>,
        edge_types: Vec<EntityTypeId>,
    ) -> Result<Self> {
        if node_types.len() != topology.num_nodes() {
            return Err(Error::invalid_argument(format!(
                "{} node types for {} nodes",
                node_types.len(),
                topology.num_nodes()
            )));
        }
        if edge_types.len() != topology.num_edges() {
            return Err(Error::invalid_argument(format!(
                "{} edge types for {} edges",
                edge_types.len(),
                topology.num_edges()
            )));
        }
        Ok(Self {
            topology,
            node_types,
            edge_types,
            node_type_names: fx_map(),
            edge_type_names: fx_map(),
        })
    }

    /// Registers a display name for a node type.
    pub fn name_node_type(&mut self, name: impl Into<String>, ty: EntityTypeId) {
        self.node_type_names.insert(name.into(), ty);
    }

    /// Registers a display name for an edge type.
    pub fn name_edge_type(&mut self, name: impl Into<String>, ty: EntityTypeId) {
        self.edge_type_names.insert(name.into(), ty);
    }

    /// Types of all nodes, indexed by node id.
    #[must_use]
    pub fn node_types(&self) -> &[EntityTypeId] {
        &self.node_types
    }

    /// Types of all edges, indexed by canonical edge id.
    #[must_use]
    pub fn edge_types(&self) -> &[EntityTypeId] {
        &self.edge_types
    }
}

impl PropertyGraph for LpgGraph {
    fn topology(&self) -> &GraphTopology {
        &self.topology
    }

    fn type_of_edge(&self, property_index: EdgeId) -> EntityTypeId {
        self.edge_types[property_index as usize]
    }

    fn type_of_node(&self, node: NodeId) -> EntityTypeId {
        self.node_types[node as usize]
    }

    fn resolve_node_type_name(&self, name: &str) -> Option<EntityTypeId> {
        self.node_type_names.get(name).copied()
    }

    fn resolve_edge_type_name(&self, name: &str) -> Option<EntityTypeId> {
        self.edge_type_names.get(name).copied()
    }
}

/// Incremental builder for [`LpgGraph`].
///
/// Type ids are handed out from 1 upward in registration order; 0 stays the
/// reserved unknown type, which is also what untyped nodes get.
#[derive(Debug, Clone, Default)]
pub struct LpgGraphBuilder {
    node_types: Vec<EntityTypeId>,
    edges: Vec<(NodeId, NodeId, EntityTypeId)>,
    node_type_names: FxMap<String, EntityTypeId>,
    edge_type_names: FxMap<String, EntityTypeId>,
}

impl LpgGraphBuilder {
    /// Starts a graph with `num_nodes` untyped nodes and no edges.
    #[must_use]
    pub fn new(num_nodes: usize) -> Self {
        Self {
            node_types: vec![EntityTypeId::UNKNOWN; num_nodes],
            ..Default::default()
        }
    }

    /// Returns the id for node type `name`, registering it if new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] once all 255 ids are taken.
    pub fn node_type(&mut self, name: &str) -> Result<EntityTypeId> {
        intern(&mut self.node_type_names, name)
    }

    /// Returns the id for edge type `name`, registering it if new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] once all 255 ids are taken.
    pub fn edge_type(&mut self, name: &str) -> Result<EntityTypeId> {
        intern(&mut self.edge_type_names, name)
    }

    /// Sets the type of `node`.
    pub fn set_node_type(&mut self, node: NodeId, ty: EntityTypeId) -> &mut Self {
        self.node_types[node as usize] = ty;
        self
    }

    /// Adds an edge `src -> dst` of type `ty`.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, ty: EntityTypeId) -> &mut Self {
        self.edges.push((src, dst, ty));
        self
    }

    /// Builds the graph.
    ///
    /// Edges are grouped by source; within a source they keep insertion
    /// order, which fixes their canonical edge ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an edge endpoint is not a node.
    pub fn build(&self) -> Result<LpgGraph> {
        let num_nodes = self.node_types.len();
        if let Some(&(src, dst, _)) = self
            .edges
            .iter()
            .find(|&&(s, d, _)| s as usize >= num_nodes || d as usize >= num_nodes)
        {
            return Err(Error::invalid_argument(format!(
                "edge {src} -> {dst} references a node outside 0..{num_nodes}"
            )));
        }

        let mut ordered = self.edges.clone();
        ordered.sort_by_key(|&(src, _, _)| src);
        let pairs: Vec<(NodeId, NodeId)> = ordered.iter().map(|&(s, d, _)| (s, d)).collect();
        let edge_types = ordered.iter().map(|&(_, _, ty)| ty).collect();

        let mut graph = LpgGraph::from_parts(
            GraphTopology::from_edges(num_nodes, &pairs),
            self.node_types.clone(),
            edge_types,
        )?;
        graph.node_type_names = self.node_type_names.clone();
        graph.edge_type_names = self.edge_type_names.clone();
        Ok(graph)
    }
}

fn intern(names: &mut FxMap<String, EntityTypeId>, name: &str) -> Result<EntityTypeId> {
    if let Some(&ty) = names.get(name) {
        return Ok(ty);
    }
    let next = names.len() + 1;
    let raw = u8::try_from(next)
        .map_err(|_| Error::invalid_argument(format!("too many entity types registering '{name}'")))?;
    let ty = EntityTypeId::new(raw);
    names.insert(name.to_string(), ty);
    Ok(ty)
}
