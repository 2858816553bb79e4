//! A graph together with its topology cache.

use std::sync::Arc;

use meridian_common::Result;

use crate::cache::{CacheStats, TopologyViewCache, ViewContext};
use crate::config::TopologyConfig;
use crate::graph::LpgGraph;
use crate::storage::TopologyStorage;
use crate::topology::{
    CondensedTypeIdMap, EdgeShuffleTopology, EdgeSortKind, EdgeTypeAwareTopology, NodeSortKind,
    ProjectedTopology, ShuffleTopology, TransposeKind,
};

/// Owns one graph, its view cache and an optional storage backend.
///
/// The session is the single owner of the cache, so replacing the graph
/// and invalidating the cache happen together.
///
/// # Example
///
/// ```
/// use meridian_core::{GraphSession, LpgGraphBuilder, TransposeKind};
///
/// let mut builder = LpgGraphBuilder::new(3);
/// let knows = builder.edge_type("KNOWS").unwrap();
/// builder.add_edge(0, 1, knows).add_edge(0, 2, knows);
///
/// let mut session = GraphSession::new(builder.build().unwrap());
/// let in_edges = session.edge_type_aware_topo(TransposeKind::Yes).unwrap();
/// assert_eq!(in_edges.out_degree_of_type(1, knows), 1);
/// ```
pub struct GraphSession {
    graph: LpgGraph,
    views: TopologyViewCache,
    storage: Option<Arc<dyn TopologyStorage>>,
}

impl GraphSession {
    /// Session with the default configuration and no storage.
    #[must_use]
    pub fn new(graph: LpgGraph) -> Self {
        Self::with_config(graph, TopologyConfig::default())
    }

    /// Session with a custom cache configuration.
    #[must_use]
    pub fn with_config(graph: LpgGraph, config: TopologyConfig) -> Self {
        Self {
            graph,
            views: TopologyViewCache::new(config),
            storage: None,
        }
    }

    /// Attaches a storage backend consulted on cache misses.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn TopologyStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The graph.
    #[must_use]
    pub fn graph(&self) -> &LpgGraph {
        &self.graph
    }

    /// The topology cache.
    #[must_use]
    pub fn views(&self) -> &TopologyViewCache {
        &self.views
    }

    /// Cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.views.stats()
    }

    /// Replaces the graph and drops every cached topology derived from the
    /// old one. Returns the old graph.
    pub fn replace_graph(&mut self, graph: LpgGraph) -> LpgGraph {
        self.views.drop_all_topologies();
        std::mem::replace(&mut self.graph, graph)
    }

    /// See [`TopologyViewCache::default_topology`].
    pub fn default_topology(&mut self) -> &EdgeShuffleTopology {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views.default_topology(&ctx)
    }

    /// See [`TopologyViewCache::reseat_default_topo`].
    pub fn reseat_default_topo(&mut self, candidate: EdgeShuffleTopology) -> bool {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views.reseat_default_topo(&ctx, candidate)
    }

    /// See [`TopologyViewCache::build_or_get_edge_shuffle_topo`].
    ///
    /// # Errors
    ///
    /// Propagates cache build errors.
    pub fn edge_shuffle_topo(
        &mut self,
        transpose: TransposeKind,
        edge_sort: EdgeSortKind,
    ) -> Result<&EdgeShuffleTopology> {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views.build_or_get_edge_shuffle_topo(&ctx, transpose, edge_sort)
    }

    /// See [`TopologyViewCache::build_or_get_shuffle_topo`].
    ///
    /// # Errors
    ///
    /// Propagates cache build errors.
    pub fn shuffle_topo(
        &mut self,
        transpose: TransposeKind,
        node_sort: NodeSortKind,
        edge_sort: EdgeSortKind,
    ) -> Result<&ShuffleTopology> {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views
            .build_or_get_shuffle_topo(&ctx, transpose, node_sort, edge_sort)
    }

    /// See [`TopologyViewCache::build_or_get_edge_type_aware_topo`].
    ///
    /// # Errors
    ///
    /// Propagates cache build errors.
    pub fn edge_type_aware_topo(
        &mut self,
        transpose: TransposeKind,
    ) -> Result<&EdgeTypeAwareTopology> {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views.build_or_get_edge_type_aware_topo(&ctx, transpose)
    }

    /// See [`TopologyViewCache::build_or_get_edge_type_map`].
    pub fn edge_type_map(&mut self) -> &CondensedTypeIdMap {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views.build_or_get_edge_type_map(&ctx)
    }

    /// See [`TopologyViewCache::build_or_get_projected_topo`].
    ///
    /// # Errors
    ///
    /// Returns an error for unknown type names.
    pub fn projected_topo(
        &mut self,
        node_types: &[&str],
        edge_types: &[&str],
    ) -> Result<&ProjectedTopology> {
        let ctx = context(&self.graph, self.storage.as_deref());
        self.views
            .build_or_get_projected_topo(&ctx, node_types, edge_types)
    }

    /// Persists the cache's working set to the attached storage. Returns
    /// zero when no storage is attached.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub fn persist(&self) -> Result<usize> {
        match &self.storage {
            Some(storage) => self.views.persist(storage.as_ref()),
            None => Ok(0),
        }
    }
}

fn context<'a>(graph: &'a LpgGraph, storage: Option<&'a dyn TopologyStorage>) -> ViewContext<'a> {
    ViewContext { graph, storage }
}
