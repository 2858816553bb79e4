//! The per-graph topology view cache.

use meridian_common::Result;
use meridian_common::collections::{FxIndexMap, fx_index_map};
use tracing::{debug, info, warn};

use super::{CacheStats, ViewContext};
use crate::config::TopologyConfig;
use crate::storage::{StoredTopology, TopologyStorage};
use crate::topology::{
    CondensedTypeIdMap, EdgeShuffleTopology, EdgeSortKind, EdgeTypeAwareTopology, GraphTopology,
    NodeSortKind, ProjectedTopology, ShadowDescriptor, ShuffleTopology, TopologyKind, TopologyView,
    TransposeKind, reject_unsupported_sort,
};

/// Tagged cache entry. The variant always agrees with the key's kind.
#[derive(Debug, Clone)]
enum CachedTopology {
    EdgeShuffle(EdgeShuffleTopology),
    Shuffle(ShuffleTopology),
    EdgeTypeAware(EdgeTypeAwareTopology),
}

impl CachedTopology {
    fn descriptor(&self) -> ShadowDescriptor {
        match self {
            Self::EdgeShuffle(t) => t.descriptor(),
            Self::Shuffle(t) => t.descriptor(),
            Self::EdgeTypeAware(t) => t.descriptor(),
        }
    }

    fn csr(&self) -> &GraphTopology {
        match self {
            Self::EdgeShuffle(t) => t.csr(),
            Self::Shuffle(t) => t.csr(),
            Self::EdgeTypeAware(t) => t.csr(),
        }
    }

    fn to_stored(&self) -> StoredTopology {
        match self {
            Self::EdgeShuffle(t) => t.to_stored(),
            Self::Shuffle(t) => t.to_stored(),
            Self::EdgeTypeAware(t) => t.to_stored(),
        }
    }
}

/// Type names a cached projection was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectionFilter {
    node_types: Vec<String>,
    edge_types: Vec<String>,
}

impl ProjectionFilter {
    fn new(node_types: &[&str], edge_types: &[&str]) -> Self {
        Self {
            node_types: node_types.iter().map(|s| (*s).to_string()).collect(),
            edge_types: edge_types.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn is_for(&self, node_types: &[&str], edge_types: &[&str]) -> bool {
        self.node_types.iter().map(String::as_str).eq(node_types.iter().copied())
            && self.edge_types.iter().map(String::as_str).eq(edge_types.iter().copied())
    }
}

/// Single-owner cache of derived topologies for one graph.
///
/// Every `build_or_get_*` call follows the same contract:
///
/// 1. Return a cached topology whose state satisfies the request, where
///    `Any` in the request matches every stored value.
/// 2. Otherwise adopt a matching topology from storage, if configured.
/// 3. Otherwise build it from the cheapest cached seed and cache it.
///
/// Entries are keyed by the state they were actually built with, so a
/// request containing `Any` is answered by whichever matching entry was
/// cached first.
///
/// The cache is not synchronized. Builds run on the rayon pool, but a single
/// cache instance must be driven from one thread at a time.
///
/// # Example
///
/// ```
/// use meridian_core::cache::{TopologyViewCache, ViewContext};
/// use meridian_core::graph::LpgGraphBuilder;
/// use meridian_core::topology::{EdgeSortKind, TransposeKind};
/// use meridian_common::EntityTypeId;
///
/// let mut builder = LpgGraphBuilder::new(3);
/// builder.add_edge(0, 1, EntityTypeId::UNKNOWN).add_edge(1, 2, EntityTypeId::UNKNOWN);
/// let graph = builder.build().unwrap();
///
/// let mut cache = TopologyViewCache::default();
/// let ctx = ViewContext::new(&graph);
/// let transpose = cache
///     .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::ByDestId)
///     .unwrap();
/// assert_eq!(transpose.find_edge(1, 0), Some(0));
/// ```
#[derive(Debug, Default)]
pub struct TopologyViewCache {
    config: TopologyConfig,
    default: Option<EdgeShuffleTopology>,
    entries: FxIndexMap<ShadowDescriptor, CachedTopology>,
    edge_type_map: Option<CondensedTypeIdMap>,
    projected: Option<(ProjectionFilter, ProjectedTopology)>,
    stats: CacheStats,
}

impl TopologyViewCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: TopologyConfig) -> Self {
        Self {
            config,
            default: None,
            entries: fx_index_map(),
            edge_type_map: None,
            projected: None,
            stats: CacheStats::default(),
        }
    }

    /// The cache configuration.
    #[must_use]
    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Hit, load and build counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached shuffle-family topologies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no shuffle-family topology is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors of the cached topologies, in insertion order.
    pub fn cached_descriptors(&self) -> impl Iterator<Item = &ShadowDescriptor> {
        self.entries.keys()
    }

    /// The default topology, built as an untransposed, unsorted copy of the
    /// canonical layout on first use.
    pub fn default_topology(&mut self, ctx: &ViewContext<'_>) -> &EdgeShuffleTopology {
        self.default
            .get_or_insert_with(|| EdgeShuffleTopology::make_original_copy(ctx.graph))
    }

    /// Replaces the default topology with `candidate`.
    ///
    /// Only allowed while the current default is unsorted: a sorted default
    /// may already be relied on, so it is never reordered behind a caller's
    /// back. Transposed candidates and candidates whose size differs from
    /// the graph in `ctx` are always rejected. Returns whether the candidate
    /// was installed.
    pub fn reseat_default_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        candidate: EdgeShuffleTopology,
    ) -> bool {
        if candidate.is_transposed() {
            debug!("rejected transposed topology as default");
            return false;
        }
        if candidate.num_nodes() != ctx.graph.num_nodes()
            || candidate.num_edges() != ctx.graph.num_edges()
        {
            debug!(
                nodes = candidate.num_nodes(),
                edges = candidate.num_edges(),
                "rejected default topology built for a different graph"
            );
            return false;
        }
        if let Some(current) = &self.default {
            if current.edge_sort_state() != EdgeSortKind::Any {
                debug!(
                    current = ?current.edge_sort_state(),
                    "default topology already sorted, not reseating"
                );
                return false;
            }
        }
        debug!(edge_sort = ?candidate.edge_sort_state(), "reseated default topology");
        self.default = Some(candidate);
        true
    }

    /// Returns an edge shuffle topology in the requested state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`](meridian_common::Error::NotImplemented)
    /// for [`EdgeSortKind::ByNodeType`].
    pub fn build_or_get_edge_shuffle_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        transpose: TransposeKind,
        edge_sort: EdgeSortKind,
    ) -> Result<&EdgeShuffleTopology> {
        reject_unsupported_sort(edge_sort)?;
        let desc = ShadowDescriptor::edge_shuffle(transpose, edge_sort);
        let key = self.resolve(ctx, desc, |this, ctx, want| {
            this.build_edge_shuffle(ctx, want).map(CachedTopology::EdgeShuffle)
        })?;
        Ok(self.edge_shuffle_at(&key))
    }

    /// Returns a node-permuted shuffle topology in the requested state.
    ///
    /// Builds start from a cached edge shuffle with the same transpose
    /// state, building and caching an unsorted one if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`](meridian_common::Error::NotImplemented)
    /// when a build is needed for `NodeSortKind::Any` or
    /// `EdgeSortKind::ByNodeType`.
    pub fn build_or_get_shuffle_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        transpose: TransposeKind,
        node_sort: NodeSortKind,
        edge_sort: EdgeSortKind,
    ) -> Result<&ShuffleTopology> {
        reject_unsupported_sort(edge_sort)?;
        let desc = ShadowDescriptor::shuffle(transpose, node_sort, edge_sort);
        let key = self.resolve(ctx, desc, |this, ctx, want| {
            let degree_order = this.config.degree_order;
            let seed_key = this.resolve(
                ctx,
                ShadowDescriptor::edge_shuffle(want.transpose, EdgeSortKind::Any),
                |this, ctx, want| {
                    this.build_edge_shuffle(ctx, want)
                        .map(CachedTopology::EdgeShuffle)
                },
            )?;
            let seed = this.edge_shuffle_at(&seed_key);
            ShuffleTopology::make(ctx.graph, seed, want.node_sort, want.edge_sort, degree_order)
                .map(CachedTopology::Shuffle)
        })?;
        Ok(self.shuffle_at(&key))
    }

    /// Returns an edge-type-aware topology.
    ///
    /// The type-sorted edge shuffle it is built on is taken out of the cache
    /// with [`take_edge_shuffle_topo`](Self::take_edge_shuffle_topo), since
    /// the new topology owns those arrays from then on.
    ///
    /// # Errors
    ///
    /// Propagates errors from the seed build and from
    /// [`EdgeTypeAwareTopology::make`].
    pub fn build_or_get_edge_type_aware_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        transpose: TransposeKind,
    ) -> Result<&EdgeTypeAwareTopology> {
        let desc = ShadowDescriptor::edge_type_aware(transpose);
        let key = self.resolve(ctx, desc, |this, ctx, want| {
            let seed = this.take_edge_shuffle_topo(ctx, want.transpose, EdgeSortKind::ByEdgeType)?;
            let type_map = this.build_or_get_edge_type_map(ctx);
            EdgeTypeAwareTopology::make(ctx.graph, seed, type_map)
                .map(CachedTopology::EdgeTypeAware)
        })?;
        Ok(self.edge_type_aware_at(&key))
    }

    /// Removes and returns an edge shuffle topology in the requested state.
    ///
    /// A cached match is moved out of the cache. Without one, the topology
    /// is loaded or built and handed over without being cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`](meridian_common::Error::NotImplemented)
    /// for [`EdgeSortKind::ByNodeType`].
    pub fn take_edge_shuffle_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        transpose: TransposeKind,
        edge_sort: EdgeSortKind,
    ) -> Result<EdgeShuffleTopology> {
        reject_unsupported_sort(edge_sort)?;
        let desc = ShadowDescriptor::edge_shuffle(transpose, edge_sort);
        if let Some(key) = self.find_key(&desc) {
            if let Some(CachedTopology::EdgeShuffle(topo)) = self.entries.shift_remove(&key) {
                self.stats.hits += 1;
                debug!(%key, "took cached topology");
                return Ok(topo);
            }
        }
        if let Some(CachedTopology::EdgeShuffle(topo)) = self.load_from_storage(ctx, &desc) {
            self.stats.loads += 1;
            return Ok(topo);
        }
        let topo = self.build_edge_shuffle(ctx, desc.resolved())?;
        self.stats.builds += 1;
        Ok(topo)
    }

    /// Returns the condensed edge type map of the graph.
    pub fn build_or_get_edge_type_map(&mut self, ctx: &ViewContext<'_>) -> &CondensedTypeIdMap {
        self.edge_type_map.get_or_insert_with(|| {
            let map = CondensedTypeIdMap::make_from_edge_types(ctx.graph);
            debug!(types = map.num_unique_types(), "built edge type map");
            map
        })
    }

    /// Returns the projection onto the named node and edge types.
    ///
    /// One projection is cached at a time; asking for a different filter
    /// replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](meridian_common::Error::InvalidArgument)
    /// for unknown type names.
    pub fn build_or_get_projected_topo(
        &mut self,
        ctx: &ViewContext<'_>,
        node_types: &[&str],
        edge_types: &[&str],
    ) -> Result<&ProjectedTopology> {
        let hit = matches!(
            &self.projected,
            Some((filter, _)) if filter.is_for(node_types, edge_types)
        );
        if hit {
            self.stats.hits += 1;
        } else {
            let projected = ProjectedTopology::make(ctx.graph, node_types, edge_types)?;
            self.stats.builds += 1;
            debug!(
                ?node_types,
                ?edge_types,
                nodes = projected.num_nodes(),
                edges = projected.num_edges(),
                "built projected topology"
            );
            self.projected = Some((ProjectionFilter::new(node_types, edge_types), projected));
        }
        match &self.projected {
            Some((_, projected)) => Ok(projected),
            None => unreachable!("projection slot filled above"),
        }
    }

    /// Discards every cached topology, the type map, the projection and the
    /// default topology. Call after any structural change to the graph.
    pub fn drop_all_topologies(&mut self) {
        info!(
            cached = self.entries.len(),
            "dropping all cached topologies"
        );
        self.default = None;
        self.entries.clear();
        self.edge_type_map = None;
        self.projected = None;
    }

    /// Serializes the default topology and every cached shuffle-family
    /// topology.
    #[must_use]
    pub fn to_stored_topologies(&self) -> Vec<StoredTopology> {
        let default = self
            .default
            .as_ref()
            .filter(|d| !self.entries.contains_key(&d.descriptor()))
            .map(EdgeShuffleTopology::to_stored);
        default
            .into_iter()
            .chain(self.entries.values().map(CachedTopology::to_stored))
            .collect()
    }

    /// Writes [`to_stored_topologies`](Self::to_stored_topologies) to
    /// `storage` and returns how many topologies were stored.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by `storage`.
    pub fn persist(&self, storage: &dyn TopologyStorage) -> Result<usize> {
        let stored = self.to_stored_topologies();
        let count = stored.len();
        for topology in stored {
            storage.store(topology)?;
        }
        debug!(count, "persisted cached topologies");
        Ok(count)
    }

    fn find_key(&self, desc: &ShadowDescriptor) -> Option<ShadowDescriptor> {
        if self.entries.contains_key(desc) {
            return Some(*desc);
        }
        self.entries.keys().find(|key| desc.matches(key)).copied()
    }

    /// Lookup, then storage, then `build`. Returns the key of the entry.
    fn resolve<F>(
        &mut self,
        ctx: &ViewContext<'_>,
        desc: ShadowDescriptor,
        build: F,
    ) -> Result<ShadowDescriptor>
    where
        F: FnOnce(&mut Self, &ViewContext<'_>, ShadowDescriptor) -> Result<CachedTopology>,
    {
        if let Some(key) = self.find_key(&desc) {
            self.stats.hits += 1;
            debug!(%desc, %key, "topology cache hit");
            return Ok(key);
        }

        let topo = match self.load_from_storage(ctx, &desc) {
            Some(topo) => {
                self.stats.loads += 1;
                topo
            }
            None => {
                let want = desc.resolved();
                let topo = build(self, ctx, want)?;
                self.stats.builds += 1;
                debug!(%want, "built topology");
                topo
            }
        };

        let key = topo.descriptor();
        debug_assert!(desc.matches(&key), "{key} does not satisfy {desc}");
        debug_assert_eq!(topo.csr().num_nodes(), ctx.graph.num_nodes());
        debug_assert_eq!(topo.csr().num_edges(), ctx.graph.num_edges());
        self.entries.insert(key, topo);
        Ok(key)
    }

    /// Cheapest route to an edge shuffle: re-sort a cached one with the same
    /// transpose state (the default counts for untransposed), else build
    /// from the canonical layout.
    fn build_edge_shuffle(
        &self,
        ctx: &ViewContext<'_>,
        want: ShadowDescriptor,
    ) -> Result<EdgeShuffleTopology> {
        let same_direction = ShadowDescriptor::edge_shuffle(want.transpose, EdgeSortKind::Any);
        let seed = self
            .find_key(&same_direction)
            .map(|key| self.edge_shuffle_at(&key))
            .or_else(|| {
                self.default
                    .as_ref()
                    .filter(|d| same_direction.matches(&d.descriptor()))
            });
        match seed {
            Some(seed) => {
                let mut topo = seed.clone();
                topo.apply_edge_sort(ctx.graph, want.edge_sort)?;
                Ok(topo)
            }
            None => EdgeShuffleTopology::make(ctx.graph, want.transpose, want.edge_sort),
        }
    }

    /// Adopts a stored topology matching `desc`. Any failure is logged and
    /// reported as a miss.
    fn load_from_storage(
        &mut self,
        ctx: &ViewContext<'_>,
        desc: &ShadowDescriptor,
    ) -> Option<CachedTopology> {
        if !self.config.load_from_storage {
            return None;
        }
        let storage = ctx.storage?;
        let stored = match storage.load_shadow(desc) {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(%desc, "topology storage lookup failed: {e}");
                return None;
            }
        };
        let found = stored.descriptor();
        if !desc.matches(&found) {
            warn!(%desc, %found, "storage returned a topology that does not match");
            return None;
        }

        let loaded = match desc.kind {
            TopologyKind::EdgeShuffle => {
                EdgeShuffleTopology::from_stored(stored).map(CachedTopology::EdgeShuffle)
            }
            TopologyKind::Shuffle => {
                ShuffleTopology::from_stored(stored).map(CachedTopology::Shuffle)
            }
            TopologyKind::EdgeTypeAware => {
                let live = self.build_or_get_edge_type_map(ctx);
                EdgeTypeAwareTopology::from_stored(stored, live)
                    .map(CachedTopology::EdgeTypeAware)
            }
        };
        match loaded {
            Ok(topo)
                if topo.csr().num_nodes() == ctx.graph.num_nodes()
                    && topo.csr().num_edges() == ctx.graph.num_edges() =>
            {
                debug!(%found, "loaded topology from storage");
                Some(topo)
            }
            Ok(_) => {
                warn!(%found, "stored topology does not match the graph's size, ignoring");
                None
            }
            Err(e) => {
                warn!(%found, "stored topology rejected: {e}");
                None
            }
        }
    }

    fn edge_shuffle_at(&self, key: &ShadowDescriptor) -> &EdgeShuffleTopology {
        match self.entries.get(key) {
            Some(CachedTopology::EdgeShuffle(topo)) => topo,
            _ => unreachable!("no edge shuffle topology cached under {key}"),
        }
    }

    fn shuffle_at(&self, key: &ShadowDescriptor) -> &ShuffleTopology {
        match self.entries.get(key) {
            Some(CachedTopology::Shuffle(topo)) => topo,
            _ => unreachable!("no shuffle topology cached under {key}"),
        }
    }

    fn edge_type_aware_at(&self, key: &ShadowDescriptor) -> &EdgeTypeAwareTopology {
        match self.entries.get(key) {
            Some(CachedTopology::EdgeTypeAware(topo)) => topo,
            _ => unreachable!("no edge type aware topology cached under {key}"),
        }
    }
}
