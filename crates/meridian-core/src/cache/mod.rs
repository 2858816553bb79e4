//! Lookup-or-load-or-build caching of derived topologies.
//!
//! - [`TopologyViewCache`] - per-graph cache of every topology variant
//! - [`ViewContext`] - the graph and storage a build call may consult
//!
//! The cache owns every topology it hands out. Callers borrow them for as
//! long as they hold the cache immutably; a structural graph change must be
//! followed by [`TopologyViewCache::drop_all_topologies`].

mod view_cache;

pub use view_cache::TopologyViewCache;

use crate::graph::PropertyGraph;
use crate::storage::TopologyStorage;

/// Collaborators for one cache call.
///
/// Passed explicitly into every build so the cache never holds a reference
/// to the graph or the storage backend.
#[derive(Clone, Copy)]
pub struct ViewContext<'a> {
    /// Graph the topologies are derived from.
    pub graph: &'a dyn PropertyGraph,
    /// Optional persistence backend consulted on cache misses.
    pub storage: Option<&'a dyn TopologyStorage>,
}

impl<'a> ViewContext<'a> {
    /// Context without a storage backend.
    #[must_use]
    pub fn new(graph: &'a dyn PropertyGraph) -> Self {
        Self {
            graph,
            storage: None,
        }
    }

    /// Attaches a storage backend.
    #[must_use]
    pub fn with_storage(mut self, storage: &'a dyn TopologyStorage) -> Self {
        self.storage = Some(storage);
        self
    }
}

/// Counters for how cache requests were satisfied.
///
/// Counters are cumulative over the cache's lifetime and survive
/// [`TopologyViewCache::drop_all_topologies`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered by an already cached topology.
    pub hits: u64,
    /// Topologies adopted from storage.
    pub loads: u64,
    /// Topologies computed in memory.
    pub builds: u64,
}
