//! The load/store contract between topology construction and persistence.
//!
//! Persisted topologies are found with a [`ShadowDescriptor`], handed out
//! as [`StoredTopology`] handles, copied into owned memory by the topology
//! constructors, and then released. The byte format is up to the
//! implementation; [`MemoryTopologyStorage`] keeps records in memory.
//!
//! ```text
//!  TopologyViewCache ──load_shadow(desc)──▶ TopologyStorage
//!          ▲                                     │
//!          │ from_stored(handle) + release()     ▼
//!          └──────────────────────────── StoredTopology
//! ```

mod memory;
mod record;

pub use memory::MemoryTopologyStorage;
pub use record::{StoredTopology, TopologyRecord};

use meridian_common::Result;

use crate::topology::ShadowDescriptor;

/// Persistence backend for derived topologies.
///
/// Implementations must be shareable across threads. Errors returned here
/// never abort a cache lookup: the cache treats them as a miss and builds
/// the topology in memory instead.
pub trait TopologyStorage: Send + Sync {
    /// Finds a persisted topology matching `descriptor`.
    ///
    /// Wildcard fields in the descriptor match anything on disk. Returns
    /// `Ok(None)` when nothing matches.
    fn load_shadow(&self, descriptor: &ShadowDescriptor) -> Result<Option<StoredTopology>>;

    /// Persists `topology`, replacing any record with the same descriptor.
    fn store(&self, topology: StoredTopology) -> Result<()>;
}
