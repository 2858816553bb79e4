//! # meridian-core
//!
//! Topology construction and view caching for property graphs.
//!
//! A graph owns one canonical CSR topology. Algorithms often want a
//! different physical layout of the same edges: reversed, sorted by
//! destination or type, with nodes permuted by degree, or restricted to a
//! subset of types. This crate builds those layouts in parallel, keeps
//! property lookups working through property-index maps, and caches them
//! per graph.
//!
//! ## Modules
//!
//! - [`topology`] - The CSR and every derived topology variant
//! - [`cache`] - Lookup-or-load-or-build cache of derived topologies
//! - [`storage`] - Persistence contract and an in-memory backend
//! - [`graph`] - The property graph collaborator and an in-memory graph
//! - [`parallel`] - Fold-reduce and prefix-sum helpers
//! - [`config`] - Cache configuration
//! - [`session`] - A graph bundled with its cache

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod graph;
pub mod parallel;
pub mod session;
pub mod storage;
pub mod topology;

pub use cache::{CacheStats, TopologyViewCache, ViewContext};
pub use config::{DegreeOrder, TopologyConfig};
pub use graph::{LpgGraph, LpgGraphBuilder, PropertyGraph};
pub use session::GraphSession;
pub use storage::{MemoryTopologyStorage, StoredTopology, TopologyRecord, TopologyStorage};
pub use topology::{
    CondensedTypeIdMap, EdgeShuffleTopology, EdgeSortKind, EdgeTypeAwareTopology, GraphTopology,
    NodeSortKind, ProjectedTopology, ShadowDescriptor, ShuffleTopology, TopologyKind,
    TopologyView, TransposeKind,
};
