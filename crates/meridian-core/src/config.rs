//! Topology cache configuration.

use std::cmp::Ordering;
use std::fmt;

/// Direction of the degree comparator used for degree-sorted topologies.
///
/// Descending is the default because degree-sorted views are consumed by
/// algorithms that want hubs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DegreeOrder {
    /// Highest degree first.
    #[default]
    Descending,
    /// Lowest degree first.
    Ascending,
}

impl DegreeOrder {
    /// Compares two degrees in this order.
    #[inline]
    #[must_use]
    pub fn compare(self, a: u64, b: u64) -> Ordering {
        match self {
            Self::Descending => b.cmp(&a),
            Self::Ascending => a.cmp(&b),
        }
    }
}

impl fmt::Display for DegreeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Descending => write!(f, "descending"),
            Self::Ascending => write!(f, "ascending"),
        }
    }
}

/// Configuration for a [`TopologyViewCache`](crate::cache::TopologyViewCache).
///
/// The defaults suit most callers. Turn off `load_from_storage` to force
/// in-memory builds even when a storage backend is attached.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Comparator direction for degree-sorted shuffle topologies.
    pub degree_order: DegreeOrder,
    /// Whether cache misses consult storage before building.
    pub load_from_storage: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            degree_order: DegreeOrder::Descending,
            load_from_storage: true,
        }
    }
}

impl TopologyConfig {
    /// Sets the degree sort direction.
    #[must_use]
    pub fn with_degree_order(mut self, order: DegreeOrder) -> Self {
        self.degree_order = order;
        self
    }

    /// Disables loading from storage.
    #[must_use]
    pub fn without_storage_loads(mut self) -> Self {
        self.load_from_storage = false;
        self
    }
}
