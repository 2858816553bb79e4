//! In-memory topology storage.

use std::sync::Arc;

use meridian_common::Result;
use parking_lot::RwLock;

use super::{StoredTopology, TopologyRecord, TopologyStorage};
use crate::topology::ShadowDescriptor;

/// Keeps persisted topology records in memory.
///
/// Records are searched in insertion order, so the first stored record that
/// satisfies a wildcard descriptor wins.
#[derive(Debug, Default)]
pub struct MemoryTopologyStorage {
    records: RwLock<Vec<Arc<TopologyRecord>>>,
}

impl MemoryTopologyStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Descriptors of all stored records, in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ShadowDescriptor> {
        self.records.read().iter().map(|r| r.descriptor).collect()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl TopologyStorage for MemoryTopologyStorage {
    fn load_shadow(&self, descriptor: &ShadowDescriptor) -> Result<Option<StoredTopology>> {
        let records = self.records.read();
        Ok(records
            .iter()
            .find(|r| descriptor.matches(&r.descriptor))
            .map(|r| StoredTopology::from_shared(Arc::clone(r))))
    }

    fn store(&self, topology: StoredTopology) -> Result<()> {
        topology.record().validate()?;
        let record = topology.shared();
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.descriptor == record.descriptor) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }
}
