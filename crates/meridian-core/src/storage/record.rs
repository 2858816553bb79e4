//! Persisted topology records and the handle used to read them.

use std::sync::Arc;

use meridian_common::{EdgeId, EntityTypeId, Error, NodeId, Result};
use serde::{Deserialize, Serialize};

use crate::topology::{EdgeSortKind, NodeSortKind, ShadowDescriptor, TransposeKind};

/// Array payload of one persisted topology.
///
/// Optional arrays are present only for the variants that need them:
/// edge property indices for any edge reordering, node property indices for
/// node permutations, and the condensed type ids plus per-type adjacency for
/// edge-type-aware topologies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRecord {
    /// Variant and state of the stored topology. Never contains `Any` for
    /// the transpose field.
    pub descriptor: ShadowDescriptor,
    /// Exclusive end of each node's edge range.
    pub adj_indices: Vec<u64>,
    /// Destination of each edge.
    pub dests: Vec<NodeId>,
    /// Stable edge id for each physical edge slot.
    pub edge_prop_indices: Option<Vec<EdgeId>>,
    /// Stable node id for each physical node slot.
    pub node_prop_indices: Option<Vec<NodeId>>,
    /// Condensed edge type map, dense index to type id.
    pub edge_type_ids: Option<Vec<EntityTypeId>>,
    /// Exclusive end of each `(node, type index)` edge range.
    pub per_type_adj_indices: Option<Vec<u64>>,
}

impl TopologyRecord {
    /// Record with only the CSR arrays set.
    #[must_use]
    pub fn new(descriptor: ShadowDescriptor, adj_indices: Vec<u64>, dests: Vec<NodeId>) -> Self {
        Self {
            descriptor,
            adj_indices,
            dests,
            edge_prop_indices: None,
            node_prop_indices: None,
            edge_type_ids: None,
            per_type_adj_indices: None,
        }
    }

    /// Checks that the arrays describe a well-formed topology.
    ///
    /// Beyond length agreement this rejects destinations past the last node,
    /// property indices that are not a permutation of the stored ids, and
    /// per-type segments that leave their node's edge range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let num_nodes = self.adj_indices.len();
        let num_edges = self.dests.len();
        let adj_end = self.adj_indices.last().copied().unwrap_or(0);
        if adj_end != num_edges as u64 {
            return Err(Error::invalid_argument(format!(
                "adjacency ends at {adj_end} but {num_edges} destinations are stored"
            )));
        }
        if self.adj_indices.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::invalid_argument("adjacency is not non-decreasing"));
        }
        if let Some(dst) = self.dests.iter().find(|&&d| d as usize >= num_nodes) {
            return Err(Error::invalid_argument(format!(
                "destination {dst} out of range for {num_nodes} nodes"
            )));
        }
        if let Some(props) = &self.edge_prop_indices {
            check_permutation(props.iter().copied(), num_edges, "edge")?;
        }
        if let Some(props) = &self.node_prop_indices {
            check_permutation(props.iter().map(|&p| u64::from(p)), num_nodes, "node")?;
        }
        match (&self.edge_type_ids, &self.per_type_adj_indices) {
            (Some(types), Some(per_type)) => self.check_per_type(types.len(), per_type),
            (None, None) => Ok(()),
            _ => Err(Error::invalid_argument(
                "condensed type ids and per-type adjacency must be stored together",
            )),
        }
    }

    fn check_per_type(&self, num_types: usize, per_type: &[u64]) -> Result<()> {
        let num_nodes = self.adj_indices.len();
        if per_type.len() != num_nodes * num_types {
            return Err(Error::invalid_argument(format!(
                "per-type adjacency has {} entries, expected {num_nodes} nodes x {num_types} types",
                per_type.len()
            )));
        }
        if num_types == 0 {
            return Ok(());
        }
        for (node, ends) in per_type.chunks(num_types).enumerate() {
            let start = if node == 0 { 0 } else { self.adj_indices[node - 1] };
            let end = self.adj_indices[node];
            let mut prev = start;
            for &e in ends {
                if e < prev || e > end {
                    return Err(Error::invalid_argument(format!(
                        "per-type adjacency of node {node} leaves its edge range {start}..{end}"
                    )));
                }
                prev = e;
            }
            if prev != end {
                return Err(Error::invalid_argument(format!(
                    "per-type adjacency of node {node} ends at {prev}, expected {end}"
                )));
            }
        }
        Ok(())
    }
}

/// Checks that `ids` holds each of `0..len` exactly once.
fn check_permutation(
    ids: impl ExactSizeIterator<Item = u64>,
    len: usize,
    what: &str,
) -> Result<()> {
    if ids.len() != len {
        return Err(Error::invalid_argument(format!(
            "{} {what} property indices for {len} {what}s",
            ids.len()
        )));
    }
    let mut seen = vec![false; len];
    for id in ids {
        match seen.get_mut(id as usize) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(Error::invalid_argument(format!(
                    "{what} property index {id} appears twice"
                )));
            }
            None => {
                return Err(Error::invalid_argument(format!(
                    "{what} property index {id} out of range for {len} {what}s"
                )));
            }
        }
    }
    Ok(())
}

/// Handle onto a persisted topology.
///
/// The handle keeps the storage binding alive. Constructors copy the arrays
/// they need into owned memory and then call [`release`](Self::release).
#[derive(Debug, Clone)]
pub struct StoredTopology {
    record: Arc<TopologyRecord>,
}

impl StoredTopology {
    /// Wraps a freshly serialized record.
    #[must_use]
    pub fn new(record: TopologyRecord) -> Self {
        Self {
            record: Arc::new(record),
        }
    }

    pub(crate) fn from_shared(record: Arc<TopologyRecord>) -> Self {
        Self { record }
    }

    pub(crate) fn shared(&self) -> Arc<TopologyRecord> {
        Arc::clone(&self.record)
    }

    /// The underlying record.
    #[must_use]
    pub fn record(&self) -> &TopologyRecord {
        &self.record
    }

    /// Variant and state of the stored topology.
    #[must_use]
    pub fn descriptor(&self) -> ShadowDescriptor {
        self.record.descriptor
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.record.adj_indices.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.record.dests.len()
    }

    /// Adjacency boundaries.
    #[must_use]
    pub fn adj_indices(&self) -> &[u64] {
        &self.record.adj_indices
    }

    /// Destinations.
    #[must_use]
    pub fn dests(&self) -> &[NodeId] {
        &self.record.dests
    }

    /// Edge property indices, if stored.
    #[must_use]
    pub fn edge_prop_indices(&self) -> Option<&[EdgeId]> {
        self.record.edge_prop_indices.as_deref()
    }

    /// Node property indices, if stored.
    #[must_use]
    pub fn node_prop_indices(&self) -> Option<&[NodeId]> {
        self.record.node_prop_indices.as_deref()
    }

    /// Condensed edge type ids, if stored.
    #[must_use]
    pub fn edge_type_ids(&self) -> Option<&[EntityTypeId]> {
        self.record.edge_type_ids.as_deref()
    }

    /// Per-(node, type) adjacency, if stored.
    #[must_use]
    pub fn per_type_adj_indices(&self) -> Option<&[u64]> {
        self.record.per_type_adj_indices.as_deref()
    }

    /// Stored transpose state.
    #[must_use]
    pub fn transpose_state(&self) -> TransposeKind {
        self.record.descriptor.transpose
    }

    /// Stored edge sort state.
    #[must_use]
    pub fn edge_sort_state(&self) -> EdgeSortKind {
        self.record.descriptor.edge_sort
    }

    /// Stored node sort state.
    #[must_use]
    pub fn node_sort_state(&self) -> NodeSortKind {
        self.record.descriptor.node_sort
    }

    /// Drops the storage binding once data has been copied out.
    pub fn release(self) {
        tracing::trace!(descriptor = %self.record.descriptor, "releasing stored topology");
    }
}
