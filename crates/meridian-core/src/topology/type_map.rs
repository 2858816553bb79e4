//! Dense re-indexing of the entity types present in a graph.

use std::collections::BTreeSet;

use meridian_common::{EntityTypeId, Error, Result};
use rayon::prelude::*;

use crate::graph::PropertyGraph;
use crate::parallel::fold_reduce;

/// Bijection between the sparse type ids that occur in an entity set and a
/// dense index space `0..k`.
///
/// Indices are assigned in ascending type-id order, so the mapping depends
/// only on which types occur, never on thread count or scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondensedTypeIdMap {
    index_to_type: Vec<EntityTypeId>,
    type_to_index: Box<[Option<u8>; EntityTypeId::CARDINALITY]>,
}

impl Default for CondensedTypeIdMap {
    fn default() -> Self {
        Self {
            index_to_type: Vec::new(),
            type_to_index: Box::new([None; EntityTypeId::CARDINALITY]),
        }
    }
}

impl CondensedTypeIdMap {
    /// Builds the map from the types of every edge in `graph`.
    ///
    /// Each worker collects the types it sees into a thread-local ordered set;
    /// the sets are merged once after the parallel pass.
    #[must_use]
    pub fn make_from_edge_types(graph: &dyn PropertyGraph) -> Self {
        let items = graph.topology().all_edges().into_par_iter();
        let seen = fold_reduce(items, |mut acc: BTreeSet<EntityTypeId>, edge| {
            acc.insert(graph.type_of_edge(edge));
            acc
        });
        Self::from_sorted_set(seen)
    }

    /// Builds the map from the types of every node in `graph`.
    #[must_use]
    pub fn make_from_node_types(graph: &dyn PropertyGraph) -> Self {
        let items = graph.topology().nodes().into_par_iter();
        let seen = fold_reduce(items, |mut acc: BTreeSet<EntityTypeId>, node| {
            acc.insert(graph.type_of_node(node));
            acc
        });
        Self::from_sorted_set(seen)
    }

    /// Rebuilds a map from its dense-index-to-type array, as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the array is not strictly
    /// ascending (duplicate or out-of-order types).
    pub fn from_index_to_type(types: &[EntityTypeId]) -> Result<Self> {
        if types.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_argument(
                "condensed type ids must be strictly ascending",
            ));
        }
        Ok(Self::from_sorted_set(types.iter().copied().collect()))
    }

    fn from_sorted_set(seen: BTreeSet<EntityTypeId>) -> Self {
        let mut map = Self::default();
        for (index, ty) in seen.into_iter().enumerate() {
            // At most 256 distinct u8 ids, so the index always fits.
            map.type_to_index[ty.as_index()] = Some(index as u8);
            map.index_to_type.push(ty);
        }
        map
    }

    /// Number of distinct types, `k`.
    #[must_use]
    pub fn num_unique_types(&self) -> usize {
        self.index_to_type.len()
    }

    /// Type id at dense `index`.
    #[must_use]
    pub fn get_type(&self, index: usize) -> Option<EntityTypeId> {
        self.index_to_type.get(index).copied()
    }

    /// Dense index of `ty`, if it occurs.
    #[inline]
    #[must_use]
    pub fn get_index(&self, ty: EntityTypeId) -> Option<usize> {
        self.type_to_index[ty.as_index()].map(usize::from)
    }

    /// Dense index to type array, ascending.
    #[must_use]
    pub fn index_to_type(&self) -> &[EntityTypeId] {
        &self.index_to_type
    }

    /// Returns true if the forward and reverse maps agree.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mapped = self.type_to_index.iter().filter(|i| i.is_some()).count();
        mapped == self.index_to_type.len()
            && self
                .index_to_type
                .iter()
                .enumerate()
                .all(|(i, &ty)| self.get_index(ty) == Some(i))
    }

    /// Checks that a persisted map is identical to this live one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stale`] on any size or content difference.
    pub fn check_compatible(&self, stored: &[EntityTypeId]) -> Result<()> {
        if stored.len() != self.index_to_type.len() {
            return Err(Error::stale(format!(
                "stored type map has {} types, live graph has {}",
                stored.len(),
                self.index_to_type.len()
            )));
        }
        if let Some(i) = (0..stored.len()).find(|&i| stored[i] != self.index_to_type[i]) {
            return Err(Error::stale(format!(
                "stored type map differs at index {i}: {} != {}",
                stored[i], self.index_to_type[i]
            )));
        }
        Ok(())
    }
}
