//! Data-parallel helpers for topology construction.
//!
//! All topology builds are fork-join over disjoint node or edge ranges on
//! the global rayon pool. Nothing here owns long-lived scheduler state.
//!
//! - [`fold`] - Fold-reduce with thread-local accumulators
//! - [`prefix`] - Parallel inclusive prefix sums for adjacency boundaries

pub mod fold;
pub mod prefix;

pub use fold::{Mergeable, fold_reduce, parallel_count};
pub use prefix::{exclusive_begin, prefix_sum_in_place};
