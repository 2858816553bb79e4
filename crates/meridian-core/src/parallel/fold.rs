//! Parallel fold-reduce utilities using Rayon.
//!
//! Each worker folds into its own accumulator and the accumulators are
//! merged once after the parallel region. This is how type discovery and
//! inclusion counting avoid shared mutable state.
//!
//! # Example
//!
//! ```
//! use meridian_core::parallel::fold::parallel_count;
//! use rayon::prelude::*;
//!
//! let numbers: Vec<i32> = (0..1000).collect();
//! let even_count = parallel_count(numbers.par_iter(), |n| *n % 2 == 0);
//! assert_eq!(even_count, 500);
//! ```

use std::collections::BTreeSet;

use rayon::prelude::*;

/// Trait for types that can be merged in parallel fold-reduce operations.
///
/// Implement this for custom accumulator types that need to be combined
/// after parallel processing.
pub trait Mergeable: Send + Default {
    /// Merges another instance into this one.
    fn merge(&mut self, other: Self);
}

impl<T: Ord + Send> Mergeable for BTreeSet<T> {
    fn merge(&mut self, mut other: Self) {
        if other.len() > self.len() {
            std::mem::swap(self, &mut other);
        }
        self.append(&mut other);
    }
}

impl Mergeable for u64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

/// Execute parallel fold-reduce with custom accumulator.
///
/// 1. Each thread gets its own accumulator (created by `T::default`)
/// 2. `fold_fn` processes items into thread-local accumulators
/// 3. Accumulators are combined with [`Mergeable::merge`]
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use meridian_core::parallel::fold::fold_reduce;
/// use rayon::prelude::*;
///
/// let items = vec![3u8, 1, 3, 2, 1];
/// let distinct = fold_reduce(items.into_par_iter(), |mut acc: BTreeSet<u8>, item| {
///     acc.insert(item);
///     acc
/// });
/// assert_eq!(distinct.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
pub fn fold_reduce<T, I, F>(items: I, fold_fn: F) -> T
where
    T: Mergeable,
    I: ParallelIterator,
    F: Fn(T, I::Item) -> T + Sync + Send,
{
    items.fold(T::default, fold_fn).reduce(T::default, |mut a, b| {
        a.merge(b);
        a
    })
}

/// Count items matching a predicate in parallel.
///
/// Efficiently counts matching items using fold-reduce,
/// with no lock contention between threads.
pub fn parallel_count<T, I, P>(items: I, predicate: P) -> usize
where
    T: Send,
    I: ParallelIterator<Item = T>,
    P: Fn(&T) -> bool + Sync + Send,
{
    items
        .fold(|| 0usize, |count, item| count + predicate(&item) as usize)
        .reduce(|| 0, |a, b| a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_count() {
        let numbers: Vec<i32> = (0..1000).collect();
        let even_count = parallel_count(numbers.par_iter(), |n| *n % 2 == 0);
        assert_eq!(even_count, 500);
    }

    #[test]
    fn test_fold_reduce_sum() {
        let items: Vec<u64> = (1..=10).collect();
        let sum: u64 = fold_reduce(items.into_par_iter(), |acc, item| acc + item);
        assert_eq!(sum, 55);
    }

    #[test]
    fn test_fold_reduce_set_is_sorted_and_distinct() {
        let items: Vec<u32> = (0..10_000).map(|i| (i * 7919) % 13).collect();
        let set = fold_reduce(items.into_par_iter(), |mut acc: BTreeSet<u32>, item| {
            acc.insert(item);
            acc
        });
        assert_eq!(set.into_iter().collect::<Vec<_>>(), (0..13).collect::<Vec<_>>());
    }

    #[test]
    fn test_btree_merge_keeps_larger_side() {
        let mut small: BTreeSet<u8> = [1].into_iter().collect();
        let large: BTreeSet<u8> = [2, 3, 4].into_iter().collect();
        small.merge(large);
        assert_eq!(small.len(), 4);
    }
}
