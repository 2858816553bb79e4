//! Parallel prefix sums.
//!
//! Every CSR build ends in the same step: per-node counts become adjacency
//! boundaries. The scan runs in three passes over fixed-size blocks:
//! local scans in parallel, a sequential scan over block totals, then a
//! parallel offset fix-up.

use rayon::prelude::*;

/// Block size below which the scan stays sequential.
const BLOCK_SIZE: usize = 1 << 14;

/// Replaces `values[i]` with `values[0] + ... + values[i]`.
///
/// After the call `values` is a valid adjacency array when the input held
/// per-node degrees.
///
/// # Example
///
/// ```
/// use meridian_core::parallel::prefix_sum_in_place;
///
/// let mut degrees = vec![2u64, 0, 3, 1];
/// prefix_sum_in_place(&mut degrees);
/// assert_eq!(degrees, vec![2, 2, 5, 6]);
/// ```
pub fn prefix_sum_in_place(values: &mut [u64]) {
    if values.len() <= BLOCK_SIZE {
        sequential_scan(values);
        return;
    }

    let block_totals: Vec<u64> = values
        .par_chunks_mut(BLOCK_SIZE)
        .map(|block| {
            sequential_scan(block);
            block.last().copied().unwrap_or(0)
        })
        .collect();

    let mut offsets = Vec::with_capacity(block_totals.len());
    let mut running = 0u64;
    for total in block_totals {
        offsets.push(running);
        running += total;
    }

    values
        .par_chunks_mut(BLOCK_SIZE)
        .zip(offsets.par_iter())
        .skip(1)
        .for_each(|(block, &offset)| {
            for v in block {
                *v += offset;
            }
        });
}

/// Exclusive begin of `index`'s range in an inclusive prefix-sum array.
#[inline]
#[must_use]
pub fn exclusive_begin(bounds: &[u64], index: usize) -> u64 {
    if index == 0 { 0 } else { bounds[index - 1] }
}

fn sequential_scan(values: &mut [u64]) {
    let mut running = 0u64;
    for v in values {
        running += *v;
        *v = running;
    }
}
