//! Two-pass block reduction of `i32` arrays
//!
//! Pass one reduces tiles of `REDUCE_TILE` elements to one partial per
//! group; pass two reduces the partials in a single group.

use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Lanes per reduction group
pub(crate) const REDUCE_BLOCK: usize = 256;

const ITEMS_PER_LANE: usize = 4;

/// Elements reduced by one group in the first pass
pub(crate) const REDUCE_TILE: usize = REDUCE_BLOCK * ITEMS_PER_LANE;

/// Binary reduction operator
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReduceOp {
    Sum,
    Max,
}

impl ReduceOp {
    #[inline]
    fn identity(self) -> i32 {
        match self {
            Self::Sum => 0,
            Self::Max => i32::MIN,
        }
    }

    #[inline]
    fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            Self::Sum => a + b,
            Self::Max => a.max(b),
        }
    }
}

/// Number of partials the first pass produces for `n` elements
#[inline]
pub(crate) fn partials_len(n: usize) -> usize {
    n.div_ceil(REDUCE_TILE)
}

/// Tree reduction over a group-local array whose length is a power of two
fn tree_reduce(op: ReduceOp, shared: &mut [i32]) {
    let mut stride = shared.len() / 2;
    while stride > 0 {
        for tid in 0..stride {
            shared[tid] = op.apply(shared[tid], shared[tid + stride]);
        }
        stride /= 2;
    }
}

/// Reduce `input[..n]` into `out[0]`
///
/// # Safety
///
/// `input` must address `n` elements, `partials` at least `partials_len(n)`
/// and `out` one element.
pub(crate) unsafe fn reduce<R: Runtime>(
    client: &R::Client,
    op: ReduceOp,
    n: usize,
    input: DevicePtr<i32>,
    partials: DevicePtr<i32>,
    out: DevicePtr<i32>,
) -> Result<()> {
    let grid = partials_len(n);

    client.launch(
        "reduce_partials",
        LaunchConfig {
            grid_size: grid,
            block_size: REDUCE_BLOCK,
        },
        &|idx| {
            let base = idx.block_id * REDUCE_TILE;
            let mut shared = [op.identity(); REDUCE_BLOCK];
            for tid in idx.lanes() {
                let mut acc = op.identity();
                for k in 0..ITEMS_PER_LANE {
                    let i = base + k * REDUCE_BLOCK + tid;
                    if i < n {
                        acc = op.apply(acc, unsafe { input.read(i) });
                    }
                }
                shared[tid] = acc;
            }
            tree_reduce(op, &mut shared);
            unsafe { partials.write(idx.block_id, shared[0]) };
        },
    )?;

    client.launch(
        "reduce_final",
        LaunchConfig {
            grid_size: 1,
            block_size: REDUCE_BLOCK,
        },
        &|idx| {
            let mut shared = [op.identity(); REDUCE_BLOCK];
            for tid in idx.lanes() {
                let mut acc = op.identity();
                let mut i = tid;
                while i < grid {
                    acc = op.apply(acc, unsafe { partials.read(i) });
                    i += REDUCE_BLOCK;
                }
                shared[tid] = acc;
            }
            tree_reduce(op, &mut shared);
            unsafe { out.write(0, shared[0]) };
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_reduce() {
        let mut shared: Vec<i32> = (1..=8).collect();
        tree_reduce(ReduceOp::Sum, &mut shared);
        assert_eq!(shared[0], 36);

        let mut shared = vec![3, -1, 9, 4];
        tree_reduce(ReduceOp::Max, &mut shared);
        assert_eq!(shared[0], 9);
    }

    #[test]
    fn test_partials_len() {
        assert_eq!(partials_len(1), 1);
        assert_eq!(partials_len(REDUCE_TILE), 1);
        assert_eq!(partials_len(REDUCE_TILE + 1), 2);
    }
}
