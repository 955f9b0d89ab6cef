//! In-place inclusive prefix sum of `i32` arrays
//!
//! Three launches: every group scans its tile and records the tile total,
//! a single group scans the totals, then every tile but the first adds the
//! total of the tiles before it.

use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Lanes per scan group
pub(crate) const SCAN_BLOCK: usize = 256;

const ITEMS_PER_LANE: usize = 4;

/// Elements scanned by one group
pub(crate) const SCAN_TILE: usize = SCAN_BLOCK * ITEMS_PER_LANE;

/// Number of tile totals needed for `n` elements
#[inline]
pub(crate) fn totals_len(n: usize) -> usize {
    n.div_ceil(SCAN_TILE)
}

/// Inclusive scan of `data[..n]` in place
///
/// # Safety
///
/// `data` must address `n` elements and `totals` at least `totals_len(n)`.
pub(crate) unsafe fn inclusive_scan<R: Runtime>(
    client: &R::Client,
    n: usize,
    data: DevicePtr<i32>,
    totals: DevicePtr<i32>,
) -> Result<()> {
    let grid = totals_len(n);
    if grid == 0 {
        return Ok(());
    }

    client.launch(
        "scan_tiles",
        LaunchConfig {
            grid_size: grid,
            block_size: SCAN_BLOCK,
        },
        &|idx| {
            let tile = idx.block_id * SCAN_TILE;
            // Each lane scans a contiguous run, then lane totals are scanned
            let mut lane_sums = [0i32; SCAN_BLOCK];
            for tid in idx.lanes() {
                let start = tile + tid * ITEMS_PER_LANE;
                let mut acc = 0;
                for i in start..(start + ITEMS_PER_LANE).min(n) {
                    acc += unsafe { data.read(i) };
                    unsafe { data.write(i, acc) };
                }
                lane_sums[tid] = acc;
            }
            let mut carry = 0;
            for tid in idx.lanes() {
                let start = tile + tid * ITEMS_PER_LANE;
                if carry != 0 {
                    for i in start..(start + ITEMS_PER_LANE).min(n) {
                        unsafe { data.write(i, data.read(i) + carry) };
                    }
                }
                carry += lane_sums[tid];
            }
            unsafe { totals.write(idx.block_id, carry) };
        },
    )?;

    if grid == 1 {
        return Ok(());
    }

    client.launch(
        "scan_totals",
        LaunchConfig {
            grid_size: 1,
            block_size: 1,
        },
        &|_| {
            let mut acc = 0;
            for g in 0..grid {
                acc += unsafe { totals.read(g) };
                unsafe { totals.write(g, acc) };
            }
        },
    )?;

    client.launch(
        "scan_propagate",
        LaunchConfig {
            grid_size: grid - 1,
            block_size: SCAN_BLOCK,
        },
        &|idx| {
            let tile = idx.block_id + 1;
            let offset = unsafe { totals.read(tile - 1) };
            let start = tile * SCAN_TILE;
            for tid in idx.lanes() {
                for k in 0..ITEMS_PER_LANE {
                    let i = start + k * SCAN_BLOCK + tid;
                    if i < n {
                        unsafe { data.write(i, data.read(i) + offset) };
                    }
                }
            }
        },
    )
}
