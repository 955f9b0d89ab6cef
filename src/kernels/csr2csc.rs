//! CSR -> CSC kernels
//!
//! The transpose is computed as: expand row pointers to per-entry row
//! indices, stable-sort entry positions by column, gather rows (and values)
//! through the permutation, then derive column offsets from the sorted
//! columns.

use super::{BLOCK_SIZE, CsxView, ix, lower_bound};
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Row index (with `base`) of every entry
///
/// # Safety
///
/// `csr` must describe `m` rows; `rows` must address every entry.
pub(crate) unsafe fn csr2coo<R: Runtime, T>(
    client: &R::Client,
    m: usize,
    csr: CsxView<T>,
    rows: DevicePtr<i32>,
) -> Result<()> {
    client.launch(
        "csr2coo",
        LaunchConfig::for_items(m, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let row = idx.global_id(tid);
                if row >= m {
                    break;
                }
                for j in unsafe { csr.range(row) } {
                    unsafe { rows.write(j, row as i32 + csr.base) };
                }
            }
        },
    )
}

/// Stable sort of entry positions by column
///
/// Writes the permutation into `perm` and the sorted keys into `sorted`.
/// Runs as a single group.
///
/// # Safety
///
/// All three pointers must address `nnz` elements.
pub(crate) unsafe fn sort_by_column<R: Runtime>(
    client: &R::Client,
    nnz: usize,
    cols: DevicePtr<i32>,
    perm: DevicePtr<i32>,
    sorted: DevicePtr<i32>,
) -> Result<()> {
    client.launch(
        "sort_by_column",
        LaunchConfig {
            grid_size: 1,
            block_size: BLOCK_SIZE,
        },
        &|_| {
            let mut pairs: Vec<(i32, i32)> = (0..nnz)
                .map(|j| (unsafe { cols.read(j) }, j as i32))
                .collect();
            pairs.sort_by_key(|&(col, _)| col);
            for (g, (col, j)) in pairs.into_iter().enumerate() {
                unsafe {
                    sorted.write(g, col);
                    perm.write(g, j);
                }
            }
        },
    )
}

/// `out[g] = input[perm[g]]` for both index and (optionally) value arrays
///
/// # Safety
///
/// Every pointer must address `nnz` elements.
pub(crate) unsafe fn permute<R: Runtime, T: Copy + Send + Sync>(
    client: &R::Client,
    nnz: usize,
    perm: DevicePtr<i32>,
    in_ind: DevicePtr<i32>,
    out_ind: DevicePtr<i32>,
    values: Option<(DevicePtr<T>, DevicePtr<T>)>,
) -> Result<()> {
    client.launch(
        "permute",
        LaunchConfig::for_items(nnz, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let gid = idx.global_id(tid);
                if gid >= nnz {
                    break;
                }
                let src = ix(unsafe { perm.read(gid) });
                unsafe { out_ind.write(gid, in_ind.read(src)) };
                if let Some((in_val, out_val)) = values {
                    unsafe { out_val.write(gid, in_val.read(src)) };
                }
            }
        },
    )
}

/// Column offsets from sorted column indices: `col_ptr[j]` is the position
/// of the first entry with column `>= j`
///
/// # Safety
///
/// `sorted` must address `nnz` elements and `col_ptr` `n + 1`.
pub(crate) unsafe fn col_ptr_from_sorted<R: Runtime>(
    client: &R::Client,
    n: usize,
    nnz: usize,
    base: i32,
    sorted: DevicePtr<i32>,
    col_ptr: DevicePtr<i32>,
) -> Result<()> {
    client.launch(
        "col_ptr_from_sorted",
        LaunchConfig::for_items(n + 1, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let j = idx.global_id(tid);
                if j > n {
                    break;
                }
                let pos = unsafe { lower_bound(sorted, nnz, j as i32 + base) };
                unsafe { col_ptr.write(j, pos as i32 + base) };
            }
        },
    )
}
