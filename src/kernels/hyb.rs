//! CSR <-> HYB kernels
//!
//! The ELL part stores `width` slots per row in column-major order (slot `k`
//! of row `i` at `i + k * m`); unused slots hold column `-1` and a zero value.
//! Entries beyond `width` in a row go to the COO part in row order.

use super::{BLOCK_SIZE, CsxView, ix, lower_bound};
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Column index marking an unused ELL slot
pub(crate) const ELL_PAD: i32 = -1;

/// Device arrays of the ELL part
#[derive(Copy, Clone, Debug)]
pub(crate) struct EllView<'a, T> {
    pub width: usize,
    pub col_ind: DevicePtr<'a, i32>,
    pub val: DevicePtr<'a, T>,
}

/// Device arrays of the COO part
#[derive(Copy, Clone, Debug)]
pub(crate) struct CooView<'a, T> {
    pub nnz: usize,
    pub row_ind: DevicePtr<'a, i32>,
    pub col_ind: DevicePtr<'a, i32>,
    pub val: DevicePtr<'a, T>,
}

fn per_row(m: usize) -> LaunchConfig {
    LaunchConfig::for_items(m, BLOCK_SIZE)
}

/// `out[i] = f(len(row i))` for every row
///
/// # Safety
///
/// `row_ptr` must address `m + 1` elements and `out` `m`.
pub(crate) unsafe fn map_row_lengths<R: Runtime>(
    client: &R::Client,
    m: usize,
    row_ptr: DevicePtr<i32>,
    out: DevicePtr<i32>,
    f: fn(i32, i32) -> i32,
    arg: i32,
) -> Result<()> {
    client.launch("map_row_lengths", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let len = unsafe { row_ptr.read(row + 1) - row_ptr.read(row) };
            unsafe { out.write(row, f(len, arg)) };
        }
    })
}

/// Row length
pub(crate) fn row_length(len: i32, _: i32) -> i32 {
    len
}

/// Entries of a row that overflow an ELL part of width `width`
pub(crate) fn ell_overflow(len: i32, width: i32) -> i32 {
    (len - width).max(0)
}

/// Fill the ELL part with the first `width` entries of every row
///
/// # Safety
///
/// `csr` must describe `m` rows; `ell` arrays must address `m * width`
/// elements.
pub(crate) unsafe fn csr2ell<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    csr: CsxView<T>,
    ell: EllView<T>,
) -> Result<()> {
    client.launch("csr2ell", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let entries = unsafe { csr.range(row) };
            for k in 0..ell.width {
                let slot = row + k * m;
                let j = entries.start + k;
                unsafe {
                    if j < entries.end {
                        ell.col_ind.write(slot, csr.ind.read(j));
                        ell.val.write(slot, csr.val.read(j));
                    } else {
                        ell.col_ind.write(slot, ELL_PAD);
                        ell.val.write(slot, T::zero());
                    }
                }
            }
        }
    })
}

/// Move the entries beyond `width` of every row into the COO part
///
/// # Safety
///
/// `coo_ptr` must hold zero-based offsets of the overflow counts (`m + 1`
/// elements); `coo` arrays must be sized from `coo_ptr[m]`.
pub(crate) unsafe fn csr2coo_overflow<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    width: usize,
    csr: CsxView<T>,
    coo_ptr: DevicePtr<i32>,
    coo: CooView<T>,
) -> Result<()> {
    client.launch("csr2coo_overflow", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let entries = unsafe { csr.range(row) };
            let mut pos = ix(unsafe { coo_ptr.read(row) });
            for j in (entries.start + width)..entries.end {
                unsafe {
                    coo.row_ind.write(pos, row as i32 + csr.base);
                    coo.col_ind.write(pos, csr.ind.read(j));
                    coo.val.write(pos, csr.val.read(j));
                }
                pos += 1;
            }
        }
    })
}

/// Zero-based `[start, end)` of the COO entries of `row`
#[inline]
unsafe fn coo_rows<T>(coo: &CooView<T>, row: usize, base: i32) -> std::ops::Range<usize> {
    let start = unsafe { lower_bound(coo.row_ind, coo.nnz, row as i32 + base) };
    let end = unsafe { lower_bound(coo.row_ind, coo.nnz, row as i32 + 1 + base) };
    start..end
}

/// Entries per row of a HYB matrix
///
/// # Safety
///
/// `ell` and `coo` must describe an `m`-row HYB matrix with COO rows sorted;
/// `counts` must address `m` elements.
pub(crate) unsafe fn hyb_row_counts<R: Runtime, T>(
    client: &R::Client,
    m: usize,
    base: i32,
    ell: EllView<T>,
    coo: CooView<T>,
    counts: DevicePtr<i32>,
) -> Result<()> {
    client.launch("hyb_row_counts", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let ell_count = (0..ell.width)
                .filter(|&k| unsafe { ell.col_ind.read(row + k * m) } != ELL_PAD)
                .count();
            let coo_count = unsafe { coo_rows(&coo, row, base) }.len();
            unsafe { counts.write(row, (ell_count + coo_count) as i32) };
        }
    })
}

/// Write the ELL then COO entries of every row into a CSR matrix whose row
/// pointer is already in place
///
/// # Safety
///
/// As [`hyb_row_counts`]; `csr.ptr` must hold offsets built from its counts.
pub(crate) unsafe fn hyb2csr_fill<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    ell: EllView<T>,
    coo: CooView<T>,
    csr: CsxView<T>,
) -> Result<()> {
    client.launch("hyb2csr_fill", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let mut pos = ix(unsafe { csr.ptr.read(row) } - csr.base);
            for k in 0..ell.width {
                let slot = row + k * m;
                let col = unsafe { ell.col_ind.read(slot) };
                if col == ELL_PAD {
                    continue;
                }
                unsafe {
                    csr.ind.write(pos, col);
                    csr.val.write(pos, ell.val.read(slot));
                }
                pos += 1;
            }
            for j in unsafe { coo_rows(&coo, row, csr.base) } {
                unsafe {
                    csr.ind.write(pos, coo.col_ind.read(j));
                    csr.val.write(pos, coo.val.read(j));
                }
                pos += 1;
            }
        }
    })
}
