//! CSR <-> BSR kernels
//!
//! Both directions assign one work group per block row; within it, one lane
//! per scalar row of the block row.

use super::{BLOCK_SIZE, CsxView, ix};
use crate::descr::Direction;
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Offset of cell `(r, c)` inside a `dim x dim` block
#[inline]
pub(crate) fn block_offset(dir: Direction, r: usize, c: usize, dim: usize) -> usize {
    match dir {
        Direction::Row => r * dim + c,
        Direction::Column => c * dim + r,
    }
}

fn block_row_config(mb: usize, block_dim: usize) -> LaunchConfig {
    LaunchConfig {
        grid_size: mb,
        block_size: block_dim,
    }
}

/// Sorted distinct block columns touched by rows `[row0, row1)`
unsafe fn block_columns<T>(
    csr: &CsxView<T>,
    rows: std::ops::Range<usize>,
    block_dim: usize,
    cols: &mut Vec<i32>,
) {
    cols.clear();
    for row in rows {
        for j in unsafe { csr.range(row) } {
            let col = unsafe { csr.ind.read(j) } - csr.base;
            cols.push(col / block_dim as i32);
        }
    }
    cols.sort_unstable();
    cols.dedup();
}

/// Block count of every block row into `bsr_row_ptr[1..=mb]`, `bsr_base`
/// into `bsr_row_ptr[0]`
///
/// # Safety
///
/// `csr` must describe `m` rows; `bsr_row_ptr` must address `mb + 1`
/// elements.
pub(crate) unsafe fn csr2bsr_count<R: Runtime>(
    client: &R::Client,
    m: usize,
    block_dim: usize,
    csr: CsxView<()>,
    bsr_base: i32,
    bsr_row_ptr: DevicePtr<i32>,
) -> Result<()> {
    let mb = m.div_ceil(block_dim);
    client.launch(
        "csr2bsr_count",
        block_row_config(mb, block_dim),
        &|idx| {
            let ib = idx.block_id;
            let rows = ib * block_dim..((ib + 1) * block_dim).min(m);
            let mut cols = Vec::new();
            unsafe { block_columns(&csr, rows, block_dim, &mut cols) };
            unsafe { bsr_row_ptr.write(ib + 1, cols.len() as i32) };
            if ib == 0 {
                unsafe { bsr_row_ptr.write(0, bsr_base) };
            }
        },
    )
}

/// Fill block columns and block values of every block row
///
/// Each block row zeroes its own blocks before scattering, so untouched cells
/// read as zero.
///
/// # Safety
///
/// `csr` must describe `m` rows; `bsr.ptr` must hold the offsets produced by
/// the count phase and `bsr.ind`/`bsr.val` must be sized from them.
pub(crate) unsafe fn csr2bsr_fill<R: Runtime, T: Element>(
    client: &R::Client,
    dir: Direction,
    m: usize,
    block_dim: usize,
    csr: CsxView<T>,
    bsr: CsxView<T>,
) -> Result<()> {
    let mb = m.div_ceil(block_dim);
    let block_len = block_dim * block_dim;
    client.launch(
        "csr2bsr_fill",
        block_row_config(mb, block_dim),
        &|idx| {
            let ib = idx.block_id;
            let row0 = ib * block_dim;
            let rows = row0..((ib + 1) * block_dim).min(m);
            let mut cols = Vec::new();
            unsafe { block_columns(&csr, rows.clone(), block_dim, &mut cols) };

            let start = ix(unsafe { bsr.ptr.read(ib) } - bsr.base);
            for (k, &bc) in cols.iter().enumerate() {
                unsafe { bsr.ind.write(start + k, bc + bsr.base) };
            }
            for cell in start * block_len..(start + cols.len()) * block_len {
                unsafe { bsr.val.write(cell, T::zero()) };
            }

            for row in rows {
                for j in unsafe { csr.range(row) } {
                    let col = ix(unsafe { csr.ind.read(j) } - csr.base);
                    let bc = (col / block_dim) as i32;
                    // Present by construction of `cols`
                    let Ok(k) = cols.binary_search(&bc) else {
                        continue;
                    };
                    let cell = block_offset(dir, row - row0, col % block_dim, block_dim);
                    unsafe {
                        bsr.val
                            .write((start + k) * block_len + cell, csr.val.read(j))
                    };
                }
            }
        },
    )
}

/// Row pointer of a `block_dim == 1` conversion: the CSR row pointer rebased
///
/// # Safety
///
/// Both pointers must address `m + 1` elements.
pub(crate) unsafe fn rebase_ptr<R: Runtime>(
    client: &R::Client,
    len: usize,
    src: DevicePtr<i32>,
    src_base: i32,
    dst: DevicePtr<i32>,
    dst_base: i32,
) -> Result<()> {
    client.launch(
        "rebase_ptr",
        LaunchConfig::for_items(len, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let gid = idx.global_id(tid);
                if gid >= len {
                    break;
                }
                unsafe { dst.write(gid, src.read(gid) - src_base + dst_base) };
            }
        },
    )
}

/// Column indices and values of a `block_dim == 1` conversion
///
/// # Safety
///
/// `csr` must describe `m` rows; `bsr` arrays must hold as many entries.
pub(crate) unsafe fn csr2bsr_unit_fill<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    csr: CsxView<T>,
    bsr: CsxView<T>,
) -> Result<()> {
    client.launch(
        "csr2bsr_unit_fill",
        LaunchConfig::for_items(m, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let row = idx.global_id(tid);
                if row >= m {
                    break;
                }
                for j in unsafe { csr.range(row) } {
                    unsafe {
                        bsr.ind.write(j, csr.ind.read(j) - csr.base + bsr.base);
                        bsr.val.write(j, csr.val.read(j));
                    }
                }
            }
        },
    )
}

/// Expand every block into `block_dim` CSR rows, explicit zeros included
///
/// # Safety
///
/// `bsr` must describe `mb` block rows; `csr.ptr` must address
/// `mb * block_dim + 1` elements and `csr.ind`/`csr.val` `nnzb * block_dim^2`.
pub(crate) unsafe fn bsr2csr<R: Runtime, T: Element>(
    client: &R::Client,
    dir: Direction,
    mb: usize,
    block_dim: usize,
    bsr: CsxView<T>,
    csr: CsxView<T>,
) -> Result<()> {
    let block_len = block_dim * block_dim;
    client.launch(
        "bsr2csr",
        block_row_config(mb, block_dim),
        &|idx| {
            let ib = idx.block_id;
            let blocks = unsafe { bsr.range(ib) };
            let nblocks = blocks.len();
            for r in idx.lanes() {
                let row = ib * block_dim + r;
                let row_start = blocks.start * block_len + r * nblocks * block_dim;
                unsafe { csr.ptr.write(row, row_start as i32 + csr.base) };

                for (k, b) in blocks.clone().enumerate() {
                    let bc = ix(unsafe { bsr.ind.read(b) } - bsr.base);
                    for c in 0..block_dim {
                        let pos = row_start + k * block_dim + c;
                        let value =
                            unsafe { bsr.val.read(b * block_len + block_offset(dir, r, c, block_dim)) };
                        unsafe {
                            csr.ind.write(pos, (bc * block_dim + c) as i32 + csr.base);
                            csr.val.write(pos, value);
                        }
                    }
                }
            }
            if ib + 1 == idx.grid_size {
                let total = blocks.end * block_len;
                unsafe { csr.ptr.write(mb * block_dim, total as i32 + csr.base) };
            }
        },
    )
}
