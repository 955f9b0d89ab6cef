//! Dense <-> compressed kernels
//!
//! Dense matrices are column-major with leading dimension `ld`: element
//! `(i, j)` lives at `i + j * ld`. The `Direction` argument names the
//! compressed axis: `Row` for CSR, `Column` for CSC. One lane per outer index.

use super::{BLOCK_SIZE, CsxView, ix};
use crate::descr::Direction;
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Dense shape as seen from the compressed axis
#[derive(Copy, Clone, Debug)]
pub(crate) struct DenseView<'a, T> {
    pub dir: Direction,
    pub m: usize,
    pub n: usize,
    pub a: DevicePtr<'a, T>,
    pub ld: usize,
}

impl<T> DenseView<'_, T> {
    #[inline]
    fn outer_len(&self) -> usize {
        match self.dir {
            Direction::Row => self.m,
            Direction::Column => self.n,
        }
    }

    #[inline]
    fn inner_len(&self) -> usize {
        match self.dir {
            Direction::Row => self.n,
            Direction::Column => self.m,
        }
    }

    /// Storage offset of (outer, inner)
    #[inline]
    fn offset(&self, outer: usize, inner: usize) -> usize {
        match self.dir {
            Direction::Row => outer + inner * self.ld,
            Direction::Column => inner + outer * self.ld,
        }
    }
}

fn outer_config<T>(dense: &DenseView<T>) -> LaunchConfig {
    LaunchConfig::for_items(dense.outer_len(), BLOCK_SIZE)
}

/// Count of entries `!= 0` per row or per column into `counts`
///
/// # Safety
///
/// `dense.a` must address the whole matrix; `counts` one element per outer
/// index.
pub(crate) unsafe fn count_nonzeros<R: Runtime, T: Element>(
    client: &R::Client,
    dense: DenseView<T>,
    counts: DevicePtr<i32>,
) -> Result<()> {
    let outer = dense.outer_len();
    client.launch("dense_nnz", outer_config(&dense), &|idx| {
        for tid in idx.lanes() {
            let o = idx.global_id(tid);
            if o >= outer {
                break;
            }
            let count = (0..dense.inner_len())
                .filter(|&k| !unsafe { dense.a.read(dense.offset(o, k)) }.is_zero())
                .count();
            unsafe { counts.write(o, count as i32) };
        }
    })
}

/// Gather the nonzeros of each outer index into a compressed matrix whose
/// offsets are already in place
///
/// # Safety
///
/// `csx.ptr` must hold offsets built from [`count_nonzeros`] of the same
/// matrix; `csx.ind`/`csx.val` must be sized from them.
pub(crate) unsafe fn dense2csx<R: Runtime, T: Element>(
    client: &R::Client,
    dense: DenseView<T>,
    csx: CsxView<T>,
) -> Result<()> {
    let outer = dense.outer_len();
    client.launch("dense2csx", outer_config(&dense), &|idx| {
        for tid in idx.lanes() {
            let o = idx.global_id(tid);
            if o >= outer {
                break;
            }
            let mut pos = ix(unsafe { csx.ptr.read(o) } - csx.base);
            for k in 0..dense.inner_len() {
                let value = unsafe { dense.a.read(dense.offset(o, k)) };
                if !value.is_zero() {
                    unsafe {
                        csx.ind.write(pos, k as i32 + csx.base);
                        csx.val.write(pos, value);
                    }
                    pos += 1;
                }
            }
        }
    })
}

/// Zero the `m` leading rows of every column; padding rows are untouched
///
/// # Safety
///
/// `a` must address `ld * (n - 1) + m` elements.
pub(crate) unsafe fn zero_dense<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    n: usize,
    a: DevicePtr<T>,
    ld: usize,
) -> Result<()> {
    client.launch(
        "zero_dense",
        LaunchConfig::for_items(n, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let j = idx.global_id(tid);
                if j >= n {
                    break;
                }
                for i in 0..m {
                    unsafe { a.write(i + j * ld, T::zero()) };
                }
            }
        },
    )
}

/// Scatter a compressed matrix into a zeroed dense matrix
///
/// # Safety
///
/// `csx` must describe `dense.outer_len()` outer entries with inner indices
/// in range; `dense.a` must address the whole matrix.
pub(crate) unsafe fn csx2dense<R: Runtime, T: Element>(
    client: &R::Client,
    csx: CsxView<T>,
    dense: DenseView<T>,
) -> Result<()> {
    let outer = dense.outer_len();
    client.launch("csx2dense", outer_config(&dense), &|idx| {
        for tid in idx.lanes() {
            let o = idx.global_id(tid);
            if o >= outer {
                break;
            }
            for j in unsafe { csx.range(o) } {
                let k = ix(unsafe { csx.ind.read(j) } - csx.base);
                unsafe { dense.a.write(dense.offset(o, k), csx.val.read(j)) };
            }
        }
    })
}
