//! Sparse addition kernels
//!
//! Both phases walk each output row as a two-pointer merge of the sorted
//! column indices of A and B. The count phase and the fill phase must use the
//! same merge so that column positions agree between them.

use super::{BLOCK_SIZE, CsxView, ix};
use crate::descr::ScalarArg;
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// One step of the merge
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Merge {
    A(usize),
    B(usize),
    Both(usize, usize),
}

/// Merge the zero-based columns of one row of A and B, calling `emit` with
/// the output column and the contributing entries
///
/// # Safety
///
/// The ranges must address valid entries of `a.ind` and `b.ind`.
#[inline]
unsafe fn merge_row<Ta, Tb>(
    a: &CsxView<Ta>,
    mut ja: std::ops::Range<usize>,
    b: &CsxView<Tb>,
    mut jb: std::ops::Range<usize>,
    mut emit: impl FnMut(i32, Merge),
) {
    loop {
        let ca = ja.clone().next().map(|j| unsafe { a.ind.read(j) } - a.base);
        let cb = jb.clone().next().map(|j| unsafe { b.ind.read(j) } - b.base);
        match (ca, cb) {
            (None, None) => break,
            (Some(c), None) => {
                emit(c, Merge::A(ja.start));
                ja.start += 1;
            }
            (None, Some(c)) => {
                emit(c, Merge::B(jb.start));
                jb.start += 1;
            }
            (Some(x), Some(y)) if x < y => {
                emit(x, Merge::A(ja.start));
                ja.start += 1;
            }
            (Some(x), Some(y)) if y < x => {
                emit(y, Merge::B(jb.start));
                jb.start += 1;
            }
            (Some(x), Some(_)) => {
                emit(x, Merge::Both(ja.start, jb.start));
                ja.start += 1;
                jb.start += 1;
            }
        }
    }
}

fn per_row(m: usize) -> LaunchConfig {
    LaunchConfig::for_items(m, BLOCK_SIZE)
}

/// Union size of every row into `c_row_ptr[1..=m]`, `c_base` into
/// `c_row_ptr[0]`
///
/// # Safety
///
/// `a` and `b` must describe `m` rows with sorted columns; `c_row_ptr` must
/// address `m + 1` elements.
pub(crate) unsafe fn geam_count<R: Runtime>(
    client: &R::Client,
    m: usize,
    a: CsxView<()>,
    b: CsxView<()>,
    c_base: i32,
    c_row_ptr: DevicePtr<i32>,
) -> Result<()> {
    client.launch("csrgeam_nnz", per_row(m), &|idx| {
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let mut count = 0i32;
            unsafe { merge_row(&a, a.range(row), &b, b.range(row), |_, _| count += 1) };
            unsafe { c_row_ptr.write(row + 1, count) };
            if row == 0 {
                unsafe { c_row_ptr.write(0, c_base) };
            }
        }
    })
}

/// Read a coefficient; device scalars are read on the device
///
/// # Safety
///
/// A device coefficient must address one element.
#[inline]
unsafe fn load<T: Copy>(scalar: ScalarArg<'_, T>) -> T {
    match scalar {
        ScalarArg::Host(value) => *value,
        ScalarArg::Device(ptr) => unsafe { ptr.read(0) },
    }
}

/// `C = alpha * A + beta * B` into the structure built by [`geam_count`]
///
/// # Safety
///
/// As [`geam_count`]; additionally `c.ptr` must hold the offsets it produced
/// and `c.ind`/`c.val` must be sized from them.
pub(crate) unsafe fn geam_fill<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    alpha: ScalarArg<'_, T>,
    a: CsxView<T>,
    beta: ScalarArg<'_, T>,
    b: CsxView<T>,
    c: CsxView<T>,
) -> Result<()> {
    client.launch("csrgeam", per_row(m), &|idx| {
        let alpha = unsafe { load(alpha) };
        let beta = unsafe { load(beta) };
        for tid in idx.lanes() {
            let row = idx.global_id(tid);
            if row >= m {
                break;
            }
            let mut pos = ix(unsafe { c.ptr.read(row) } - c.base);
            let emit = |col: i32, step: Merge| {
                let value = match step {
                    Merge::A(j) => alpha * unsafe { a.val.read(j) },
                    Merge::B(j) => beta * unsafe { b.val.read(j) },
                    Merge::Both(ja, jb) => {
                        alpha * unsafe { a.val.read(ja) } + beta * unsafe { b.val.read(jb) }
                    }
                };
                unsafe {
                    c.ind.write(pos, col + c.base);
                    c.val.write(pos, value);
                }
                pos += 1;
            };
            unsafe { merge_row(&a, a.range(row), &b, b.range(row), emit) };
        }
    })
}
