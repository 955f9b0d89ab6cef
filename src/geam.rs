//! Sparse matrix addition `C = alpha * A + beta * B`
//!
//! All three matrices are `m x n` CSR with sorted column indices; each may
//! use its own index base. [`csrgeam_nnz`] builds C's row pointer from the
//! per-row union of A's and B's columns; [`csrgeam`] fills C's columns and
//! values into that structure. A column present in either input produces an
//! entry in C even when the computed value is zero.
//!
//! Rows with unsorted or duplicated column indices give unspecified output.

use crate::descr::{MatDescr, ResultSink, ScalarArg};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::kernels::{self, CsxView};
use crate::primitives::{scan_in_place, write_scalar, write_total};
use crate::runtime::{DevicePtr, Runtime};

/// Validated dimensions of an addition
struct Dims {
    m: usize,
    nnz_a: usize,
    nnz_b: usize,
}

fn check_sizes(m: i32, n: i32, nnz_a: i32, nnz_b: i32) -> Result<(Dims, bool)> {
    let m_ = Error::check_size("m", m)?;
    Error::check_size("n", n)?;
    let dims = Dims {
        m: m_,
        nnz_a: Error::check_size("nnz_a", nnz_a)?,
        nnz_b: Error::check_size("nnz_b", nnz_b)?,
    };
    Ok((dims, m == 0 || n == 0))
}

/// Build the row pointer of `C = A + B` and report its entry count
///
/// `c_row_ptr` receives `m + 1` offsets in C's index base; `nnz_c` the number
/// of entries C needs.
#[allow(clippy::too_many_arguments)]
pub fn csrgeam_nnz<R: Runtime>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr_a: &MatDescr,
    nnz_a: i32,
    a_row_ptr: DevicePtr<i32>,
    a_col_ind: DevicePtr<i32>,
    descr_b: &MatDescr,
    nnz_b: i32,
    b_row_ptr: DevicePtr<i32>,
    b_col_ind: DevicePtr<i32>,
    descr_c: &MatDescr,
    c_row_ptr: DevicePtr<i32>,
    nnz_c: ResultSink<'_>,
) -> Result<()> {
    log::trace!("csrgeam_nnz: m={m} n={n} nnz_a={nnz_a} nnz_b={nnz_b}");
    let (dims, empty) = check_sizes(m, n, nnz_a, nnz_b)?;
    if empty {
        return write_scalar(handle, nnz_c, 0);
    }

    a_row_ptr.require("a_row_ptr")?;
    a_col_ind.require("a_col_ind")?;
    b_row_ptr.require("b_row_ptr")?;
    b_col_ind.require("b_col_ind")?;
    c_row_ptr.require("c_row_ptr")?;
    nnz_c.require("nnz_c")?;
    descr_a.require_general()?;
    descr_b.require_general()?;
    descr_c.require_general()?;

    let m = dims.m;
    a_row_ptr.require_len(m + 1, "a_row_ptr")?;
    b_row_ptr.require_len(m + 1, "b_row_ptr")?;
    c_row_ptr.require_len(m + 1, "c_row_ptr")?;
    a_col_ind.require_len(dims.nnz_a, "a_col_ind")?;
    b_col_ind.require_len(dims.nnz_b, "b_col_ind")?;

    let client = handle.client();
    let c_base = descr_c.base();
    if dims.nnz_a == 0 && dims.nnz_b == 0 {
        // SAFETY: c_row_ptr holds m + 1 elements
        unsafe { kernels::fill::<R, i32>(client, c_row_ptr, m + 1, c_base)? };
        return write_scalar(handle, nnz_c, 0);
    }

    let a = CsxView {
        ptr: a_row_ptr,
        ind: a_col_ind,
        val: DevicePtr::<()>::null(),
        base: descr_a.base(),
    };
    let b = CsxView {
        ptr: b_row_ptr,
        ind: b_col_ind,
        val: DevicePtr::<()>::null(),
        base: descr_b.base(),
    };
    // SAFETY: row pointers validated above; column reads are bounds-checked
    unsafe { kernels::geam::geam_count::<R>(client, m, a, b, c_base, c_row_ptr)? };
    scan_in_place(handle, m + 1, c_row_ptr)?;
    write_total(handle, c_row_ptr, m, c_base, nnz_c)
}

/// Compute `C = alpha * A + beta * B` into the structure built by
/// [`csrgeam_nnz`]
///
/// `alpha` and `beta` are required in either pointer mode; a device scalar is
/// read by the filling kernel. Passing `beta = 0` yields `alpha * A` on the
/// union structure.
#[allow(clippy::too_many_arguments)]
pub fn csrgeam<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    alpha: ScalarArg<'_, T>,
    descr_a: &MatDescr,
    nnz_a: i32,
    a_val: DevicePtr<T>,
    a_row_ptr: DevicePtr<i32>,
    a_col_ind: DevicePtr<i32>,
    beta: ScalarArg<'_, T>,
    descr_b: &MatDescr,
    nnz_b: i32,
    b_val: DevicePtr<T>,
    b_row_ptr: DevicePtr<i32>,
    b_col_ind: DevicePtr<i32>,
    descr_c: &MatDescr,
    c_val: DevicePtr<T>,
    c_row_ptr: DevicePtr<i32>,
    c_col_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!(
        "csrgeam<{}>: m={m} n={n} nnz_a={nnz_a} nnz_b={nnz_b} alpha={:?} beta={:?}",
        T::DTYPE,
        alpha.mode(),
        beta.mode()
    );
    let (dims, empty) = check_sizes(m, n, nnz_a, nnz_b)?;
    alpha.require("alpha")?;
    beta.require("beta")?;
    if empty || (dims.nnz_a == 0 && dims.nnz_b == 0) {
        return Ok(());
    }

    // Values of a structurally empty operand are never read
    if dims.nnz_a > 0 {
        a_val.require("a_val")?;
    }
    a_row_ptr.require("a_row_ptr")?;
    a_col_ind.require("a_col_ind")?;
    if dims.nnz_b > 0 {
        b_val.require("b_val")?;
    }
    b_row_ptr.require("b_row_ptr")?;
    b_col_ind.require("b_col_ind")?;
    c_val.require("c_val")?;
    c_row_ptr.require("c_row_ptr")?;
    c_col_ind.require("c_col_ind")?;
    descr_a.require_general()?;
    descr_b.require_general()?;
    descr_c.require_general()?;

    let m = dims.m;
    a_row_ptr.require_len(m + 1, "a_row_ptr")?;
    b_row_ptr.require_len(m + 1, "b_row_ptr")?;
    c_row_ptr.require_len(m + 1, "c_row_ptr")?;
    a_col_ind.require_len(dims.nnz_a, "a_col_ind")?;
    if dims.nnz_a > 0 {
        a_val.require_len(dims.nnz_a, "a_val")?;
    }
    b_col_ind.require_len(dims.nnz_b, "b_col_ind")?;
    if dims.nnz_b > 0 {
        b_val.require_len(dims.nnz_b, "b_val")?;
    }

    let a = CsxView {
        ptr: a_row_ptr,
        ind: a_col_ind,
        val: a_val,
        base: descr_a.base(),
    };
    let b = CsxView {
        ptr: b_row_ptr,
        ind: b_col_ind,
        val: b_val,
        base: descr_b.base(),
    };
    let c = CsxView {
        ptr: c_row_ptr,
        ind: c_col_ind,
        val: c_val,
        base: descr_c.base(),
    };
    // SAFETY: inputs validated above; C entries are bounds-checked on access
    unsafe { kernels::geam::geam_fill::<R, T>(handle.client(), m, alpha, a, beta, b, c) }
}
