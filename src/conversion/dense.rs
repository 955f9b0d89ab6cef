//! Dense <-> CSR/CSC conversion
//!
//! Dense matrices are column-major with leading dimension `ld >= m`.

use crate::descr::{Direction, MatDescr, ResultSink};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::kernels::dense::DenseView;
use crate::kernels::{self, CsxView};
use crate::primitives::{scan_in_place, sum_into_sink, write_scalar};
use crate::runtime::{DevicePtr, Runtime};

/// Validate `m`, `n` and `ld`; returns `(m, n, ld)`
fn check_dense_sizes(m: i32, n: i32, ld: i32) -> Result<(usize, usize, usize)> {
    let m_ = Error::check_size("m", m)?;
    let n_ = Error::check_size("n", n)?;
    if ld < m {
        return Err(Error::invalid_size("ld", ld));
    }
    Ok((m_, n_, ld as usize))
}

/// Elements a column-major `m x n` matrix with leading dimension `ld` spans
fn dense_extent(m: usize, n: usize, ld: usize) -> usize {
    if m == 0 || n == 0 { 0 } else { ld * (n - 1) + m }
}

/// Count the entries `!= 0` of each row (`Direction::Row`) or column
/// (`Direction::Column`) of a dense matrix, and their total
///
/// `nnz_per_row_col` receives `m` or `n` counts. When `m == 0 || n == 0`
/// the total is `0` and a null device sink is tolerated.
#[allow(clippy::too_many_arguments)]
pub fn nnz<R: Runtime, T: Element>(
    handle: &Handle<R>,
    dir: Direction,
    m: i32,
    n: i32,
    descr: &MatDescr,
    a: DevicePtr<T>,
    ld: i32,
    nnz_per_row_col: DevicePtr<i32>,
    nnz_total: ResultSink<'_>,
) -> Result<()> {
    log::trace!("nnz<{}>: dir={dir:?} m={m} n={n} ld={ld}", T::DTYPE);
    let (m, n, ld) = check_dense_sizes(m, n, ld)?;
    if m == 0 || n == 0 {
        return write_scalar(handle, nnz_total, 0);
    }

    nnz_per_row_col.require("nnz_per_row_col")?;
    a.require("a")?;
    nnz_total.require("nnz_total")?;
    descr.require_general()?;

    let outer = match dir {
        Direction::Row => m,
        Direction::Column => n,
    };
    a.require_len(dense_extent(m, n, ld), "a")?;
    nnz_per_row_col.require_len(outer, "nnz_per_row_col")?;

    let dense = DenseView { dir, m, n, a, ld };
    // SAFETY: a spans the matrix and counts has one slot per outer index
    unsafe { kernels::dense::count_nonzeros::<R, T>(handle.client(), dense, nnz_per_row_col)? };
    sum_into_sink(handle, outer, nnz_per_row_col, nnz_total)
}

#[allow(clippy::too_many_arguments)]
fn dense2csx<R: Runtime, T: Element>(
    handle: &Handle<R>,
    dir: Direction,
    m: i32,
    n: i32,
    descr: &MatDescr,
    a: DevicePtr<T>,
    ld: i32,
    nnz_per: DevicePtr<i32>,
    csx_val: DevicePtr<T>,
    csx_ptr: DevicePtr<i32>,
    csx_ind: DevicePtr<i32>,
) -> Result<()> {
    let (m, n, ld) = check_dense_sizes(m, n, ld)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    let (nnz_name, ptr_name, ind_name) = match dir {
        Direction::Row => ("nnz_per_row", "csr_row_ptr", "csr_col_ind"),
        Direction::Column => ("nnz_per_col", "csc_col_ptr", "csc_row_ind"),
    };
    a.require("a")?;
    nnz_per.require(nnz_name)?;
    csx_val.require("val")?;
    csx_ptr.require(ptr_name)?;
    csx_ind.require(ind_name)?;
    descr.require_general()?;

    let outer = match dir {
        Direction::Row => m,
        Direction::Column => n,
    };
    a.require_len(dense_extent(m, n, ld), "a")?;
    nnz_per.require_len(outer, nnz_name)?;
    csx_ptr.require_len(outer + 1, ptr_name)?;

    let client = handle.client();
    let base = descr.base();
    // SAFETY: counts and offsets validated above
    unsafe { kernels::shift_counts::<R>(client, nnz_per, csx_ptr, outer, base)? };
    scan_in_place(handle, outer + 1, csx_ptr)?;

    let dense = DenseView { dir, m, n, a, ld };
    let csx = CsxView {
        ptr: csx_ptr,
        ind: csx_ind,
        val: csx_val,
        base,
    };
    // SAFETY: offsets were just built from the caller's counts; entry arrays
    // are bounds-checked on access
    unsafe { kernels::dense::dense2csx::<R, T>(client, dense, csx) }
}

/// Convert a dense matrix to CSR using per-row counts from [`nnz`]
///
/// Column indices within each row are ascending.
#[allow(clippy::too_many_arguments)]
pub fn dense2csr<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    a: DevicePtr<T>,
    ld: i32,
    nnz_per_row: DevicePtr<i32>,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!("dense2csr<{}>: m={m} n={n} ld={ld}", T::DTYPE);
    dense2csx(
        handle,
        Direction::Row,
        m,
        n,
        descr,
        a,
        ld,
        nnz_per_row,
        csr_val,
        csr_row_ptr,
        csr_col_ind,
    )
}

/// Convert a dense matrix to CSC using per-column counts from [`nnz`]
///
/// Row indices within each column are ascending.
#[allow(clippy::too_many_arguments)]
pub fn dense2csc<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    a: DevicePtr<T>,
    ld: i32,
    nnz_per_col: DevicePtr<i32>,
    csc_val: DevicePtr<T>,
    csc_col_ptr: DevicePtr<i32>,
    csc_row_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!("dense2csc<{}>: m={m} n={n} ld={ld}", T::DTYPE);
    dense2csx(
        handle,
        Direction::Column,
        m,
        n,
        descr,
        a,
        ld,
        nnz_per_col,
        csc_val,
        csc_col_ptr,
        csc_row_ind,
    )
}

#[allow(clippy::too_many_arguments)]
fn csx2dense<R: Runtime, T: Element>(
    handle: &Handle<R>,
    dir: Direction,
    m: i32,
    n: i32,
    descr: &MatDescr,
    csx_val: DevicePtr<T>,
    csx_ptr: DevicePtr<i32>,
    csx_ind: DevicePtr<i32>,
    a: DevicePtr<T>,
    ld: i32,
) -> Result<()> {
    let (m, n, ld) = check_dense_sizes(m, n, ld)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    let (ptr_name, ind_name) = match dir {
        Direction::Row => ("csr_row_ptr", "csr_col_ind"),
        Direction::Column => ("csc_col_ptr", "csc_row_ind"),
    };
    a.require("a")?;
    csx_ptr.require(ptr_name)?;
    csx_ind.require(ind_name)?;
    csx_val.require("val")?;
    descr.require_general()?;

    let outer = match dir {
        Direction::Row => m,
        Direction::Column => n,
    };
    a.require_len(dense_extent(m, n, ld), "a")?;
    csx_ptr.require_len(outer + 1, ptr_name)?;

    let client = handle.client();
    let dense = DenseView { dir, m, n, a, ld };
    let csx = CsxView {
        ptr: csx_ptr,
        ind: csx_ind,
        val: csx_val,
        base: descr.base(),
    };
    // SAFETY: a spans the matrix; entry arrays are addressed through the
    // validated offsets and bounds-checked on access
    unsafe {
        kernels::dense::zero_dense::<R, T>(client, m, n, a, ld)?;
        kernels::dense::csx2dense::<R, T>(client, csx, dense)
    }
}

/// Scatter a CSR matrix into a dense matrix
///
/// The `m` leading rows of every column are zeroed first; rows between `m`
/// and `ld` are left untouched.
#[allow(clippy::too_many_arguments)]
pub fn csr2dense<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
    a: DevicePtr<T>,
    ld: i32,
) -> Result<()> {
    log::trace!("csr2dense<{}>: m={m} n={n} ld={ld}", T::DTYPE);
    csx2dense(
        handle,
        Direction::Row,
        m,
        n,
        descr,
        csr_val,
        csr_row_ptr,
        csr_col_ind,
        a,
        ld,
    )
}

/// Scatter a CSC matrix into a dense matrix
#[allow(clippy::too_many_arguments)]
pub fn csc2dense<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    csc_val: DevicePtr<T>,
    csc_col_ptr: DevicePtr<i32>,
    csc_row_ind: DevicePtr<i32>,
    a: DevicePtr<T>,
    ld: i32,
) -> Result<()> {
    log::trace!("csc2dense<{}>: m={m} n={n} ld={ld}", T::DTYPE);
    csx2dense(
        handle,
        Direction::Column,
        m,
        n,
        descr,
        csc_val,
        csc_col_ptr,
        csc_row_ind,
        a,
        ld,
    )
}
