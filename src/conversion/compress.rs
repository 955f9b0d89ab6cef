//! Tolerance compression of CSR matrices
//!
//! Entries whose magnitude is at most `tol` are dropped. [`nnz_compress`]
//! counts the survivors of every row; [`csr2csr_compress`] builds the
//! compressed matrix from those counts.

use crate::descr::{MatDescr, ResultSink};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::kernels::compress::select_segment_width;
use crate::kernels::{self, CsxView};
use crate::primitives::{read_total, scan_in_place, sum_into_sink, write_scalar};
use crate::runtime::{DevicePtr, Runtime};

fn check_tol<T: Element>(tol: T) -> Result<f64> {
    let tol = tol.real();
    if tol < 0.0 {
        return Err(Error::invalid_value("tol", format!("{tol} is negative")));
    }
    Ok(tol)
}

/// Count the entries of every row whose magnitude exceeds `tol`
///
/// `nnz_per_row` receives `m` counts and `nnz_c` their sum. For complex
/// types only the real part of `tol` is used.
#[allow(clippy::too_many_arguments)]
pub fn nnz_compress<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    descr: &MatDescr,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    nnz_per_row: DevicePtr<i32>,
    nnz_c: ResultSink<'_>,
    tol: T,
) -> Result<()> {
    log::trace!("nnz_compress<{}>: m={m} tol={}", T::DTYPE, tol.real());
    let m_ = Error::check_size("m", m)?;
    let tol = check_tol(tol)?;
    if m == 0 {
        return write_scalar(handle, nnz_c, 0);
    }

    csr_val.require("csr_val")?;
    csr_row_ptr.require("csr_row_ptr")?;
    nnz_per_row.require("nnz_per_row")?;
    nnz_c.require("nnz_c")?;
    descr.require_general()?;
    csr_row_ptr.require_len(m_ + 1, "csr_row_ptr")?;
    nnz_per_row.require_len(m_, "nnz_per_row")?;

    let base = descr.base();
    let nnz_a = read_total(handle, csr_row_ptr, m_, base)?;
    let segment_width = select_segment_width(nnz_a / m, handle.wavefront_size());
    log::debug!(
        "nnz_compress: mean {} entries/row, segment width {segment_width}",
        nnz_a / m
    );

    // SAFETY: row pointer and counts validated above; values are
    // bounds-checked on access
    unsafe {
        kernels::compress::nnz_compress::<R, T>(
            handle.client(),
            segment_width,
            m_,
            base,
            csr_val,
            csr_row_ptr,
            nnz_per_row,
            tol,
        )?
    };
    sum_into_sink(handle, m_, nnz_per_row, nnz_c)
}

/// Drop the entries of magnitude at most `tol` from a CSR matrix
///
/// `nnz_per_row` must come from [`nnz_compress`] with the same `tol`;
/// `csr_row_ptr_c` receives `m + 1` offsets and the C entry arrays must hold
/// the reported total. Surviving entries keep their order within a row.
#[allow(clippy::too_many_arguments)]
pub fn csr2csr_compress<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    csr_val_a: DevicePtr<T>,
    csr_row_ptr_a: DevicePtr<i32>,
    csr_col_ind_a: DevicePtr<i32>,
    nnz_a: i32,
    nnz_per_row: DevicePtr<i32>,
    csr_val_c: DevicePtr<T>,
    csr_row_ptr_c: DevicePtr<i32>,
    csr_col_ind_c: DevicePtr<i32>,
    tol: T,
) -> Result<()> {
    log::trace!(
        "csr2csr_compress<{}>: m={m} n={n} nnz_a={nnz_a} tol={}",
        T::DTYPE,
        tol.real()
    );
    let m_ = Error::check_size("m", m)?;
    Error::check_size("n", n)?;
    let nnz_a_ = Error::check_size("nnz_a", nnz_a)?;
    let tol = check_tol(tol)?;
    let base = descr.base();
    let client = handle.client();
    if m == 0 || n == 0 {
        return Ok(());
    }
    if nnz_a == 0 {
        // Nothing survives; C is an empty matrix with the same shape
        csr_row_ptr_c.require("csr_row_ptr_c")?;
        descr.require_general()?;
        csr_row_ptr_c.require_len(m_ + 1, "csr_row_ptr_c")?;
        // SAFETY: length checked above
        return unsafe { kernels::fill::<R, i32>(client, csr_row_ptr_c, m_ + 1, base) };
    }

    csr_val_a.require("csr_val_a")?;
    csr_row_ptr_a.require("csr_row_ptr_a")?;
    csr_col_ind_a.require("csr_col_ind_a")?;
    nnz_per_row.require("nnz_per_row")?;
    csr_val_c.require("csr_val_c")?;
    csr_row_ptr_c.require("csr_row_ptr_c")?;
    csr_col_ind_c.require("csr_col_ind_c")?;
    descr.require_general()?;

    csr_row_ptr_a.require_len(m_ + 1, "csr_row_ptr_a")?;
    csr_col_ind_a.require_len(nnz_a_, "csr_col_ind_a")?;
    csr_val_a.require_len(nnz_a_, "csr_val_a")?;
    nnz_per_row.require_len(m_, "nnz_per_row")?;
    csr_row_ptr_c.require_len(m_ + 1, "csr_row_ptr_c")?;

    // SAFETY: counts and offsets validated above
    unsafe { kernels::shift_counts::<R>(client, nnz_per_row, csr_row_ptr_c, m_, base)? };
    scan_in_place(handle, m_ + 1, csr_row_ptr_c)?;

    let a = CsxView {
        ptr: csr_row_ptr_a,
        ind: csr_col_ind_a,
        val: csr_val_a,
        base,
    };
    let c = CsxView {
        ptr: csr_row_ptr_c,
        ind: csr_col_ind_c,
        val: csr_val_c,
        base,
    };
    // SAFETY: C offsets were built from the caller's counts; C entry arrays
    // are bounds-checked on access
    unsafe { kernels::compress::compress_fill::<R, T>(client, m_, a, c, tol) }
}
