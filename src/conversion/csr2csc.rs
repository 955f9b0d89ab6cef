//! CSR -> CSC conversion (transpose of the storage layout)

use crate::descr::{Action, IndexBase};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::{Handle, align_up};
use crate::kernels::{self, CsxView};
use crate::runtime::{DevicePtr, Runtime};

/// Convert a CSR matrix to CSC
///
/// `csc_col_ptr` receives `n + 1` offsets and `csc_row_ind` the row of every
/// entry; rows within a column are ascending, entries of equal row keep their
/// CSR order. With [`Action::Symbolic`] values are not touched and both value
/// pointers may be null. Input and output share `idx_base`.
#[allow(clippy::too_many_arguments)]
pub fn csr2csc<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    nnz: i32,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
    csc_val: DevicePtr<T>,
    csc_row_ind: DevicePtr<i32>,
    csc_col_ptr: DevicePtr<i32>,
    action: Action,
    idx_base: IndexBase,
) -> Result<()> {
    log::trace!(
        "csr2csc<{}>: m={m} n={n} nnz={nnz} action={action:?} base={idx_base:?}",
        T::DTYPE
    );
    let m = Error::check_size("m", m)?;
    let n = Error::check_size("n", n)?;
    let nnz = Error::check_size("nnz", nnz)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    csc_row_ind.require("csc_row_ind")?;
    csc_col_ptr.require("csc_col_ptr")?;
    let values = match action {
        Action::Numeric => Some((csr_val.require("csr_val")?, csc_val.require("csc_val")?)),
        Action::Symbolic => None,
    };

    csr_row_ptr.require_len(m + 1, "csr_row_ptr")?;
    csr_col_ind.require_len(nnz, "csr_col_ind")?;
    csc_row_ind.require_len(nnz, "csc_row_ind")?;
    csc_col_ptr.require_len(n + 1, "csc_col_ptr")?;
    if let Some((src, dst)) = values {
        src.require_len(nnz, "csr_val")?;
        dst.require_len(nnz, "csc_val")?;
    }

    let client = handle.client();
    let base = idx_base.offset();

    // rows | perm | sorted columns
    let stride = align_up(nnz * size_of::<i32>());
    let lease = handle.scratch(3 * stride)?;
    let rows = lease.view::<i32>(0, nnz);
    let perm = lease.view::<i32>(stride, nnz);
    let sorted = lease.view::<i32>(2 * stride, nnz);

    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: csr_val,
        base,
    };
    // SAFETY: every array was length-checked against m, n and nnz above;
    // scratch views lie inside the lease
    unsafe {
        kernels::csr2csc::csr2coo::<R, T>(client, m, csr, rows)?;
        kernels::csr2csc::sort_by_column::<R>(client, nnz, csr_col_ind, perm, sorted)?;
        kernels::csr2csc::permute::<R, T>(client, nnz, perm, rows, csc_row_ind, values)?;
        kernels::csr2csc::col_ptr_from_sorted::<R>(client, n, nnz, base, sorted, csc_col_ptr)
    }
}
