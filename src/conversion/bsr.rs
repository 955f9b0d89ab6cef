//! CSR <-> BSR conversion

use crate::descr::{Direction, MatDescr, ResultSink};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::kernels::{self, CsxView};
use crate::primitives::{scan_in_place, write_scalar, write_total};
use crate::runtime::{DevicePtr, Runtime};

/// Size checks shared by both phases; returns `(m, n, block_dim)`
fn check_sizes(m: i32, n: i32, block_dim: i32) -> Result<(usize, usize, usize)> {
    let m = Error::check_size("m", m)?;
    let n = Error::check_size("n", n)?;
    if block_dim <= 0 {
        return Err(Error::invalid_size("block_dim", block_dim));
    }
    Ok((m, n, block_dim as usize))
}

/// Count the nonzero blocks of a CSR matrix and build the BSR row pointer
///
/// The `m x n` matrix is partitioned into `ceil(m / block_dim)` block rows;
/// `bsr_row_ptr` (`mb + 1` entries) receives the offsets of the distinct
/// block columns touched by each block row, and `bsr_nnz` the total block
/// count `nnzb`.
#[allow(clippy::too_many_arguments)]
pub fn csr2bsr_nnz<R: Runtime>(
    handle: &Handle<R>,
    dir: Direction,
    m: i32,
    n: i32,
    csr_descr: &MatDescr,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
    block_dim: i32,
    bsr_descr: &MatDescr,
    bsr_row_ptr: DevicePtr<i32>,
    bsr_nnz: ResultSink<'_>,
) -> Result<()> {
    log::trace!("csr2bsr_nnz: dir={dir:?} m={m} n={n} block_dim={block_dim}");
    let (m, n, block_dim) = check_sizes(m, n, block_dim)?;
    if m == 0 || n == 0 {
        return write_scalar(handle, bsr_nnz, 0);
    }

    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    bsr_row_ptr.require("bsr_row_ptr")?;
    bsr_nnz.require("bsr_nnz")?;
    csr_descr.require_general()?;
    bsr_descr.require_general()?;

    let mb = m.div_ceil(block_dim);
    csr_row_ptr.require_len(m + 1, "csr_row_ptr")?;
    bsr_row_ptr.require_len(mb + 1, "bsr_row_ptr")?;
    let client = handle.client();

    if block_dim == 1 {
        // SAFETY: both row pointers hold m + 1 elements
        unsafe {
            kernels::bsr::rebase_ptr::<R>(
                client,
                m + 1,
                csr_row_ptr,
                csr_descr.base(),
                bsr_row_ptr,
                bsr_descr.base(),
            )?
        };
        return write_total(handle, bsr_row_ptr, mb, bsr_descr.base(), bsr_nnz);
    }

    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: DevicePtr::<()>::null(),
        base: csr_descr.base(),
    };
    // SAFETY: row pointers validated above; column indices are addressed
    // through the row pointer
    unsafe {
        kernels::bsr::csr2bsr_count::<R>(client, m, block_dim, csr, bsr_descr.base(), bsr_row_ptr)?
    };
    scan_in_place(handle, mb + 1, bsr_row_ptr)?;
    write_total(handle, bsr_row_ptr, mb, bsr_descr.base(), bsr_nnz)
}

/// Fill the block columns and block values of a BSR matrix
///
/// `bsr_row_ptr` must be the array produced by [`csr2bsr_nnz`] for the same
/// input; `bsr_col_ind` and `bsr_val` must hold `nnzb` and
/// `nnzb * block_dim^2` elements. Block cells without a source entry are
/// zero. Within a block row, block columns are ascending. `dir` selects the
/// layout of values inside each block.
#[allow(clippy::too_many_arguments)]
pub fn csr2bsr<R: Runtime, T: Element>(
    handle: &Handle<R>,
    dir: Direction,
    m: i32,
    n: i32,
    csr_descr: &MatDescr,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
    block_dim: i32,
    bsr_descr: &MatDescr,
    bsr_val: DevicePtr<T>,
    bsr_row_ptr: DevicePtr<i32>,
    bsr_col_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!(
        "csr2bsr<{}>: dir={dir:?} m={m} n={n} block_dim={block_dim}",
        T::DTYPE
    );
    let (m, n, block_dim) = check_sizes(m, n, block_dim)?;
    if m == 0 || n == 0 {
        return Ok(());
    }

    csr_val.require("csr_val")?;
    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    bsr_val.require("bsr_val")?;
    bsr_row_ptr.require("bsr_row_ptr")?;
    bsr_col_ind.require("bsr_col_ind")?;
    csr_descr.require_general()?;
    bsr_descr.require_general()?;

    let mb = m.div_ceil(block_dim);
    csr_row_ptr.require_len(m + 1, "csr_row_ptr")?;
    bsr_row_ptr.require_len(mb + 1, "bsr_row_ptr")?;

    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: csr_val,
        base: csr_descr.base(),
    };
    let bsr = CsxView {
        ptr: bsr_row_ptr,
        ind: bsr_col_ind,
        val: bsr_val,
        base: bsr_descr.base(),
    };
    let client = handle.client();
    // SAFETY: row pointers validated above; entry arrays are addressed
    // through them and bounds-checked on access
    unsafe {
        if block_dim == 1 {
            kernels::bsr::csr2bsr_unit_fill::<R, T>(client, m, csr, bsr)
        } else {
            kernels::bsr::csr2bsr_fill::<R, T>(client, dir, m, block_dim, csr, bsr)
        }
    }
}

/// Expand a BSR matrix into CSR
///
/// The result has `mb * block_dim` rows and `nnzb * block_dim^2` entries:
/// every block contributes all of its cells, explicit zeros included. Rows
/// list the blocks of their block row in stored order.
#[allow(clippy::too_many_arguments)]
pub fn bsr2csr<R: Runtime, T: Element>(
    handle: &Handle<R>,
    dir: Direction,
    mb: i32,
    nb: i32,
    bsr_descr: &MatDescr,
    bsr_val: DevicePtr<T>,
    bsr_row_ptr: DevicePtr<i32>,
    bsr_col_ind: DevicePtr<i32>,
    block_dim: i32,
    csr_descr: &MatDescr,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!(
        "bsr2csr<{}>: dir={dir:?} mb={mb} nb={nb} block_dim={block_dim}",
        T::DTYPE
    );
    let mb = Error::check_size("mb", mb)?;
    let nb = Error::check_size("nb", nb)?;
    if block_dim <= 0 {
        return Err(Error::invalid_size("block_dim", block_dim));
    }
    let block_dim = block_dim as usize;
    if mb == 0 || nb == 0 {
        return Ok(());
    }

    bsr_val.require("bsr_val")?;
    bsr_row_ptr.require("bsr_row_ptr")?;
    bsr_col_ind.require("bsr_col_ind")?;
    csr_val.require("csr_val")?;
    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    bsr_descr.require_general()?;
    csr_descr.require_general()?;

    bsr_row_ptr.require_len(mb + 1, "bsr_row_ptr")?;
    csr_row_ptr.require_len(mb * block_dim + 1, "csr_row_ptr")?;

    let bsr = CsxView {
        ptr: bsr_row_ptr,
        ind: bsr_col_ind,
        val: bsr_val,
        base: bsr_descr.base(),
    };
    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: csr_val,
        base: csr_descr.base(),
    };
    // SAFETY: row pointers validated above; entry arrays are addressed
    // through them and bounds-checked on access
    unsafe { kernels::bsr::bsr2csr::<R, T>(handle.client(), dir, mb, block_dim, bsr, csr) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descr::IndexBase;
    use crate::runtime::DeviceBuffer;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    type Buf<T> = DeviceBuffer<CpuRuntime, T>;

    fn handle() -> Handle<CpuRuntime> {
        Handle::new(CpuRuntime::default_client(&CpuDevice::new())).unwrap()
    }

    #[test]
    fn test_csr2bsr_2x2_blocks() {
        // [1 0 2]
        // [0 3 0]
        // [4 0 5]
        let handle = handle();
        let client = handle.client();
        let descr = MatDescr::default();
        let row_ptr = Buf::from_slice(client, &[0, 2, 3, 5]).unwrap();
        let col_ind = Buf::from_slice(client, &[0, 2, 1, 0, 2]).unwrap();
        let val = Buf::from_slice(client, &[1.0f64, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let bsr_row_ptr = Buf::<i32>::zeros(client, 3).unwrap();

        let mut nnzb = 0;
        csr2bsr_nnz(
            &handle,
            Direction::Row,
            3,
            3,
            &descr,
            row_ptr.ptr(),
            col_ind.ptr(),
            2,
            &descr,
            bsr_row_ptr.ptr(),
            ResultSink::Host(&mut nnzb),
        )
        .unwrap();
        assert_eq!(nnzb, 4);
        assert_eq!(bsr_row_ptr.to_vec().unwrap(), vec![0, 2, 4]);

        let bsr_col = Buf::<i32>::zeros(client, 4).unwrap();
        let bsr_val = Buf::<f64>::zeros(client, 16).unwrap();
        csr2bsr(
            &handle,
            Direction::Row,
            3,
            3,
            &descr,
            val.ptr(),
            row_ptr.ptr(),
            col_ind.ptr(),
            2,
            &descr,
            bsr_val.ptr(),
            bsr_row_ptr.ptr(),
            bsr_col.ptr(),
        )
        .unwrap();
        assert_eq!(bsr_col.to_vec().unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(
            bsr_val.to_vec().unwrap(),
            vec![
                1.0, 0.0, 0.0, 3.0, // block (0, 0)
                2.0, 0.0, 0.0, 0.0, // block (0, 1)
                4.0, 0.0, 0.0, 0.0, // block (1, 0)
                5.0, 0.0, 0.0, 0.0, // block (1, 1)
            ]
        );
    }

    #[test]
    fn test_bsr2csr_column_layout() {
        let handle = handle();
        let client = handle.client();
        let bsr_descr = MatDescr::new(IndexBase::One);
        let csr_descr = MatDescr::default();
        // One 2x2 block [[1, 2], [3, 4]] stored column-major
        let bsr_row_ptr = Buf::from_slice(client, &[1, 2]).unwrap();
        let bsr_col = Buf::from_slice(client, &[1]).unwrap();
        let bsr_val = Buf::from_slice(client, &[1.0f32, 3.0, 2.0, 4.0]).unwrap();

        let csr_row_ptr = Buf::<i32>::zeros(client, 3).unwrap();
        let csr_col = Buf::<i32>::zeros(client, 4).unwrap();
        let csr_val = Buf::<f32>::zeros(client, 4).unwrap();
        bsr2csr(
            &handle,
            Direction::Column,
            1,
            1,
            &bsr_descr,
            bsr_val.ptr(),
            bsr_row_ptr.ptr(),
            bsr_col.ptr(),
            2,
            &csr_descr,
            csr_val.ptr(),
            csr_row_ptr.ptr(),
            csr_col.ptr(),
        )
        .unwrap();
        assert_eq!(csr_row_ptr.to_vec().unwrap(), vec![0, 2, 4]);
        assert_eq!(csr_col.to_vec().unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(csr_val.to_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_block_dim_is_size_error() {
        let handle = handle();
        let descr = MatDescr::default();
        let mut nnzb = -1;
        let err = csr2bsr_nnz(
            &handle,
            Direction::Row,
            4,
            4,
            &descr,
            DevicePtr::null(),
            DevicePtr::null(),
            0,
            &descr,
            DevicePtr::null(),
            ResultSink::Host(&mut nnzb),
        )
        .unwrap_err();
        assert_eq!(err, Error::invalid_size("block_dim", 0));
    }
}
