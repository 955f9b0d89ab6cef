//! Integration tests for argument validation order, quick returns and
//! device failures

mod common;

use common::*;
use spmx::conversion::{csr2bsr, csr2bsr_nnz, csr2dense, nnz, nnz_compress};
use spmx::descr::{Direction, IndexBase, MatDescr, MatrixType, ResultSink};
use spmx::error::Error;
use spmx::geam::csrgeam_nnz;
use spmx::handle::HandleConfig;
use spmx::runtime::cpu::CpuRuntime;
use spmx::runtime::{Allocator, DevicePtr, RuntimeClient};

#[test]
fn test_size_checked_before_pointers() {
    let handle = create_handle();
    let mut out = 0;
    let err = csr2bsr_nnz::<CpuRuntime>(
        &handle,
        Direction::Row,
        -1,
        4,
        &MatDescr::default(),
        DevicePtr::null(),
        DevicePtr::null(),
        2,
        &MatDescr::default(),
        DevicePtr::null(),
        ResultSink::Host(&mut out),
    )
    .unwrap_err();
    assert_eq!(err, Error::invalid_size("m", -1));

    let err = csr2bsr_nnz::<CpuRuntime>(
        &handle,
        Direction::Row,
        4,
        4,
        &MatDescr::default(),
        DevicePtr::null(),
        DevicePtr::null(),
        0,
        &MatDescr::default(),
        DevicePtr::null(),
        ResultSink::Host(&mut out),
    )
    .unwrap_err();
    assert_eq!(err, Error::invalid_size("block_dim", 0));
}

#[test]
fn test_zero_sized_problems_accept_null_pointers() {
    let handle = create_handle();
    let descr = MatDescr::default();

    let mut out = 17;
    csr2bsr_nnz::<CpuRuntime>(
        &handle,
        Direction::Row,
        0,
        4,
        &descr,
        DevicePtr::null(),
        DevicePtr::null(),
        2,
        &descr,
        DevicePtr::null(),
        ResultSink::Host(&mut out),
    )
    .unwrap();
    assert_eq!(out, 0);

    csr2bsr::<CpuRuntime, f64>(
        &handle,
        Direction::Row,
        3,
        0,
        &descr,
        DevicePtr::null(),
        DevicePtr::null(),
        DevicePtr::null(),
        2,
        &descr,
        DevicePtr::null(),
        DevicePtr::null(),
        DevicePtr::null(),
    )
    .unwrap();

    // A null device sink is tolerated for an empty problem
    nnz_compress::<CpuRuntime, f64>(
        &handle,
        0,
        &descr,
        DevicePtr::null(),
        DevicePtr::null(),
        DevicePtr::null(),
        ResultSink::Device(DevicePtr::null()),
        0.0,
    )
    .unwrap();

    let mut out = 5;
    csrgeam_nnz::<CpuRuntime>(
        &handle,
        0,
        0,
        &descr,
        0,
        DevicePtr::null(),
        DevicePtr::null(),
        &descr,
        0,
        DevicePtr::null(),
        DevicePtr::null(),
        &descr,
        DevicePtr::null(),
        ResultSink::Host(&mut out),
    )
    .unwrap();
    assert_eq!(out, 0);
}

#[test]
fn test_pointer_checked_before_descriptor() {
    let handle = create_handle();
    let symmetric = MatDescr::new(IndexBase::Zero).with_matrix_type(MatrixType::Symmetric);
    let row_ptr = upload(&handle, &[0, 1, 2]);
    let col_ind = upload(&handle, &[0, 1]);
    let mut out = 0;

    let err = csr2bsr_nnz::<CpuRuntime>(
        &handle,
        Direction::Row,
        2,
        2,
        &symmetric,
        row_ptr.ptr(),
        DevicePtr::null(),
        2,
        &MatDescr::default(),
        zeros::<i32>(&handle, 2).ptr(),
        ResultSink::Host(&mut out),
    )
    .unwrap_err();
    assert_eq!(err, Error::invalid_pointer("csr_col_ind"));

    let bsr_row_ptr = zeros::<i32>(&handle, 2);
    let err = csr2bsr_nnz::<CpuRuntime>(
        &handle,
        Direction::Row,
        2,
        2,
        &symmetric,
        row_ptr.ptr(),
        col_ind.ptr(),
        2,
        &MatDescr::default(),
        bsr_row_ptr.ptr(),
        ResultSink::Host(&mut out),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NotImplemented { .. }));
}

#[test]
fn test_leading_dimension_too_small() {
    let handle = create_handle();
    let a = zeros::<f64>(&handle, 16);
    let per_row = zeros::<i32>(&handle, 4);
    let mut total = 0;
    let err = nnz(
        &handle,
        Direction::Row,
        4,
        4,
        &MatDescr::default(),
        a.ptr(),
        3,
        per_row.ptr(),
        ResultSink::Host(&mut total),
    )
    .unwrap_err();
    assert_eq!(err, Error::invalid_size("ld", 3));
}

#[test]
fn test_out_of_range_index_is_runtime_error() {
    let handle = create_handle();
    // Column 7 of a 2x2 matrix writes outside the dense array
    let row_ptr = upload(&handle, &[0, 1, 2]);
    let col_ind = upload(&handle, &[0, 7]);
    let val = upload(&handle, &[1.0f64, 2.0]);
    let a = zeros::<f64>(&handle, 4);
    let err = csr2dense(
        &handle,
        2,
        2,
        &MatDescr::default(),
        val.ptr(),
        row_ptr.ptr(),
        col_ind.ptr(),
        a.ptr(),
        2,
    )
    .unwrap_err();
    assert!(err.is_runtime(), "unexpected error {err:?}");
}

#[test]
fn test_temporaries_released_without_arena() {
    let handle = create_handle_with(HandleConfig::new().with_scratch_bytes(0));
    let csr = random_csr(&mut seeded(50), 100, 100, 0.1, 0, false);
    let d = upload_csr(&handle, &csr);
    let per_row = zeros::<i32>(&handle, 100);
    let before = handle.client().allocator().allocated_bytes();

    let mut nnz_c = 0;
    nnz_compress(
        &handle,
        100,
        &MatDescr::default(),
        d.val.ptr(),
        d.row_ptr.ptr(),
        per_row.ptr(),
        ResultSink::Host(&mut nnz_c),
        0.0,
    )
    .unwrap();
    assert_eq!(nnz_c as usize, csr.nnz());
    assert_eq!(handle.client().allocator().allocated_bytes(), before);
}
