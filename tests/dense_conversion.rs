//! Integration tests for dense <-> CSR/CSC and CSR -> CSC conversion

mod common;

use common::*;
use spmx::conversion::{csc2dense, csr2csc, csr2dense, dense2csc, dense2csr, nnz};
use spmx::descr::{Action, Direction, IndexBase, MatDescr, ResultSink};
use spmx::dtype::Complex128;
use spmx::reference::{self, HostCsr};
use spmx::runtime::DevicePtr;

#[test]
fn test_dense_count_and_fill_rows() {
    let handle = create_handle();
    let mut rng = seeded(21);
    for &(m, n, ld) in &[(1, 1, 1), (13, 7, 13), (40, 65, 47)] {
        let csr = random_csr(&mut rng, m, n, 0.3, 0, false);
        let mut host_dense = vec![0.0; ld * n];
        csr.write_dense(&mut host_dense, ld);
        let a = upload(&handle, &host_dense);
        let descr = MatDescr::new(IndexBase::One);

        let per_row = zeros::<i32>(&handle, m);
        let mut total = 0;
        nnz(
            &handle,
            Direction::Row,
            m as i32,
            n as i32,
            &descr,
            a.ptr(),
            ld as i32,
            per_row.ptr(),
            ResultSink::Host(&mut total),
        )
        .unwrap();
        let expected_counts = reference::dense_nnz(Direction::Row, m, n, &host_dense, ld);
        assert_eq!(per_row.to_vec().unwrap(), expected_counts);
        assert_eq!(total as usize, csr.nnz());

        let row_ptr = zeros::<i32>(&handle, m + 1);
        let col_ind = zeros::<i32>(&handle, total as usize);
        let val = zeros::<f64>(&handle, total as usize);
        dense2csr(
            &handle,
            m as i32,
            n as i32,
            &descr,
            a.ptr(),
            ld as i32,
            per_row.ptr(),
            val.ptr(),
            row_ptr.ptr(),
            col_ind.ptr(),
        )
        .unwrap();
        let expected = csr.rebase(1);
        assert_eq!(row_ptr.to_vec().unwrap(), expected.row_ptr);
        assert_eq!(col_ind.to_vec().unwrap(), expected.col_ind);
        assert_eq!(val.to_vec().unwrap(), expected.val);
    }
}

#[test]
fn test_dense2csc_matches_transpose() {
    let handle = create_handle();
    let csr = random_csr(&mut seeded(5), 24, 31, 0.25, 0, false);
    let host_dense = csr.to_dense();
    let a = upload(&handle, &host_dense);
    let descr = MatDescr::default();

    let per_col = zeros::<i32>(&handle, 31);
    let total = zeros::<i32>(&handle, 1);
    nnz(
        &handle,
        Direction::Column,
        24,
        31,
        &descr,
        a.ptr(),
        24,
        per_col.ptr(),
        ResultSink::Device(total.ptr()),
    )
    .unwrap();
    let total = total.to_vec().unwrap()[0] as usize;
    assert_eq!(total, csr.nnz());

    let col_ptr = zeros::<i32>(&handle, 32);
    let row_ind = zeros::<i32>(&handle, total);
    let val = zeros::<f64>(&handle, total);
    dense2csc(
        &handle,
        24,
        31,
        &descr,
        a.ptr(),
        24,
        per_col.ptr(),
        val.ptr(),
        col_ptr.ptr(),
        row_ind.ptr(),
    )
    .unwrap();
    let expected = csr.transpose(0);
    assert_eq!(col_ptr.to_vec().unwrap(), expected.row_ptr);
    assert_eq!(row_ind.to_vec().unwrap(), expected.col_ind);
    assert_eq!(val.to_vec().unwrap(), expected.val);
}

#[test]
fn test_csr2dense_leaves_padding_rows() {
    let handle = create_handle();
    let csr = HostCsr::new(2, 3, 1, vec![1, 3, 4], vec![1, 3, 2], vec![1.0, 2.0, 3.0]).unwrap();
    let d = upload_csr(&handle, &csr);
    // ld = 3: the third row of every column is padding and must survive
    let a = upload(&handle, &[9.0f64; 9]);
    csr2dense(
        &handle,
        2,
        3,
        &MatDescr::new(IndexBase::One),
        d.val.ptr(),
        d.row_ptr.ptr(),
        d.col_ind.ptr(),
        a.ptr(),
        3,
    )
    .unwrap();
    assert_eq!(
        a.to_vec().unwrap(),
        vec![1.0, 0.0, 9.0, 0.0, 3.0, 9.0, 2.0, 0.0, 9.0]
    );
}

#[test]
fn test_csc2dense_complex() {
    let handle = create_handle();
    // [ (1,1)   0    ]
    // [   0   (0,-2) ]
    // [ (3,0)   0    ]
    let col_ptr = upload(&handle, &[0, 2, 3]);
    let row_ind = upload(&handle, &[0, 2, 1]);
    let val = upload(
        &handle,
        &[
            Complex128::new(1.0, 1.0),
            Complex128::new(3.0, 0.0),
            Complex128::new(0.0, -2.0),
        ],
    );
    let a = zeros::<Complex128>(&handle, 6);
    csc2dense(
        &handle,
        3,
        2,
        &MatDescr::default(),
        val.ptr(),
        col_ptr.ptr(),
        row_ind.ptr(),
        a.ptr(),
        3,
    )
    .unwrap();
    let dense = a.to_vec().unwrap();
    assert_eq!(dense[0], Complex128::new(1.0, 1.0));
    assert_eq!(dense[2], Complex128::new(3.0, 0.0));
    assert_eq!(dense[4], Complex128::new(0.0, -2.0));
    assert_eq!(dense[1], Complex128::new(0.0, 0.0));
}

#[test]
fn test_csr2csc_matches_reference() {
    let handle = create_handle();
    let mut rng = seeded(99);
    for &(m, n, base) in &[(1, 50, 0), (60, 45, 1), (500, 300, 0)] {
        let csr = random_csr(&mut rng, m, n, 0.05, base, false);
        let d = upload_csr(&handle, &csr);
        let nnz = csr.nnz();
        let csc_val = zeros::<f64>(&handle, nnz);
        let csc_row_ind = zeros::<i32>(&handle, nnz);
        let csc_col_ptr = zeros::<i32>(&handle, n + 1);
        csr2csc(
            &handle,
            m as i32,
            n as i32,
            nnz as i32,
            d.val.ptr(),
            d.row_ptr.ptr(),
            d.col_ind.ptr(),
            csc_val.ptr(),
            csc_row_ind.ptr(),
            csc_col_ptr.ptr(),
            Action::Numeric,
            if base == 0 { IndexBase::Zero } else { IndexBase::One },
        )
        .unwrap();

        let expected = csr.transpose(base);
        assert_eq!(csc_col_ptr.to_vec().unwrap(), expected.row_ptr);
        assert_eq!(csc_row_ind.to_vec().unwrap(), expected.col_ind);
        assert_eq!(csc_val.to_vec().unwrap(), expected.val);
    }
}

#[test]
fn test_csr2csc_symbolic_ignores_values() {
    let handle = create_handle();
    let csr = random_csr(&mut seeded(4), 20, 20, 0.2, 0, false);
    let d = upload_csr(&handle, &csr);
    let nnz = csr.nnz();
    let csc_row_ind = zeros::<i32>(&handle, nnz);
    let csc_col_ptr = zeros::<i32>(&handle, 21);
    csr2csc::<_, f64>(
        &handle,
        20,
        20,
        nnz as i32,
        DevicePtr::null(),
        d.row_ptr.ptr(),
        d.col_ind.ptr(),
        DevicePtr::null(),
        csc_row_ind.ptr(),
        csc_col_ptr.ptr(),
        Action::Symbolic,
        IndexBase::Zero,
    )
    .unwrap();
    let expected = csr.transpose(0);
    assert_eq!(csc_col_ptr.to_vec().unwrap(), expected.row_ptr);
    assert_eq!(csc_row_ind.to_vec().unwrap(), expected.col_ind);
}
