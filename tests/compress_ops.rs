//! Integration tests for tolerance compression

mod common;

use common::*;
use spmx::conversion::{csr2csr_compress, nnz_compress};
use spmx::descr::{IndexBase, MatDescr, ResultSink};
use spmx::dtype::Complex64;
use spmx::handle::{Handle, HandleConfig};
use spmx::reference::{self, HostCsr};
use spmx::runtime::cpu::CpuRuntime;

/// Both phases through `handle`, with a host or device count
fn compress(
    handle: &Handle<CpuRuntime>,
    csr: &HostCsr<f64>,
    tol: f64,
    device_sink: bool,
) -> (Vec<i32>, HostCsr<f64>) {
    let descr = MatDescr::new(if csr.base == 0 { IndexBase::Zero } else { IndexBase::One });
    let d = upload_csr(handle, csr);
    let per_row = zeros::<i32>(handle, csr.m);
    let nnz_c = if device_sink {
        let out = zeros::<i32>(handle, 1);
        nnz_compress(
            handle,
            csr.m as i32,
            &descr,
            d.val.ptr(),
            d.row_ptr.ptr(),
            per_row.ptr(),
            ResultSink::Device(out.ptr()),
            tol,
        )
        .unwrap();
        handle.synchronize().unwrap();
        out.to_vec().unwrap()[0]
    } else {
        let mut out = 0;
        nnz_compress(
            handle,
            csr.m as i32,
            &descr,
            d.val.ptr(),
            d.row_ptr.ptr(),
            per_row.ptr(),
            ResultSink::Host(&mut out),
            tol,
        )
        .unwrap();
        out
    };

    let nnz_c = nnz_c as usize;
    let row_ptr = zeros::<i32>(handle, csr.m + 1);
    let col_ind = zeros::<i32>(handle, nnz_c);
    let val = zeros::<f64>(handle, nnz_c);
    csr2csr_compress(
        handle,
        csr.m as i32,
        csr.n as i32,
        &descr,
        d.val.ptr(),
        d.row_ptr.ptr(),
        d.col_ind.ptr(),
        csr.nnz() as i32,
        per_row.ptr(),
        val.ptr(),
        row_ptr.ptr(),
        col_ind.ptr(),
        tol,
    )
    .unwrap();

    let c = HostCsr::new(
        csr.m,
        csr.n,
        csr.base,
        row_ptr.to_vec().unwrap(),
        col_ind.to_vec().unwrap(),
        val.to_vec().unwrap(),
    )
    .unwrap();
    (per_row.to_vec().unwrap(), c)
}

#[test]
fn test_zero_tolerance_drops_explicit_zeros() {
    let handle = create_handle();
    let csr = random_csr(&mut seeded(31), 80, 70, 0.2, 0, true);
    assert!(csr.val.iter().any(|&v| v == 0.0));

    let (per_row, c) = compress(&handle, &csr, 0.0, false);
    assert_eq!(per_row, reference::nnz_compress(&csr, 0.0));
    assert_eq!(c, reference::compress(&csr, 0.0));
    assert!(c.val.iter().all(|&v| v != 0.0));
    assert_eq!(c.nnz(), csr.val.iter().filter(|&&v| v != 0.0).count());
}

#[test]
fn test_compression_is_idempotent() {
    let handle = create_handle();
    let csr = random_csr(&mut seeded(32), 50, 50, 0.3, 1, true);
    let (_, once) = compress(&handle, &csr, 0.0, false);
    let (_, twice) = compress(&handle, &once, 0.0, false);
    assert_eq!(once, twice);
}

#[test]
fn test_segment_widths_agree() {
    // Row densities spanning every segment bucket, on both wavefront widths
    let mut rng = seeded(33);
    for density in [0.01, 0.05, 0.1, 0.3, 0.9] {
        let csr = random_csr(&mut rng, 40, 200, density, 0, false);
        let expected = reference::compress(&csr, 0.5);
        for wavefront in [32, 64] {
            let handle = create_handle_with(HandleConfig::new().with_wavefront_size(wavefront));
            let (per_row, c) = compress(&handle, &csr, 0.5, false);
            assert_eq!(per_row, reference::nnz_compress(&csr, 0.5));
            assert_eq!(c, expected, "density {density}, wavefront {wavefront}");
        }
    }
}

#[test]
fn test_device_sink_matches_host_sink() {
    let handle = create_handle();
    let csr = random_csr(&mut seeded(34), 120, 90, 0.1, 0, true);
    let host = compress(&handle, &csr, 0.25, false);
    let device = compress(&handle, &csr, 0.25, true);
    assert_eq!(host, device);
}

#[test]
fn test_complex_magnitude() {
    let handle = create_handle();
    let descr = MatDescr::default();
    // |3+4i| = 5, |0.6+0.8i| = 1
    let row_ptr = upload(&handle, &[0, 2]);
    let val = upload(
        &handle,
        &[Complex64::new(3.0, 4.0), Complex64::new(0.6, 0.8)],
    );
    let per_row = zeros::<i32>(&handle, 1);
    let mut nnz_c = 0;
    nnz_compress(
        &handle,
        1,
        &descr,
        val.ptr(),
        row_ptr.ptr(),
        per_row.ptr(),
        ResultSink::Host(&mut nnz_c),
        Complex64::new(2.0, 0.0),
    )
    .unwrap();
    assert_eq!(nnz_c, 1);
}
