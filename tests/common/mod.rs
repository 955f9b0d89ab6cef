//! Common test utilities
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spmx::dtype::Element;
use spmx::handle::{Handle, HandleConfig};
use spmx::reference::HostCsr;
use spmx::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use spmx::runtime::{DeviceBuffer, Runtime};

pub type Buf<T> = DeviceBuffer<CpuRuntime, T>;

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (client, device)
}

/// Handle over a fresh CPU client with the default configuration
pub fn create_handle() -> Handle<CpuRuntime> {
    let (client, _) = create_cpu_client();
    Handle::new(client).unwrap()
}

/// Handle with an explicit configuration
pub fn create_handle_with(config: HandleConfig) -> Handle<CpuRuntime> {
    let (client, _) = create_cpu_client();
    Handle::with_config(client, config).unwrap()
}

/// Upload a slice to the device
pub fn upload<T: bytemuck::Pod>(handle: &Handle<CpuRuntime>, data: &[T]) -> Buf<T> {
    Buf::from_slice(handle.client(), data).unwrap()
}

/// Allocate `len` zeroed device elements
pub fn zeros<T: bytemuck::Pod>(handle: &Handle<CpuRuntime>, len: usize) -> Buf<T> {
    Buf::zeros(handle.client(), len).unwrap()
}

/// Device copy of a host CSR matrix
pub struct DeviceCsr<T: Element> {
    pub row_ptr: Buf<i32>,
    pub col_ind: Buf<i32>,
    pub val: Buf<T>,
}

pub fn upload_csr<T: Element>(handle: &Handle<CpuRuntime>, csr: &HostCsr<T>) -> DeviceCsr<T> {
    DeviceCsr {
        row_ptr: upload(handle, &csr.row_ptr),
        col_ind: upload(handle, &csr.col_ind),
        val: upload(handle, &csr.val),
    }
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two element slices are close, comparing magnitudes of differences
pub fn assert_allclose<T: Element>(a: &[T], b: &[T], tol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (&x, &y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).magnitude();
        assert!(
            diff <= tol * (1.0 + y.magnitude()),
            "{}: element {} differs: {:?} vs {:?}",
            msg,
            i,
            x,
            y
        );
    }
}

/// Random `m x n` CSR matrix with sorted columns
///
/// Each position is stored with probability `density`; stored values are
/// drawn from `[-1, 1)` and may be exact zeros when `zeros` is set.
pub fn random_csr(
    rng: &mut StdRng,
    m: usize,
    n: usize,
    density: f64,
    base: i32,
    zeros: bool,
) -> HostCsr<f64> {
    let mut row_ptr = vec![base];
    let mut col_ind = Vec::new();
    let mut val = Vec::new();
    for _ in 0..m {
        for j in 0..n {
            if rng.random_bool(density) {
                col_ind.push(j as i32 + base);
                let v = if zeros && rng.random_bool(0.2) {
                    0.0
                } else {
                    rng.random_range(-1.0..1.0)
                };
                val.push(v);
            }
        }
        row_ptr.push(col_ind.len() as i32 + base);
    }
    HostCsr::new(m, n, base, row_ptr, col_ind, val).unwrap()
}

/// Seeded generator for reproducible tests
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
