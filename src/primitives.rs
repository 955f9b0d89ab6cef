//! Device-wide reduction and scan primitives
//!
//! These are the building blocks every counting phase shares: per-row counts
//! are summed into a total ([`reduce_sum`]) or turned into an offset array
//! ([`inclusive_scan`]). Temporaries come from the handle's scratch arena.

use crate::descr::ResultSink;
use crate::error::{Error, Result};
use crate::handle::{Handle, ScratchLease, align_up};
use crate::kernels::reduce::{self, ReduceOp};
use crate::kernels::scan;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Sum `input[..n]` into `sink`
///
/// `n == 0` writes `0` without launching anything. With a host sink the call
/// waits for the device; with a device sink the total is written by device
/// work and readable after synchronization.
pub fn reduce_sum<R: Runtime>(
    handle: &Handle<R>,
    n: i32,
    input: DevicePtr<i32>,
    sink: ResultSink<'_>,
) -> Result<()> {
    log::trace!("reduce_sum: n={n}");
    if n < 0 {
        return Err(Error::invalid_size("n", n));
    }
    if n == 0 {
        return write_scalar(handle, sink, 0);
    }
    input.require("input")?.require_len(n as usize, "input")?;
    sink.require("result")?;
    sum_into_sink(handle, n as usize, input, sink)
}

/// Maximum of `input[..n]`, read back to the host (`0` when `n == 0`)
pub fn reduce_max<R: Runtime>(handle: &Handle<R>, n: i32, input: DevicePtr<i32>) -> Result<i32> {
    log::trace!("reduce_max: n={n}");
    if n < 0 {
        return Err(Error::invalid_size("n", n));
    }
    if n == 0 {
        return Ok(0);
    }
    input.require("input")?.require_len(n as usize, "input")?;
    max_to_host(handle, n as usize, input)
}

/// Inclusive prefix sum of `data[..n]` in place
pub fn inclusive_scan<R: Runtime>(handle: &Handle<R>, n: i32, data: DevicePtr<i32>) -> Result<()> {
    log::trace!("inclusive_scan: n={n}");
    if n < 0 {
        return Err(Error::invalid_size("n", n));
    }
    if n == 0 {
        return Ok(());
    }
    data.require("data")?.require_len(n as usize, "data")?;
    scan_in_place(handle, n as usize, data)
}

/// Scratch layout of a reduction: one result slot followed by the partials
pub(crate) fn reduce_scratch_bytes(n: usize) -> usize {
    align_up(size_of::<i32>()) + reduce::partials_len(n) * size_of::<i32>()
}

/// Scratch bytes of an in-place scan over `n` items
pub(crate) fn scan_scratch_bytes(n: usize) -> usize {
    scan::totals_len(n) * size_of::<i32>()
}

/// Reduce without validation; `n > 0`
pub(crate) fn sum_into_sink<R: Runtime>(
    handle: &Handle<R>,
    n: usize,
    input: DevicePtr<i32>,
    sink: ResultSink<'_>,
) -> Result<()> {
    let lease = handle.scratch(reduce_scratch_bytes(n))?;
    let out = lease.view::<i32>(0, 1);
    let partials = lease.view::<i32>(align_up(size_of::<i32>()), reduce::partials_len(n));
    // SAFETY: input was validated by the caller; out and partials lie in the lease
    unsafe { reduce::reduce::<R>(handle.client(), ReduceOp::Sum, n, input, partials, out)? };
    deliver(handle, out, sink)
}

/// Maximum without validation, read back to the host; `n > 0`
pub(crate) fn max_to_host<R: Runtime>(
    handle: &Handle<R>,
    n: usize,
    input: DevicePtr<i32>,
) -> Result<i32> {
    let lease = handle.scratch(reduce_scratch_bytes(n))?;
    max_in_lease(handle, &lease, 0, n, input)
}

/// As [`max_to_host`], working in `lease` from `at` on
///
/// The region must hold [`reduce_scratch_bytes`]`(n)` bytes.
pub(crate) fn max_in_lease<R: Runtime>(
    handle: &Handle<R>,
    lease: &ScratchLease<'_, R>,
    at: usize,
    n: usize,
    input: DevicePtr<i32>,
) -> Result<i32> {
    let out = lease.view::<i32>(at, 1);
    let partials = lease.view::<i32>(at + align_up(size_of::<i32>()), reduce::partials_len(n));
    // SAFETY: input was validated by the caller; out and partials lie in the lease
    unsafe { reduce::reduce::<R>(handle.client(), ReduceOp::Max, n, input, partials, out)? };
    read_scalar(handle, out, 0)
}

/// Scan without validation
pub(crate) fn scan_in_place<R: Runtime>(
    handle: &Handle<R>,
    n: usize,
    data: DevicePtr<i32>,
) -> Result<()> {
    let lease = handle.scratch(scan_scratch_bytes(n))?;
    scan_in_lease(handle, &lease, 0, n, data)
}

/// As [`scan_in_place`], keeping tile totals in `lease` from `at` on
///
/// The region must hold [`scan_scratch_bytes`]`(n)` bytes.
pub(crate) fn scan_in_lease<R: Runtime>(
    handle: &Handle<R>,
    lease: &ScratchLease<'_, R>,
    at: usize,
    n: usize,
    data: DevicePtr<i32>,
) -> Result<()> {
    let totals = lease.view::<i32>(at, scan::totals_len(n));
    // SAFETY: data was validated by the caller; totals lies in the lease
    unsafe { scan::inclusive_scan::<R>(handle.client(), n, data, totals) }
}

/// Copy `src[0]` into `sink`
fn deliver<R: Runtime>(handle: &Handle<R>, src: DevicePtr<i32>, sink: ResultSink<'_>) -> Result<()> {
    match sink {
        ResultSink::Host(value) => {
            *value = read_scalar(handle, src, 0)?;
            Ok(())
        }
        ResultSink::Device(dst) => R::copy_within_device(
            src.addr(),
            dst.addr(),
            size_of::<i32>(),
            handle.client().device(),
        ),
    }
}

/// Write a host-known value into `sink`; a null device sink is skipped
pub(crate) fn write_scalar<R: Runtime>(
    handle: &Handle<R>,
    sink: ResultSink<'_>,
    value: i32,
) -> Result<()> {
    match sink {
        ResultSink::Host(dst) => {
            *dst = value;
            Ok(())
        }
        ResultSink::Device(dst) if dst.is_null() => Ok(()),
        ResultSink::Device(dst) => R::copy_to_device(
            bytemuck::bytes_of(&value),
            dst.addr(),
            handle.client().device(),
        ),
    }
}

/// Wait for the device and read `src[i]`
pub(crate) fn read_scalar<R: Runtime>(
    handle: &Handle<R>,
    src: DevicePtr<i32>,
    i: usize,
) -> Result<i32> {
    let slot = src
        .slice(i, 1)
        .ok_or_else(|| Error::invalid_size("index", i as i64))?;
    handle.synchronize()?;
    let mut value = 0i32;
    R::copy_from_device(
        slot.addr(),
        bytemuck::bytes_of_mut(&mut value),
        handle.client().device(),
    )?;
    Ok(value)
}

/// Deliver `ptr[len] - base`, the entry count of an offset array, to `sink`
pub(crate) fn write_total<R: Runtime>(
    handle: &Handle<R>,
    ptr: DevicePtr<i32>,
    len: usize,
    base: i32,
    sink: ResultSink<'_>,
) -> Result<()> {
    match sink {
        ResultSink::Host(dst) => {
            *dst = read_scalar(handle, ptr, len)? - base;
            Ok(())
        }
        ResultSink::Device(dst) => handle.client().launch(
            "write_total",
            LaunchConfig {
                grid_size: 1,
                block_size: 1,
            },
            &|_| unsafe { dst.write(0, ptr.read(len) - base) },
        ),
    }
}

/// Count the entries of an offset array on the host
pub(crate) fn read_total<R: Runtime>(
    handle: &Handle<R>,
    ptr: DevicePtr<i32>,
    len: usize,
    base: i32,
) -> Result<i32> {
    Ok(read_scalar(handle, ptr, len)? - base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleConfig;
    use crate::runtime::{Allocator, DeviceBuffer};
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    fn handle() -> Handle<CpuRuntime> {
        Handle::new(CpuRuntime::default_client(&CpuDevice::new())).unwrap()
    }

    #[test]
    fn test_reduce_sum_host_and_device() {
        let handle = handle();
        let data: Vec<i32> = (0..5000).map(|i| i % 7).collect();
        let expected: i32 = data.iter().sum();
        let input = DeviceBuffer::<CpuRuntime, i32>::from_slice(handle.client(), &data).unwrap();

        let mut host = -1;
        reduce_sum(&handle, 5000, input.ptr(), ResultSink::Host(&mut host)).unwrap();
        assert_eq!(host, expected);

        let dev = DeviceBuffer::<CpuRuntime, i32>::zeros(handle.client(), 1).unwrap();
        reduce_sum(&handle, 5000, input.ptr(), ResultSink::Device(dev.ptr())).unwrap();
        assert_eq!(dev.to_vec().unwrap(), vec![expected]);
    }

    #[test]
    fn test_reduce_sum_empty_writes_zero() {
        let handle = handle();
        let mut host = 42;
        reduce_sum(&handle, 0, DevicePtr::null(), ResultSink::Host(&mut host)).unwrap();
        assert_eq!(host, 0);
    }

    #[test]
    fn test_reduce_sum_rejects_bad_args() {
        let handle = handle();
        let mut host = 0;
        assert_eq!(
            reduce_sum(&handle, -1, DevicePtr::null(), ResultSink::Host(&mut host)),
            Err(Error::invalid_size("n", -1))
        );
        assert_eq!(
            reduce_sum(&handle, 3, DevicePtr::null(), ResultSink::Host(&mut host)),
            Err(Error::invalid_pointer("input"))
        );
    }

    #[test]
    fn test_reduce_max() {
        let handle = handle();
        let data: Vec<i32> = (0..3000).map(|i| (i * 37) % 1001).collect();
        let input = DeviceBuffer::<CpuRuntime, i32>::from_slice(handle.client(), &data).unwrap();
        assert_eq!(reduce_max(&handle, 3000, input.ptr()).unwrap(), 1000);
        assert_eq!(reduce_max(&handle, 0, DevicePtr::null()).unwrap(), 0);
    }

    #[test]
    fn test_inclusive_scan_multi_tile() {
        let handle = handle();
        let n = 2 * scan::SCAN_TILE + 17;
        let data: Vec<i32> = (0..n as i32).map(|i| i % 3).collect();
        let buf = DeviceBuffer::<CpuRuntime, i32>::from_slice(handle.client(), &data).unwrap();
        inclusive_scan(&handle, n as i32, buf.ptr()).unwrap();

        let mut acc = 0;
        let expected: Vec<i32> = data
            .iter()
            .map(|&x| {
                acc += x;
                acc
            })
            .collect();
        assert_eq!(buf.to_vec().unwrap(), expected);
    }

    #[test]
    fn test_scratch_fallback_leaves_no_allocation() {
        let config = HandleConfig::new().with_scratch_bytes(0);
        let handle =
            Handle::<CpuRuntime>::with_config(CpuRuntime::default_client(&CpuDevice::new()), config)
                .unwrap();
        let input =
            DeviceBuffer::<CpuRuntime, i32>::from_slice(handle.client(), &[1; 4096]).unwrap();
        let before = handle.client().allocator().allocated_bytes();

        let mut host = 0;
        reduce_sum(&handle, 4096, input.ptr(), ResultSink::Host(&mut host)).unwrap();
        assert_eq!(host, 4096);
        assert_eq!(handle.client().allocator().allocated_bytes(), before);
    }

    #[test]
    fn test_write_total() {
        let handle = handle();
        let ptr = DeviceBuffer::<CpuRuntime, i32>::from_slice(handle.client(), &[1, 3, 6]).unwrap();
        let mut host = 0;
        write_total(&handle, ptr.ptr(), 2, 1, ResultSink::Host(&mut host)).unwrap();
        assert_eq!(host, 5);

        let dev = DeviceBuffer::<CpuRuntime, i32>::zeros(handle.client(), 1).unwrap();
        write_total(&handle, ptr.ptr(), 2, 1, ResultSink::Device(dev.ptr())).unwrap();
        assert_eq!(dev.to_vec().unwrap(), vec![5]);
    }
}
