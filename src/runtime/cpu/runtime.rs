//! CPU runtime implementation

use super::client::{CpuAllocator, CpuClient};
use super::device::CpuDevice;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of every CPU allocation
pub(crate) const ALLOC_ALIGN: usize = 64;

/// CPU compute runtime
///
/// This is the default runtime that works on any platform.
/// Memory is allocated on the heap using the system allocator; kernels run
/// their work groups on the rayon thread pool when the `rayon` feature is on.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

fn layout(size_bytes: usize) -> Result<AllocLayout> {
    AllocLayout::from_size_align(size_bytes, ALLOC_ALIGN)
        .map_err(|e| Error::Backend(format!("invalid allocation layout: {e}")))
}

/// Heap allocation backing both `Runtime::allocate` and the CPU allocator
pub(super) fn heap_allocate(size_bytes: usize) -> Result<u64> {
    if size_bytes == 0 {
        return Ok(0);
    }
    let ptr = unsafe { alloc_zeroed(layout(size_bytes)?) };
    if ptr.is_null() {
        return Err(Error::OutOfMemory { size: size_bytes });
    }
    Ok(ptr as u64)
}

pub(super) fn heap_deallocate(ptr: u64, size_bytes: usize) {
    if ptr == 0 || size_bytes == 0 {
        return;
    }
    // A layout that was valid for allocation is valid here
    if let Ok(layout) = layout(size_bytes) {
        unsafe { dealloc(ptr as *mut u8, layout) }
    }
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;
    type Allocator = CpuAllocator;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        heap_allocate(size_bytes)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        heap_deallocate(ptr, size_bytes)
    }

    fn copy_to_device(src: &[u8], dst: u64, _device: &Self::Device) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if dst == 0 {
            return Err(Error::invalid_pointer("dst"));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], _device: &Self::Device) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if src == 0 {
            return Err(Error::invalid_pointer("src"));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        _device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if src == 0 || dst == 0 {
            return Err(Error::invalid_pointer(if src == 0 { "src" } else { "dst" }));
        }
        unsafe {
            // Use copy (not copy_nonoverlapping) in case src and dst overlap
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        Ok(())
    }

    fn memset(dst: u64, value: u8, size_bytes: usize, _device: &Self::Device) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if dst == 0 {
            return Err(Error::invalid_pointer("dst"));
        }
        unsafe {
            std::ptr::write_bytes(dst as *mut u8, value, size_bytes);
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        CpuClient::new(device.clone())
    }
}
