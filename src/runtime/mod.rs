//! Compute device backends
//!
//! This module defines the `Runtime` trait, the compute-device capability every
//! sparse operation is written against, and provides the CPU implementation.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity, raw memory primitives)
//! ├── Device (identifies a compute unit, knows its wavefront size)
//! ├── Client (kernel dispatch, synchronization, owns the allocator)
//! └── Allocator (device allocations with live-byte tracking)
//! ```
//!
//! Device memory is addressed by `u64` handles where `0` is null. Typed,
//! nullable views over such handles are [`DevicePtr`]; owned allocations are
//! [`DeviceBuffer`].

mod allocator;
pub mod cpu;
mod kernel;
mod memory;

pub use allocator::{Allocator, DefaultAllocator};
pub use kernel::{BlockIdx, Kernel, LaunchConfig};
pub use memory::{DeviceBuffer, DevicePtr};

use crate::error::Result;

/// Core trait for compute backends
///
/// `Runtime` abstracts over compute devices. It uses static dispatch via
/// generics; every sparse operation is generic over `R: Runtime`.
///
/// # Example
///
/// ```
/// use spmx::runtime::{Runtime, cpu::CpuRuntime};
///
/// let device = CpuRuntime::default_device();
/// let ptr = CpuRuntime::allocate(1024, &device).unwrap();
/// CpuRuntime::memset(ptr, 0, 1024, &device).unwrap();
/// CpuRuntime::deallocate(ptr, 1024, &device);
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching kernels
    type Client: RuntimeClient<Self>;

    /// Memory allocator type
    type Allocator: Allocator;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate device memory
    ///
    /// Returns a device handle; a zero-byte request returns the null handle.
    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64>;

    /// Deallocate device memory
    fn deallocate(ptr: u64, size_bytes: usize, device: &Self::Device);

    /// Copy data from host to device
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> Result<()>;

    /// Copy data from device to host
    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device) -> Result<()>;

    /// Copy data within device (device to device)
    fn copy_within_device(src: u64, dst: u64, size_bytes: usize, device: &Self::Device)
    -> Result<()>;

    /// Set `size_bytes` bytes starting at `dst` to `value`
    fn memset(dst: u64, value: u8, size_bytes: usize, device: &Self::Device) -> Result<()>;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Number of lanes in a cooperating parallel group (32 or 64)
    fn wavefront_size(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle kernel dispatch
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Wait for all enqueued work to complete
    fn synchronize(&self) -> Result<()>;

    /// Get the allocator for this client
    fn allocator(&self) -> &R::Allocator;

    /// Enqueue `kernel` over `config.grid_size` work groups of
    /// `config.block_size` lanes each
    ///
    /// The kernel is invoked once per work group. Groups may run concurrently
    /// and in any order; a kernel must only write locations owned by its group.
    fn launch(&self, name: &'static str, config: LaunchConfig, kernel: &Kernel<'_>) -> Result<()>;
}
