//! CPU runtime implementation
//!
//! The CPU runtime backs device memory with aligned heap allocations and runs
//! kernel work groups on the rayon thread pool (serially without the `rayon`
//! feature). Launches complete before `launch` returns, so synchronization is
//! a no-op; operations still call it where a device would need it.

mod client;
mod device;
mod runtime;

pub use client::{CpuAllocator, CpuClient};
pub use device::{CpuDevice, DEFAULT_WAVEFRONT_SIZE};
pub use runtime::CpuRuntime;
