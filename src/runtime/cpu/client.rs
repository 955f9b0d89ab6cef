//! CPU client and allocator implementation

use super::device::CpuDevice;
use super::runtime::{CpuRuntime, heap_allocate, heap_deallocate};
use crate::error::{Error, Result};
use crate::runtime::{BlockIdx, DefaultAllocator, Kernel, LaunchConfig, RuntimeClient};
use std::panic::{AssertUnwindSafe, catch_unwind};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// CPU client for kernel dispatch
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
    allocator: CpuAllocator,
}

impl CpuClient {
    /// Create a new CPU client
    pub fn new(device: CpuDevice) -> Self {
        let allocator = create_cpu_allocator(device.clone());
        Self { device, allocator }
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) -> Result<()> {
        // Launches complete before returning, nothing to do
        Ok(())
    }

    fn allocator(&self) -> &CpuAllocator {
        &self.allocator
    }

    fn launch(&self, name: &'static str, config: LaunchConfig, kernel: &Kernel<'_>) -> Result<()> {
        if config.block_size == 0 {
            return Err(Error::Backend(format!("kernel '{name}': empty work group")));
        }
        if config.grid_size == 0 {
            return Ok(());
        }
        log::trace!(
            "launch {name}: grid={} block={}",
            config.grid_size,
            config.block_size
        );

        let run = || {
            #[cfg(feature = "rayon")]
            (0..config.grid_size)
                .into_par_iter()
                .for_each(|block| kernel(BlockIdx::new(block, config)));

            #[cfg(not(feature = "rayon"))]
            for block in 0..config.grid_size {
                kernel(BlockIdx::new(block, config));
            }
        };

        // A panicking lane is the CPU analogue of a device fault
        catch_unwind(AssertUnwindSafe(run)).map_err(|payload| {
            let reason = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("unknown fault");
            Error::Backend(format!("kernel '{name}' failed: {reason}"))
        })
    }
}

/// CPU-specific allocator type alias
pub type CpuAllocator = DefaultAllocator<CpuDevice>;

/// Create a CPU allocator for the given device
fn create_cpu_allocator(device: CpuDevice) -> CpuAllocator {
    DefaultAllocator::new(
        device,
        |size, _dev| heap_allocate(size),
        |ptr, size, _dev| heap_deallocate(ptr, size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_launch_runs_every_group() {
        let client = CpuClient::new(CpuDevice::new());
        let lanes = AtomicUsize::new(0);
        let cfg = LaunchConfig::for_items(1000, 256);
        client
            .launch("count", cfg, &|idx| {
                for tid in idx.lanes() {
                    if idx.global_id(tid) < 1000 {
                        lanes.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .unwrap();
        assert_eq!(lanes.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn test_launch_fault_becomes_error() {
        let client = CpuClient::new(CpuDevice::new());
        let cfg = LaunchConfig {
            grid_size: 2,
            block_size: 1,
        };
        let err = client
            .launch("fault", cfg, &|idx| {
                if idx.block_id == 1 {
                    panic!("lane fault");
                }
            })
            .unwrap_err();
        assert!(err.is_runtime());
        assert!(err.to_string().contains("fault"));
    }

    #[test]
    fn test_empty_grid_is_noop() {
        let client = CpuClient::new(CpuDevice::new());
        let cfg = LaunchConfig {
            grid_size: 0,
            block_size: 64,
        };
        client.launch("noop", cfg, &|_| panic!("never")).unwrap();
    }
}
