//! Memory allocator traits and default implementation
//!
//! The Allocator trait provides device memory management with live-byte
//! tracking, so callers (and tests) can verify that temporaries never outlive
//! the call that created them.

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory allocator trait for runtime backends
pub trait Allocator: Clone + Send + Sync {
    /// Allocate memory of given size
    ///
    /// Returns a device handle (u64) that can be used for operations.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Deallocate memory
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Get the number of bytes currently allocated through this allocator
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

/// Default allocator that delegates to Runtime methods and counts live bytes
///
/// Clones share the same counter.
#[derive(Clone, Debug)]
pub struct DefaultAllocator<D> {
    device: D,
    allocate_fn: fn(usize, &D) -> Result<u64>,
    deallocate_fn: fn(u64, usize, &D),
    live_bytes: Arc<AtomicUsize>,
}

impl<D: Clone + Send + Sync> DefaultAllocator<D> {
    /// Create a new default allocator
    pub fn new(
        device: D,
        allocate_fn: fn(usize, &D) -> Result<u64>,
        deallocate_fn: fn(u64, usize, &D),
    ) -> Self {
        Self {
            device,
            allocate_fn,
            deallocate_fn,
            live_bytes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the device this allocator is associated with
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: Clone + Send + Sync> Allocator for DefaultAllocator<D> {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        let ptr = (self.allocate_fn)(size_bytes, &self.device)?;
        if ptr != 0 {
            self.live_bytes.fetch_add(size_bytes, Ordering::Relaxed);
        }
        Ok(ptr)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 {
            return;
        }
        (self.deallocate_fn)(ptr, size_bytes, &self.device);
        self.live_bytes.fetch_sub(size_bytes, Ordering::Relaxed);
    }

    fn allocated_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}
