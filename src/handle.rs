//! Execution context
//!
//! A [`Handle`] binds a runtime client to the configuration every operation
//! consults (wavefront width, scratch arena). It owns a reusable device
//! scratch arena; short-lived temporaries borrow it through a
//! [`ScratchLease`] and fall back to a private allocation when the arena is
//! busy or too small.

use crate::error::{Error, Result};
use crate::runtime::{Allocator, Device, DevicePtr, Runtime, RuntimeClient};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default size of the handle-owned scratch arena (1 MiB)
pub const DEFAULT_SCRATCH_BYTES: usize = 1 << 20;

/// Environment variable overriding [`HandleConfig::scratch_bytes`]
pub const ENV_SCRATCH_BYTES: &str = "SPMX_SCRATCH_BYTES";

/// Environment variable overriding [`HandleConfig::wavefront_size`]
pub const ENV_WAVEFRONT_SIZE: &str = "SPMX_WAVEFRONT_SIZE";

/// Alignment of every region carved out of a scratch lease
pub(crate) const SCRATCH_ALIGN: usize = 16;

/// Round `bytes` up to the scratch alignment
#[inline]
pub(crate) const fn align_up(bytes: usize) -> usize {
    bytes.div_ceil(SCRATCH_ALIGN) * SCRATCH_ALIGN
}

/// Handle configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandleConfig {
    /// Size of the reusable scratch arena in bytes (0 disables it)
    pub scratch_bytes: usize,
    /// Override of the device's wavefront width (32 or 64)
    pub wavefront_size: Option<usize>,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            scratch_bytes: DEFAULT_SCRATCH_BYTES,
            wavefront_size: None,
        }
    }
}

impl HandleConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scratch arena size
    pub fn with_scratch_bytes(mut self, bytes: usize) -> Self {
        self.scratch_bytes = bytes;
        self
    }

    /// Override the wavefront width
    pub fn with_wavefront_size(mut self, lanes: usize) -> Self {
        self.wavefront_size = Some(lanes);
        self
    }

    /// Defaults overridden by `SPMX_SCRATCH_BYTES` and `SPMX_WAVEFRONT_SIZE`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(ENV_SCRATCH_BYTES) {
            config.scratch_bytes = raw.trim().parse().map_err(|_| {
                Error::invalid_value("scratch_bytes", format!("cannot parse '{raw}'"))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_WAVEFRONT_SIZE) {
            let lanes = raw.trim().parse().map_err(|_| {
                Error::invalid_value("wavefront_size", format!("cannot parse '{raw}'"))
            })?;
            config.wavefront_size = Some(lanes);
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.wavefront_size {
            None | Some(32) | Some(64) => Ok(()),
            Some(other) => Err(Error::invalid_value(
                "wavefront_size",
                format!("{other} (expected 32 or 64)"),
            )),
        }
    }
}

struct Arena {
    addr: u64,
    size: usize,
}

/// Execution context for sparse operations
pub struct Handle<R: Runtime> {
    client: R::Client,
    config: HandleConfig,
    wavefront_size: usize,
    arena: Mutex<Arena>,
    fallbacks: AtomicUsize,
}

impl<R: Runtime> Handle<R> {
    /// Create a handle with the default configuration
    pub fn new(client: R::Client) -> Result<Self> {
        Self::with_config(client, HandleConfig::default())
    }

    /// Create a handle with an explicit configuration
    pub fn with_config(client: R::Client, config: HandleConfig) -> Result<Self> {
        config.validate()?;
        let wavefront_size = config
            .wavefront_size
            .unwrap_or_else(|| client.device().wavefront_size());
        let addr = client.allocator().allocate(config.scratch_bytes)?;
        let size = if addr == 0 { 0 } else { config.scratch_bytes };
        log::debug!(
            "handle on {} ({}): wavefront={wavefront_size}, scratch={size} bytes",
            R::name(),
            client.device().name()
        );
        Ok(Self {
            client,
            config,
            wavefront_size,
            arena: Mutex::new(Arena { addr, size }),
            fallbacks: AtomicUsize::new(0),
        })
    }

    /// The runtime client
    #[inline]
    pub fn client(&self) -> &R::Client {
        &self.client
    }

    /// The configuration this handle was created with
    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Effective wavefront width (32 or 64)
    #[inline]
    pub fn wavefront_size(&self) -> usize {
        self.wavefront_size
    }

    /// Wait for all work enqueued through this handle
    pub fn synchronize(&self) -> Result<()> {
        self.client.synchronize()
    }

    /// Number of scratch requests served by a private allocation instead of
    /// the arena
    pub fn scratch_fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Borrow at least `bytes` bytes of device scratch for the current call
    ///
    /// The handle's arena is used when it is large enough and not already
    /// lent out; otherwise a private allocation is made and released when
    /// the lease drops.
    pub(crate) fn scratch(&self, bytes: usize) -> Result<ScratchLease<'_, R>> {
        if let Some(guard) = self.arena.try_lock() {
            if guard.addr != 0 && guard.size >= bytes {
                let addr = guard.addr;
                return Ok(ScratchLease {
                    addr,
                    size: bytes,
                    backing: Backing::Arena(guard),
                });
            }
        }

        log::debug!(
            "scratch arena cannot serve {bytes} bytes (capacity {}); allocating",
            self.config.scratch_bytes
        );
        let size = bytes.max(SCRATCH_ALIGN);
        let addr = self.client.allocator().allocate(size)?;
        if addr == 0 {
            return Err(Error::OutOfMemory { size });
        }
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        Ok(ScratchLease {
            addr,
            size,
            backing: Backing::Private(&self.client),
        })
    }
}

impl<R: Runtime> std::fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("runtime", &R::name())
            .field("config", &self.config)
            .field("wavefront_size", &self.wavefront_size)
            .finish()
    }
}

impl<R: Runtime> Drop for Handle<R> {
    fn drop(&mut self) {
        let arena = self.arena.get_mut();
        self.client.allocator().deallocate(arena.addr, arena.size);
    }
}

enum Backing<'a, R: Runtime> {
    Arena(#[allow(dead_code)] MutexGuard<'a, Arena>),
    Private(&'a R::Client),
}

/// Device scratch memory lent for the duration of one call
pub(crate) struct ScratchLease<'a, R: Runtime> {
    addr: u64,
    size: usize,
    backing: Backing<'a, R>,
}

impl<R: Runtime> ScratchLease<'_, R> {
    /// Typed view of `len` elements starting `offset_bytes` into the lease
    ///
    /// `offset_bytes` must be a multiple of [`SCRATCH_ALIGN`] and the region
    /// must lie inside the lease.
    pub(crate) fn view<T>(&self, offset_bytes: usize, len: usize) -> DevicePtr<'_, T> {
        debug_assert_eq!(offset_bytes % SCRATCH_ALIGN, 0);
        debug_assert!(offset_bytes + len * std::mem::size_of::<T>() <= self.size);
        // SAFETY: the region lies inside this lease, which outlives every
        // kernel launched during the call that holds it
        unsafe { DevicePtr::from_raw(self.addr + offset_bytes as u64, len) }
    }

    /// Whether this lease is backed by a private allocation
    #[cfg(test)]
    pub(crate) fn is_private(&self) -> bool {
        matches!(self.backing, Backing::Private(_))
    }
}

impl<R: Runtime> Drop for ScratchLease<'_, R> {
    fn drop(&mut self) {
        if let Backing::Private(client) = self.backing {
            client.allocator().deallocate(self.addr, self.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    fn client() -> <CpuRuntime as Runtime>::Client {
        CpuRuntime::default_client(&CpuDevice::new())
    }

    #[test]
    fn test_config_defaults() {
        let config = HandleConfig::new();
        assert_eq!(config.scratch_bytes, DEFAULT_SCRATCH_BYTES);
        assert_eq!(config.wavefront_size, None);
        let config = config.with_scratch_bytes(64).with_wavefront_size(32);
        assert_eq!(config.scratch_bytes, 64);
        assert_eq!(config.wavefront_size, Some(32));
    }

    #[test]
    fn test_invalid_wavefront_rejected() {
        let config = HandleConfig::new().with_wavefront_size(48);
        let err = Handle::<CpuRuntime>::with_config(client(), config).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { arg: "wavefront_size", .. }));
    }

    #[test]
    fn test_wavefront_from_device_or_override() {
        let device = CpuDevice::new().with_wavefront_size(32).unwrap();
        let handle = Handle::<CpuRuntime>::new(CpuRuntime::default_client(&device)).unwrap();
        assert_eq!(handle.wavefront_size(), 32);

        let config = HandleConfig::new().with_wavefront_size(64);
        let handle = Handle::<CpuRuntime>::with_config(client(), config).unwrap();
        assert_eq!(handle.wavefront_size(), 64);
    }

    #[test]
    fn test_scratch_uses_arena_when_it_fits() {
        let handle = Handle::<CpuRuntime>::new(client()).unwrap();
        let baseline = handle.client().allocator().allocated_bytes();
        let lease = handle.scratch(1024).unwrap();
        assert!(!lease.is_private());
        assert_eq!(handle.client().allocator().allocated_bytes(), baseline);
    }

    #[test]
    fn test_scratch_falls_back_and_releases() {
        let config = HandleConfig::new().with_scratch_bytes(64);
        let handle = Handle::<CpuRuntime>::with_config(client(), config).unwrap();
        let baseline = handle.client().allocator().allocated_bytes();
        {
            let lease = handle.scratch(4096).unwrap();
            assert!(lease.is_private());
            assert!(handle.client().allocator().allocated_bytes() > baseline);
        }
        assert_eq!(handle.client().allocator().allocated_bytes(), baseline);
    }

    #[test]
    fn test_busy_arena_falls_back() {
        let handle = Handle::<CpuRuntime>::new(client()).unwrap();
        let first = handle.scratch(16).unwrap();
        let second = handle.scratch(16).unwrap();
        assert!(!first.is_private());
        assert!(second.is_private());
        assert_eq!(handle.scratch_fallbacks(), 1);
    }

    #[test]
    fn test_lease_view_addresses() {
        let handle = Handle::<CpuRuntime>::new(client()).unwrap();
        let lease = handle.scratch(64).unwrap();
        let a = lease.view::<i32>(0, 4);
        let b = lease.view::<i32>(align_up(16), 4);
        assert_eq!(b.addr() - a.addr(), 16);
        assert_eq!(align_up(17), 32);
    }
}
