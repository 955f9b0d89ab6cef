//! CPU device implementation

use crate::error::{Error, Result};
use crate::runtime::Device;

/// Wavefront width used when none is requested
pub const DEFAULT_WAVEFRONT_SIZE: usize = 64;

/// CPU device (there's only one: the host CPU)
///
/// The CPU has no native wavefront; the width is a simulation parameter that
/// steers the same heuristics a GPU would use (32 or 64 lanes).
#[derive(Clone, Debug)]
pub struct CpuDevice {
    id: usize,
    wavefront_size: usize,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDevice {
    /// Create a new CPU device
    pub fn new() -> Self {
        Self {
            id: 0,
            wavefront_size: DEFAULT_WAVEFRONT_SIZE,
        }
    }

    /// Same device, simulating a different wavefront width (32 or 64)
    pub fn with_wavefront_size(mut self, wavefront_size: usize) -> Result<Self> {
        if !matches!(wavefront_size, 32 | 64) {
            return Err(Error::invalid_value(
                "wavefront_size",
                format!("{wavefront_size} (expected 32 or 64)"),
            ));
        }
        self.wavefront_size = wavefront_size;
        Ok(self)
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn wavefront_size(&self) -> usize {
        self.wavefront_size
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}
