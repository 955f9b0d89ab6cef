//! Element trait for mapping Rust value types to DType

use super::DType;
use super::complex::{Complex64, Complex128};
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// Trait for types that can be stored as sparse matrix values
///
/// # Bounds
/// - `Pod + Zeroable` - byte-level copies between host and device (bytemuck)
/// - `Add + Sub + Mul` - the arithmetic used by conversions and `csrgeam`
/// - `PartialEq` - structural zero detection in dense counting
pub trait Element:
    Copy
    + Clone
    + Debug
    + Send
    + Sync
    + Pod
    + Zeroable
    + PartialEq
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Absolute value as f64
    ///
    /// For complex types this is the modulus |z|. Tolerance-based compression
    /// compares this against the real part of the tolerance.
    fn magnitude(self) -> f64;

    /// Real part as f64
    fn real(self) -> f64;

    /// Zero value
    fn zero() -> Self;

    /// Returns true if this is exactly zero
    #[inline]
    fn is_zero(self) -> bool {
        self == Self::zero()
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn magnitude(self) -> f64 {
        self.abs()
    }

    #[inline]
    fn real(self) -> f64 {
        self
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn magnitude(self) -> f64 {
        self.abs() as f64
    }

    #[inline]
    fn real(self) -> f64 {
        self as f64
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex64;

    #[inline]
    fn magnitude(self) -> f64 {
        Complex64::magnitude(self) as f64
    }

    #[inline]
    fn real(self) -> f64 {
        self.re as f64
    }

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }
}

impl Element for Complex128 {
    const DTYPE: DType = DType::Complex128;

    #[inline]
    fn magnitude(self) -> f64 {
        Complex128::magnitude(self)
    }

    #[inline]
    fn real(self) -> f64 {
        self.re
    }

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }
}
