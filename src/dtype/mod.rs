//! Value types for sparse matrices
//!
//! This module provides the `DType` enum naming the supported value types
//! (single/double precision real and complex), and the [`Element`] trait that
//! maps Rust types onto it.

pub mod complex;
mod element;

pub use complex::{Complex64, Complex128};
pub use element::Element;

use std::fmt;

/// Value types supported by sparse matrices
///
/// Discriminants follow the numbering used for serialized dtype tags:
/// floats 0-9, complex 40-49.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// 64-bit complex (two f32: re, im)
    Complex64 = 40,
    /// 128-bit complex (two f64: re, im)
    Complex128 = 41,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::Complex64 => "c64",
            Self::Complex128 => "c128",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_display() {
        assert_eq!(DType::F32.to_string(), "f32");
        assert_eq!(DType::F64.to_string(), "f64");
        assert_eq!(DType::Complex64.to_string(), "c64");
        assert_eq!(format!("{}", Complex128::DTYPE), "c128");
    }
}
