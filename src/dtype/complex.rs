//! Complex value types for sparse matrices
//!
//! `Complex64` and `Complex128` are `#[repr(C)]` pairs stored in interleaved
//! format (re, im), so they can be copied to and from device memory with
//! `bytemuck` like any other [`Element`](super::Element).
//!
//! Only the arithmetic the conversions and `csrgeam` need is provided:
//! addition, subtraction, multiplication and the modulus.

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Mul, Sub};

macro_rules! complex_type {
    ($name:ident, $float:ty, $bits:literal) => {
        #[doc = concat!($bits, "-bit complex value, two `", stringify!($float), "` parts")]
        #[repr(C)]
        #[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
        pub struct $name {
            /// Real part
            pub re: $float,
            /// Imaginary part
            pub im: $float,
        }

        impl $name {
            /// Additive identity
            pub const ZERO: Self = Self::new(0.0, 0.0);

            /// Builds `re + im·i`
            #[inline]
            pub const fn new(re: $float, im: $float) -> Self {
                Self { re, im }
            }

            /// Modulus |z|, computed without intermediate overflow
            #[inline]
            pub fn magnitude(self) -> $float {
                self.re.hypot(self.im)
            }
        }

        complex_type!(@componentwise $name, Add, add, +);
        complex_type!(@componentwise $name, Sub, sub, -);

        impl Mul for $name {
            type Output = Self;

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                Self::new(
                    self.re * rhs.re - self.im * rhs.im,
                    self.re * rhs.im + self.im * rhs.re,
                )
            }
        }
    };

    (@componentwise $name:ident, $trait:ident, $method:ident, $op:tt) => {
        impl $trait for $name {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Self::new(self.re $op rhs.re, self.im $op rhs.im)
            }
        }
    };
}

complex_type!(Complex64, f32, "64");
complex_type!(Complex128, f64, "128");
