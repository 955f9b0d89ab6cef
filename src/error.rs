//! Error types for spmx
//!
//! Every public operation validates its arguments in a fixed order and reports
//! the first failing category:
//!
//! 1. invalid enum value ([`Error::InvalidValue`])
//! 2. invalid size ([`Error::InvalidSize`])
//! 3. quick return for legitimately empty problems (not an error)
//! 4. null device pointer ([`Error::InvalidPointer`])
//! 5. unsupported matrix descriptor ([`Error::NotImplemented`])
//! 6. device failure ([`Error::OutOfMemory`], [`Error::Backend`])

use thiserror::Error;

/// Result type alias using spmx's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spmx operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An enum argument holds an unknown value, or a value-range precondition failed
    #[error("Invalid value for '{arg}': {reason}")]
    InvalidValue {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A dimension, count or leading dimension is out of range
    #[error("Invalid size for '{arg}': {value}")]
    InvalidSize {
        /// The argument name
        arg: &'static str,
        /// The offending value
        value: i64,
    },

    /// A required device pointer is null
    #[error("Invalid pointer: '{arg}' is null")]
    InvalidPointer {
        /// The argument name
        arg: &'static str,
    },

    /// Feature not implemented (e.g. non-general matrix descriptors)
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },

    /// Out of device memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Device or runtime failure (launch failure, lost device, ...)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create an invalid value error
    pub fn invalid_value(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid size error
    pub fn invalid_size(arg: &'static str, value: impl Into<i64>) -> Self {
        Self::InvalidSize {
            arg,
            value: value.into(),
        }
    }

    /// Create an invalid pointer error
    pub fn invalid_pointer(arg: &'static str) -> Self {
        Self::InvalidPointer { arg }
    }

    /// Size error unless `value >= 0`
    pub(crate) fn check_size(arg: &'static str, value: i32) -> Result<usize> {
        usize::try_from(value).map_err(|_| Self::invalid_size(arg, value))
    }

    /// Returns true for errors raised by the device rather than by argument checks
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::Backend(_))
    }
}
