//! Matrix descriptors, enum parameters and scalar argument/result locations

use crate::error::{Error, Result};
use crate::runtime::DevicePtr;

/// Implements `TryFrom<i32>` for a fieldless enum from its discriminants
macro_rules! impl_try_from_i32 {
    ($name:ident, $arg:literal, [$($variant:ident),+ $(,)?]) => {
        impl TryFrom<i32> for $name {
            type Error = Error;

            fn try_from(raw: i32) -> Result<Self> {
                $(
                    if raw == $name::$variant as i32 {
                        return Ok($name::$variant);
                    }
                )+
                Err(Error::invalid_value($arg, format!("unknown value {raw}")))
            }
        }

        impl $name {
            /// Raw integer value of this enum
            #[inline]
            pub const fn as_i32(self) -> i32 {
                self as i32
            }
        }
    };
}

/// Offset added to every stored row/column position
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum IndexBase {
    /// Zero-based indexing
    #[default]
    Zero = 0,
    /// One-based indexing
    One = 1,
}

impl_try_from_i32!(IndexBase, "index_base", [Zero, One]);

impl IndexBase {
    /// The base as an index offset
    #[inline]
    pub const fn offset(self) -> i32 {
        self as i32
    }
}

/// Structural matrix type
///
/// Only `General` is supported by conversions and arithmetic; the other
/// tags are rejected with [`Error::NotImplemented`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MatrixType {
    /// No structural assumptions
    #[default]
    General = 0,
    /// Symmetric
    Symmetric = 1,
    /// Hermitian
    Hermitian = 2,
    /// Triangular
    Triangular = 3,
}

impl_try_from_i32!(MatrixType, "matrix_type", [General, Symmetric, Hermitian, Triangular]);

/// Row or column orientation
///
/// Selects the intra-block layout for BSR and the counting axis for dense
/// matrices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Direction {
    /// Row-major / per row
    #[default]
    Row = 0,
    /// Column-major / per column
    Column = 1,
}

impl_try_from_i32!(Direction, "direction", [Row, Column]);

/// Whether a structural conversion also moves values
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    /// Structure only
    Symbolic = 0,
    /// Structure and values
    #[default]
    Numeric = 1,
}

impl_try_from_i32!(Action, "action", [Symbolic, Numeric]);

/// How a HYB matrix splits entries between its ELL and COO parts
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HybPartition {
    /// ELL width is the mean row length, rounded up
    #[default]
    Auto = 0,
    /// ELL width supplied by the caller
    User = 1,
    /// ELL width is the longest row; the COO part is empty
    Max = 2,
}

impl_try_from_i32!(HybPartition, "partition", [Auto, User, Max]);

/// Where a scalar argument or result lives
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerMode {
    /// Host memory, readable as soon as the call returns
    Host,
    /// Device memory, readable after synchronization
    Device,
}

/// Matrix descriptor
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatDescr {
    /// Index base of stored offsets and indices
    pub index_base: IndexBase,
    /// Structural matrix type
    pub matrix_type: MatrixType,
}

impl MatDescr {
    /// General matrix with the given index base
    pub fn new(index_base: IndexBase) -> Self {
        Self {
            index_base,
            matrix_type: MatrixType::General,
        }
    }

    /// Same descriptor with a different matrix type
    pub fn with_matrix_type(mut self, matrix_type: MatrixType) -> Self {
        self.matrix_type = matrix_type;
        self
    }

    /// Index base as an offset
    #[inline]
    pub fn base(&self) -> i32 {
        self.index_base.offset()
    }

    pub(crate) fn require_general(&self) -> Result<()> {
        match self.matrix_type {
            MatrixType::General => Ok(()),
            _ => Err(Error::NotImplemented {
                feature: "non-general matrix type",
            }),
        }
    }
}

/// Destination of a scalar count
///
/// `Host` results are written once the device has finished and are readable
/// when the call returns. `Device` results are written by device work and are
/// only safe to read after synchronizing the client.
#[derive(Debug)]
pub enum ResultSink<'a> {
    /// Write into host memory
    Host(&'a mut i32),
    /// Write into one `i32` of device memory
    Device(DevicePtr<'a, i32>),
}

impl ResultSink<'_> {
    /// Pointer mode implied by the destination
    pub fn mode(&self) -> PointerMode {
        match self {
            Self::Host(_) => PointerMode::Host,
            Self::Device(_) => PointerMode::Device,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Self::Device(p) if p.is_null())
    }

    pub(crate) fn require(&self, arg: &'static str) -> Result<()> {
        if self.is_null() {
            return Err(Error::invalid_pointer(arg));
        }
        Ok(())
    }
}

/// Source of a scalar coefficient such as `alpha` or `beta`
#[derive(Debug)]
pub enum ScalarArg<'a, T> {
    /// Value in host memory
    Host(&'a T),
    /// Value in device memory, read by the kernel that consumes it
    Device(DevicePtr<'a, T>),
}

impl<T> Clone for ScalarArg<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScalarArg<'_, T> {}

impl<T> ScalarArg<'_, T> {
    /// Pointer mode implied by the source
    pub fn mode(&self) -> PointerMode {
        match self {
            Self::Host(_) => PointerMode::Host,
            Self::Device(_) => PointerMode::Device,
        }
    }

    pub(crate) fn require(&self, arg: &'static str) -> Result<()> {
        match self {
            Self::Device(p) if p.is_null() => Err(Error::invalid_pointer(arg)),
            _ => Ok(()),
        }
    }
}
