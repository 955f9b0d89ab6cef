//! # spmx
//!
//! **Sparse matrix format conversion and addition on compute devices.**
//!
//! spmx converts between sparse storage formats (CSR, CSC, BSR, HYB, dense)
//! and adds sparse matrices, with every kernel expressed as a launch over
//! work groups of a [`Runtime`](runtime::Runtime). The CPU runtime runs
//! groups in parallel with rayon.
//!
//! ## Two-phase protocol
//!
//! Operations whose output size depends on the data come in pairs: a
//! counting call builds the output offset array and reports the entry count,
//! the caller allocates the entry arrays, and a filling call writes them.
//!
//! ```rust,ignore
//! use spmx::prelude::*;
//!
//! let client = CpuRuntime::default_client(&CpuDevice::new());
//! let handle = Handle::<CpuRuntime>::new(client)?;
//!
//! let mut nnzb = 0;
//! csr2bsr_nnz(&handle, Direction::Row, m, n, &descr, row_ptr, col_ind,
//!             2, &descr, bsr_row_ptr.ptr(), ResultSink::Host(&mut nnzb))?;
//! // allocate nnzb block columns and nnzb * 4 values, then
//! csr2bsr(&handle, Direction::Row, m, n, &descr, val, row_ptr, col_ind,
//!         2, &descr, bsr_val.ptr(), bsr_row_ptr.ptr(), bsr_col_ind.ptr())?;
//! ```
//!
//! Scalar results go to a [`ResultSink`](descr::ResultSink): host memory,
//! written before the call returns, or device memory, written by device work
//! and readable after synchronization.
//!
//! ## Feature Flags
//!
//! - `rayon` (default): run work groups on multiple threads

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conversion;
pub mod descr;
pub mod dtype;
pub mod error;
pub mod geam;
pub mod handle;
pub(crate) mod kernels;
pub mod primitives;
pub mod reference;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conversion::*;
    pub use crate::descr::{
        Action, Direction, HybPartition, IndexBase, MatDescr, MatrixType, PointerMode,
        ResultSink, ScalarArg,
    };
    pub use crate::dtype::{Complex64, Complex128, DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::geam::{csrgeam, csrgeam_nnz};
    pub use crate::handle::{Handle, HandleConfig};
    pub use crate::primitives::{inclusive_scan, reduce_max, reduce_sum};
    pub use crate::runtime::cpu::{CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, DeviceBuffer, DevicePtr, Runtime, RuntimeClient};
}
