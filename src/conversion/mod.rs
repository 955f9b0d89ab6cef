//! Sparse format conversions
//!
//! Conversions whose output size depends on the input values follow a
//! two-call protocol: a counting call fills the output offset array and
//! reports the entry count through a [`ResultSink`](crate::descr::ResultSink);
//! the caller allocates index and value arrays of exactly that size and makes
//! the filling call with the same offset array.
//!
//! | count | fill |
//! |-------|------|
//! | [`csr2bsr_nnz`] | [`csr2bsr`] |
//! | [`nnz`] | [`dense2csr`], [`dense2csc`] |
//! | [`nnz_compress`] | [`csr2csr_compress`] |
//!
//! [`bsr2csr`], [`csr2dense`], [`csc2dense`] and [`csr2csc`] have output sizes
//! known up front and run in a single call. [`csr2hyb`] allocates its own
//! output; [`HybMatrix::nnz`] sizes the arrays for [`hyb2csr`].

mod bsr;
mod compress;
mod csr2csc;
mod dense;
mod hyb;

pub use bsr::{bsr2csr, csr2bsr, csr2bsr_nnz};
pub use compress::{csr2csr_compress, nnz_compress};
pub use csr2csc::csr2csc;
pub use dense::{csc2dense, csr2dense, dense2csc, dense2csr, nnz};
pub use hyb::{HybMatrix, csr2hyb, hyb2csr};
