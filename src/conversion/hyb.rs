//! CSR <-> HYB conversion
//!
//! A HYB matrix stores the first `ell_width` entries of every row in an ELL
//! part and the rest in a row-sorted COO part. Both parts use the index base
//! of the descriptor they were created with.

use crate::descr::{HybPartition, IndexBase, MatDescr};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::{Handle, align_up};
use crate::kernels::hyb::{self, CooView, EllView};
use crate::kernels::{self, CsxView};
use crate::primitives::{
    max_in_lease, read_total, reduce_scratch_bytes, scan_in_lease, scan_scratch_bytes,
};
use crate::runtime::{DeviceBuffer, DevicePtr, Runtime};

/// Sparse matrix in hybrid ELL + COO storage
pub struct HybMatrix<R: Runtime, T: Element> {
    m: i32,
    n: i32,
    nnz: i32,
    index_base: IndexBase,
    partition: HybPartition,
    ell_width: i32,
    ell_col_ind: DeviceBuffer<R, i32>,
    ell_val: DeviceBuffer<R, T>,
    coo_nnz: i32,
    coo_row_ind: DeviceBuffer<R, i32>,
    coo_col_ind: DeviceBuffer<R, i32>,
    coo_val: DeviceBuffer<R, T>,
}

impl<R: Runtime, T: Element> HybMatrix<R, T> {
    fn empty(
        client: &R::Client,
        m: i32,
        n: i32,
        index_base: IndexBase,
        partition: HybPartition,
    ) -> Result<Self> {
        Ok(Self {
            m,
            n,
            nnz: 0,
            index_base,
            partition,
            ell_width: 0,
            ell_col_ind: DeviceBuffer::zeros(client, 0)?,
            ell_val: DeviceBuffer::zeros(client, 0)?,
            coo_nnz: 0,
            coo_row_ind: DeviceBuffer::zeros(client, 0)?,
            coo_col_ind: DeviceBuffer::zeros(client, 0)?,
            coo_val: DeviceBuffer::zeros(client, 0)?,
        })
    }

    /// Number of rows
    pub fn m(&self) -> i32 {
        self.m
    }

    /// Number of columns
    pub fn n(&self) -> i32 {
        self.n
    }

    /// Number of stored entries (ELL padding excluded); the size of the CSR
    /// arrays [`hyb2csr`] needs
    pub fn nnz(&self) -> i32 {
        self.nnz
    }

    /// Index base of the stored column and row indices
    pub fn index_base(&self) -> IndexBase {
        self.index_base
    }

    /// Partition this matrix was created with
    pub fn partition(&self) -> HybPartition {
        self.partition
    }

    /// Slots per row in the ELL part
    pub fn ell_width(&self) -> i32 {
        self.ell_width
    }

    /// Entries in the COO part
    pub fn coo_nnz(&self) -> i32 {
        self.coo_nnz
    }

    /// ELL column indices, column-major `m x ell_width`, padding is `-1`
    pub fn ell_col_ind(&self) -> DevicePtr<'_, i32> {
        self.ell_col_ind.ptr()
    }

    /// ELL values, same layout as [`HybMatrix::ell_col_ind`]
    pub fn ell_val(&self) -> DevicePtr<'_, T> {
        self.ell_val.ptr()
    }

    /// COO row indices (ascending)
    pub fn coo_row_ind(&self) -> DevicePtr<'_, i32> {
        self.coo_row_ind.ptr()
    }

    /// COO column indices
    pub fn coo_col_ind(&self) -> DevicePtr<'_, i32> {
        self.coo_col_ind.ptr()
    }

    /// COO values
    pub fn coo_val(&self) -> DevicePtr<'_, T> {
        self.coo_val.ptr()
    }

    fn ell_view(&self) -> EllView<'_, T> {
        EllView {
            width: self.ell_width as usize,
            col_ind: self.ell_col_ind.ptr(),
            val: self.ell_val.ptr(),
        }
    }

    fn coo_view(&self) -> CooView<'_, T> {
        CooView {
            nnz: self.coo_nnz as usize,
            row_ind: self.coo_row_ind.ptr(),
            col_ind: self.coo_col_ind.ptr(),
            val: self.coo_val.ptr(),
        }
    }
}

impl<R: Runtime, T: Element> std::fmt::Debug for HybMatrix<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybMatrix")
            .field("m", &self.m)
            .field("n", &self.n)
            .field("nnz", &self.nnz)
            .field("index_base", &self.index_base)
            .field("partition", &self.partition)
            .field("ell_width", &self.ell_width)
            .field("coo_nnz", &self.coo_nnz)
            .finish()
    }
}

/// Convert a CSR matrix to HYB
///
/// The ELL width is chosen by `partition`: `Auto` takes the mean row length
/// rounded up, `Max` the longest row (leaving the COO part empty) and `User`
/// takes `user_ell_width`, which may not exceed `ceil(2 * nnz / m)`.
#[allow(clippy::too_many_arguments)]
pub fn csr2hyb<R: Runtime, T: Element>(
    handle: &Handle<R>,
    m: i32,
    n: i32,
    descr: &MatDescr,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
    user_ell_width: i32,
    partition: HybPartition,
) -> Result<HybMatrix<R, T>> {
    log::trace!(
        "csr2hyb<{}>: m={m} n={n} user_ell_width={user_ell_width} partition={partition:?}",
        T::DTYPE
    );
    let m_ = Error::check_size("m", m)?;
    Error::check_size("n", n)?;
    if partition == HybPartition::User && user_ell_width < 0 {
        return Err(Error::invalid_size("user_ell_width", user_ell_width));
    }
    let client = handle.client();
    if m == 0 || n == 0 {
        return HybMatrix::empty(client, m, n, descr.index_base, partition);
    }

    csr_val.require("csr_val")?;
    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    descr.require_general()?;
    csr_row_ptr.require_len(m_ + 1, "csr_row_ptr")?;

    let base = descr.base();
    let nnz = read_total(handle, csr_row_ptr, m_, base)?;

    // counts | offsets | reduction and scan work space
    let offsets_at = align_up(m_ * size_of::<i32>());
    let work_at = offsets_at + align_up((m_ + 1) * size_of::<i32>());
    let work_bytes = reduce_scratch_bytes(m_).max(scan_scratch_bytes(m_ + 1));
    let lease = handle.scratch(work_at + work_bytes)?;
    let counts = lease.view::<i32>(0, m_);
    let offsets = lease.view::<i32>(offsets_at, m_ + 1);

    let width = match partition {
        HybPartition::Auto => (nnz + m - 1) / m,
        HybPartition::Max => {
            // SAFETY: row pointer validated above; counts holds m slots
            unsafe {
                hyb::map_row_lengths::<R>(client, m_, csr_row_ptr, counts, hyb::row_length, 0)?
            };
            max_in_lease(handle, &lease, work_at, m_, counts)?
        }
        HybPartition::User => {
            let max_width = (2 * i64::from(nnz) + i64::from(m) - 1) / i64::from(m);
            if i64::from(user_ell_width) > max_width {
                return Err(Error::invalid_value(
                    "user_ell_width",
                    format!("{user_ell_width} exceeds {max_width}"),
                ));
            }
            user_ell_width
        }
    };
    let w = width as usize;
    log::debug!("csr2hyb: nnz={nnz} ell_width={width} ({partition:?})");

    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: csr_val,
        base,
    };
    let ell_col_ind = DeviceBuffer::<R, i32>::zeros(client, m_ * w)?;
    let ell_val = DeviceBuffer::<R, T>::zeros(client, m_ * w)?;
    let ell = EllView {
        width: w,
        col_ind: ell_col_ind.ptr(),
        val: ell_val.ptr(),
    };
    // SAFETY: ELL buffers hold m * width slots; counts and offsets lie in the lease
    unsafe {
        hyb::csr2ell::<R, T>(client, m_, csr, ell)?;
        hyb::map_row_lengths::<R>(client, m_, csr_row_ptr, counts, hyb::ell_overflow, width)?;
        kernels::shift_counts::<R>(client, counts, offsets, m_, 0)?;
    }
    scan_in_lease(handle, &lease, work_at, m_ + 1, offsets)?;
    let coo_nnz = read_total(handle, offsets, m_, 0)?;

    let coo_len = coo_nnz as usize;
    let coo_row_ind = DeviceBuffer::<R, i32>::zeros(client, coo_len)?;
    let coo_col_ind = DeviceBuffer::<R, i32>::zeros(client, coo_len)?;
    let coo_val = DeviceBuffer::<R, T>::zeros(client, coo_len)?;
    let coo = CooView {
        nnz: coo_len,
        row_ind: coo_row_ind.ptr(),
        col_ind: coo_col_ind.ptr(),
        val: coo_val.ptr(),
    };
    // SAFETY: COO buffers were sized from offsets[m]
    unsafe { hyb::csr2coo_overflow::<R, T>(client, m_, w, csr, offsets, coo)? };

    Ok(HybMatrix {
        m,
        n,
        nnz,
        index_base: descr.index_base,
        partition,
        ell_width: width,
        ell_col_ind,
        ell_val,
        coo_nnz,
        coo_row_ind,
        coo_col_ind,
        coo_val,
    })
}

/// Convert a HYB matrix to CSR
///
/// `csr_row_ptr` receives `m + 1` offsets; `csr_col_ind` and `csr_val` must
/// hold [`HybMatrix::nnz`] elements. Each row lists its ELL entries followed
/// by its COO entries. `descr` must carry the index base the HYB matrix was
/// created with.
pub fn hyb2csr<R: Runtime, T: Element>(
    handle: &Handle<R>,
    descr: &MatDescr,
    hyb: &HybMatrix<R, T>,
    csr_val: DevicePtr<T>,
    csr_row_ptr: DevicePtr<i32>,
    csr_col_ind: DevicePtr<i32>,
) -> Result<()> {
    log::trace!(
        "hyb2csr<{}>: m={} n={} ell_width={} coo_nnz={}",
        T::DTYPE,
        hyb.m,
        hyb.n,
        hyb.ell_width,
        hyb.coo_nnz
    );
    if hyb.m == 0 || hyb.n == 0 {
        return Ok(());
    }

    csr_val.require("csr_val")?;
    csr_row_ptr.require("csr_row_ptr")?;
    csr_col_ind.require("csr_col_ind")?;
    descr.require_general()?;
    if descr.index_base != hyb.index_base {
        return Err(Error::invalid_value(
            "descr",
            format!(
                "index base {:?} does not match the HYB matrix ({:?})",
                descr.index_base, hyb.index_base
            ),
        ));
    }

    let m = hyb.m as usize;
    csr_row_ptr.require_len(m + 1, "csr_row_ptr")?;
    csr_col_ind.require_len(hyb.nnz as usize, "csr_col_ind")?;
    csr_val.require_len(hyb.nnz as usize, "csr_val")?;

    let client = handle.client();
    let base = descr.base();
    let work_at = align_up(m * size_of::<i32>());
    let lease = handle.scratch(work_at + scan_scratch_bytes(m + 1))?;
    let counts = lease.view::<i32>(0, m);
    let csr = CsxView {
        ptr: csr_row_ptr,
        ind: csr_col_ind,
        val: csr_val,
        base,
    };
    // SAFETY: the HYB buffers are owned by `hyb` and sized for its shape;
    // CSR arrays were length-checked above
    unsafe {
        hyb::hyb_row_counts::<R, T>(client, m, base, hyb.ell_view(), hyb.coo_view(), counts)?;
        kernels::shift_counts::<R>(client, counts, csr_row_ptr, m, base)?;
    }
    scan_in_lease(handle, &lease, work_at, m + 1, csr_row_ptr)?;
    // SAFETY: as above, with the row pointer now built
    unsafe { hyb::hyb2csr_fill::<R, T>(client, m, hyb.ell_view(), hyb.coo_view(), csr) }
}
