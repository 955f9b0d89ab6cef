//! Device kernels
//!
//! Each function here enqueues one or more launches on a runtime client and
//! is `unsafe`: callers guarantee that every [`DevicePtr`] argument addresses
//! enough live device memory for the sizes passed alongside it. Argument
//! validation, scratch management and result delivery live in the calling
//! operation, never in the kernel.
//!
//! Kernel bodies run once per work group and iterate their lanes explicitly,
//! so group-cooperative steps (shared-memory reductions, segment sums) appear
//! as ordinary loops over a group-local array.

pub(crate) mod bsr;
pub(crate) mod compress;
pub(crate) mod csr2csc;
pub(crate) mod dense;
pub(crate) mod geam;
pub(crate) mod hyb;
pub(crate) mod reduce;
pub(crate) mod scan;

use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Lanes per group for element-wise and per-row kernels
pub(crate) const BLOCK_SIZE: usize = 256;

/// Device arrays of a compressed (CSR, CSC or BSR) matrix
///
/// `ptr` holds outer offsets, `ind` inner indices, both shifted by `base`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct CsxView<'a, T> {
    pub ptr: DevicePtr<'a, i32>,
    pub ind: DevicePtr<'a, i32>,
    pub val: DevicePtr<'a, T>,
    pub base: i32,
}

impl<T> CsxView<'_, T> {
    /// Zero-based `[start, end)` range of outer entry `i`
    ///
    /// # Safety
    ///
    /// `ptr` must address at least `i + 2` elements.
    #[inline]
    pub unsafe fn range(&self, i: usize) -> std::ops::Range<usize> {
        let start = unsafe { self.ptr.read(i) } - self.base;
        let end = unsafe { self.ptr.read(i + 1) } - self.base;
        ix(start)..ix(end)
    }
}

/// Device index to host offset
///
/// Negative values wrap to huge offsets and fault on access.
#[inline(always)]
pub(crate) fn ix(v: i32) -> usize {
    v as usize
}

/// Set `dst[..len]` to `value`
///
/// # Safety
///
/// `dst` must address at least `len` writable elements.
pub(crate) unsafe fn fill<R: Runtime, T: Copy + Send + Sync>(
    client: &R::Client,
    dst: DevicePtr<T>,
    len: usize,
    value: T,
) -> Result<()> {
    client.launch(
        "fill",
        LaunchConfig::for_items(len, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let gid = idx.global_id(tid);
                if gid >= len {
                    break;
                }
                unsafe { dst.write(gid, value) };
            }
        },
    )
}

/// Write `counts[i]` to `ptr[i + 1]` and `base` to `ptr[0]`, preparing `ptr`
/// for an in-place inclusive scan into an offset array
///
/// # Safety
///
/// `counts` must address `len` elements and `ptr` `len + 1`.
pub(crate) unsafe fn shift_counts<R: Runtime>(
    client: &R::Client,
    counts: DevicePtr<i32>,
    ptr: DevicePtr<i32>,
    len: usize,
    base: i32,
) -> Result<()> {
    client.launch(
        "shift_counts",
        LaunchConfig::for_items(len + 1, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let gid = idx.global_id(tid);
                if gid > len {
                    break;
                }
                let value = if gid == 0 {
                    base
                } else {
                    unsafe { counts.read(gid - 1) }
                };
                unsafe { ptr.write(gid, value) };
            }
        },
    )
}

/// Index of the first element of sorted `keys[..len]` not less than `value`
///
/// # Safety
///
/// `keys` must address `len` readable elements.
#[inline]
pub(crate) unsafe fn lower_bound(keys: DevicePtr<i32>, len: usize, value: i32) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if unsafe { keys.read(mid) } < value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
