//! Tolerance compression kernels
//!
//! Counting assigns every row to a segment of `SEG` cooperating lanes. The
//! lanes of a segment stride over the row, then fold their partial counts
//! with a butterfly reduction. Narrow segments suit short rows, wide ones
//! long rows; [`select_segment_width`] picks the width from the mean row
//! length.

use super::{BLOCK_SIZE, CsxView, ix};
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{DevicePtr, LaunchConfig, Runtime, RuntimeClient};

/// Lanes per counting group
pub(crate) const COMPRESS_BLOCK: usize = 1024;

/// Segment width for a mean of `mean_nnz_per_row` entries per row
///
/// Buckets are powers of two from 2 up to the wavefront width; a mean below
/// `2w` selects width `w`.
pub(crate) fn select_segment_width(mean_nnz_per_row: i32, wavefront_size: usize) -> usize {
    let limit = if wavefront_size == 32 { 32 } else { 64 };
    let mut width = 2;
    while width < limit && mean_nnz_per_row >= 2 * width as i32 {
        width *= 2;
    }
    width
}

/// Count entries with magnitude above `tol` in every row
///
/// # Safety
///
/// `row_ptr` must address `m + 1` elements, `val` every entry and
/// `nnz_per_row` `m` elements.
unsafe fn count_segmented<R: Runtime, T: Element, const SEG: usize>(
    client: &R::Client,
    m: usize,
    base: i32,
    val: DevicePtr<T>,
    row_ptr: DevicePtr<i32>,
    nnz_per_row: DevicePtr<i32>,
    tol: f64,
) -> Result<()> {
    let segments_per_block = COMPRESS_BLOCK / SEG;
    let config = LaunchConfig::for_groups(m, segments_per_block, COMPRESS_BLOCK);
    client.launch("nnz_compress", config, &|idx| {
        for segment in 0..segments_per_block {
            let row = idx.block_id * segments_per_block + segment;
            if row >= m {
                break;
            }
            let start = ix(unsafe { row_ptr.read(row) } - base);
            let end = ix(unsafe { row_ptr.read(row + 1) } - base);

            let mut partial = [0i32; SEG];
            for (lane, count) in partial.iter_mut().enumerate() {
                let mut j = start + lane;
                while j < end {
                    if unsafe { val.read(j) }.magnitude() > tol {
                        *count += 1;
                    }
                    j += SEG;
                }
            }

            let mut stride = SEG / 2;
            while stride > 0 {
                for lane in 0..stride {
                    partial[lane] += partial[lane + stride];
                }
                stride /= 2;
            }
            unsafe { nnz_per_row.write(row, partial[0]) };
        }
    })
}

/// Per-row surviving entry counts, dispatched on segment width
///
/// # Safety
///
/// As `count_segmented`.
#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn nnz_compress<R: Runtime, T: Element>(
    client: &R::Client,
    segment_width: usize,
    m: usize,
    base: i32,
    val: DevicePtr<T>,
    row_ptr: DevicePtr<i32>,
    nnz_per_row: DevicePtr<i32>,
    tol: f64,
) -> Result<()> {
    unsafe {
        match segment_width {
            2 => count_segmented::<R, T, 2>(client, m, base, val, row_ptr, nnz_per_row, tol),
            4 => count_segmented::<R, T, 4>(client, m, base, val, row_ptr, nnz_per_row, tol),
            8 => count_segmented::<R, T, 8>(client, m, base, val, row_ptr, nnz_per_row, tol),
            16 => count_segmented::<R, T, 16>(client, m, base, val, row_ptr, nnz_per_row, tol),
            32 => count_segmented::<R, T, 32>(client, m, base, val, row_ptr, nnz_per_row, tol),
            _ => count_segmented::<R, T, 64>(client, m, base, val, row_ptr, nnz_per_row, tol),
        }
    }
}

/// Copy the surviving entries of every row, in order, into `c`
///
/// # Safety
///
/// `a` must describe `m` rows; `c.ptr` must hold offsets built from the
/// counts of [`nnz_compress`] with the same tolerance.
pub(crate) unsafe fn compress_fill<R: Runtime, T: Element>(
    client: &R::Client,
    m: usize,
    a: CsxView<T>,
    c: CsxView<T>,
    tol: f64,
) -> Result<()> {
    client.launch(
        "csr2csr_compress",
        LaunchConfig::for_items(m, BLOCK_SIZE),
        &|idx| {
            for tid in idx.lanes() {
                let row = idx.global_id(tid);
                if row >= m {
                    break;
                }
                let mut pos = ix(unsafe { c.ptr.read(row) } - c.base);
                for j in unsafe { a.range(row) } {
                    let value = unsafe { a.val.read(j) };
                    if value.magnitude() > tol {
                        unsafe {
                            c.ind.write(pos, a.ind.read(j) - a.base + c.base);
                            c.val.write(pos, value);
                        }
                        pos += 1;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_width_wavefront_32() {
        let cases = [(0, 2), (3, 2), (4, 4), (7, 4), (8, 8), (15, 8), (16, 16), (31, 16)];
        for (mean, width) in cases {
            assert_eq!(select_segment_width(mean, 32), width, "mean {mean}");
        }
        assert_eq!(select_segment_width(32, 32), 32);
        assert_eq!(select_segment_width(1000, 32), 32);
    }

    #[test]
    fn test_segment_width_wavefront_64() {
        assert_eq!(select_segment_width(3, 64), 2);
        assert_eq!(select_segment_width(31, 64), 16);
        assert_eq!(select_segment_width(32, 64), 32);
        assert_eq!(select_segment_width(63, 64), 32);
        assert_eq!(select_segment_width(64, 64), 64);
        assert_eq!(select_segment_width(5000, 64), 64);
    }
}
