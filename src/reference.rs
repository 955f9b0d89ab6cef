//! Host reference implementations
//!
//! Straightforward sequential versions of every device operation, used by the
//! test suites as oracles. Index arrays produced here must match device
//! output exactly; values are compared within a tolerance.

use crate::descr::{Direction, HybPartition};
use crate::dtype::Element;
use crate::error::{Error, Result};

/// CSR matrix in host memory
#[derive(Clone, Debug, PartialEq)]
pub struct HostCsr<T> {
    /// Rows
    pub m: usize,
    /// Columns
    pub n: usize,
    /// Index base of `row_ptr` and `col_ind`
    pub base: i32,
    /// `m + 1` offsets
    pub row_ptr: Vec<i32>,
    /// Column of every entry
    pub col_ind: Vec<i32>,
    /// Value of every entry
    pub val: Vec<T>,
}

impl<T: Element> HostCsr<T> {
    /// Assemble a CSR matrix, checking array lengths and index ranges
    pub fn new(
        m: usize,
        n: usize,
        base: i32,
        row_ptr: Vec<i32>,
        col_ind: Vec<i32>,
        val: Vec<T>,
    ) -> Result<Self> {
        if row_ptr.len() != m + 1 {
            return Err(Error::invalid_size("row_ptr", row_ptr.len() as i64));
        }
        let nnz = (row_ptr[m] - row_ptr[0]) as usize;
        if col_ind.len() != nnz || val.len() != nnz {
            return Err(Error::invalid_size("col_ind", col_ind.len() as i64));
        }
        if let Some(&c) = col_ind.iter().find(|&&c| c < base || c - base >= n as i32) {
            return Err(Error::invalid_value("col_ind", format!("column {c} out of range")));
        }
        Ok(Self {
            m,
            n,
            base,
            row_ptr,
            col_ind,
            val,
        })
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.col_ind.len()
    }

    /// Zero-based entry range of row `i`
    pub fn row(&self, i: usize) -> std::ops::Range<usize> {
        (self.row_ptr[i] - self.base) as usize..(self.row_ptr[i + 1] - self.base) as usize
    }

    /// Same matrix with a different index base
    pub fn rebase(&self, base: i32) -> Self {
        let shift = base - self.base;
        Self {
            m: self.m,
            n: self.n,
            base,
            row_ptr: self.row_ptr.iter().map(|&p| p + shift).collect(),
            col_ind: self.col_ind.iter().map(|&c| c + shift).collect(),
            val: self.val.clone(),
        }
    }

    /// Entries `!= 0` of a column-major dense matrix, rows in order
    pub fn from_dense(m: usize, n: usize, a: &[T], ld: usize, base: i32) -> Self {
        let mut row_ptr = vec![base];
        let mut col_ind = Vec::new();
        let mut val = Vec::new();
        for i in 0..m {
            for j in 0..n {
                let v = a[i + j * ld];
                if !v.is_zero() {
                    col_ind.push(j as i32 + base);
                    val.push(v);
                }
            }
            row_ptr.push(col_ind.len() as i32 + base);
        }
        Self {
            m,
            n,
            base,
            row_ptr,
            col_ind,
            val,
        }
    }

    /// Scatter into a column-major `ld x n` array; rows `m..ld` are left as
    /// given in `out`
    pub fn write_dense(&self, out: &mut [T], ld: usize) {
        for j in 0..self.n {
            for i in 0..self.m {
                out[i + j * ld] = T::zero();
            }
        }
        for i in 0..self.m {
            for k in self.row(i) {
                let j = (self.col_ind[k] - self.base) as usize;
                out[i + j * ld] = self.val[k];
            }
        }
    }

    /// Column-major dense copy with `ld = m`
    pub fn to_dense(&self) -> Vec<T> {
        let mut out = vec![T::zero(); self.m * self.n];
        self.write_dense(&mut out, self.m.max(1));
        out
    }

    /// The transpose in CSR form, which is this matrix in CSC form
    ///
    /// Entries within each output row keep their source row order, so the
    /// result is sorted whenever `self` is.
    pub fn transpose(&self, base: i32) -> Self {
        let mut counts = vec![0i32; self.n];
        for &c in &self.col_ind {
            counts[(c - self.base) as usize] += 1;
        }
        let mut row_ptr = Vec::with_capacity(self.n + 1);
        row_ptr.push(base);
        for c in &counts {
            row_ptr.push(row_ptr[row_ptr.len() - 1] + c);
        }
        let mut next: Vec<usize> = row_ptr[..self.n].iter().map(|&p| (p - base) as usize).collect();
        let mut col_ind = vec![0; self.nnz()];
        let mut val = vec![T::zero(); self.nnz()];
        for i in 0..self.m {
            for k in self.row(i) {
                let j = (self.col_ind[k] - self.base) as usize;
                col_ind[next[j]] = i as i32 + base;
                val[next[j]] = self.val[k];
                next[j] += 1;
            }
        }
        Self {
            m: self.n,
            n: self.m,
            base,
            row_ptr,
            col_ind,
            val,
        }
    }
}

/// Per-row (`Direction::Row`) or per-column counts of entries `!= 0` of a
/// column-major dense matrix
pub fn dense_nnz<T: Element>(dir: Direction, m: usize, n: usize, a: &[T], ld: usize) -> Vec<i32> {
    let count = |i: usize, j: usize| i32::from(!a[i + j * ld].is_zero());
    match dir {
        Direction::Row => (0..m).map(|i| (0..n).map(|j| count(i, j)).sum()).collect(),
        Direction::Column => (0..n).map(|j| (0..m).map(|i| count(i, j)).sum()).collect(),
    }
}

/// BSR matrix in host memory
#[derive(Clone, Debug, PartialEq)]
pub struct HostBsr<T> {
    /// Block rows
    pub mb: usize,
    /// Block columns
    pub nb: usize,
    /// Edge length of a block
    pub block_dim: usize,
    /// Layout of values inside a block
    pub dir: Direction,
    /// Index base
    pub base: i32,
    /// `mb + 1` offsets
    pub row_ptr: Vec<i32>,
    /// Block column of every block
    pub col_ind: Vec<i32>,
    /// `block_dim * block_dim` values per block
    pub val: Vec<T>,
}

fn in_block(dir: Direction, r: usize, c: usize, dim: usize) -> usize {
    match dir {
        Direction::Row => r * dim + c,
        Direction::Column => c * dim + r,
    }
}

/// Block a CSR matrix into `block_dim x block_dim` tiles
pub fn csr2bsr<T: Element>(
    csr: &HostCsr<T>,
    dir: Direction,
    block_dim: usize,
    base: i32,
) -> HostBsr<T> {
    let mb = csr.m.div_ceil(block_dim);
    let nb = csr.n.div_ceil(block_dim);
    let bs = block_dim * block_dim;
    let mut row_ptr = vec![base];
    let mut col_ind = Vec::new();
    let mut val = Vec::new();
    for br in 0..mb {
        let rows = br * block_dim..((br + 1) * block_dim).min(csr.m);
        let mut cols: Vec<i32> = rows
            .clone()
            .flat_map(|i| csr.row(i))
            .map(|k| (csr.col_ind[k] - csr.base) / block_dim as i32)
            .collect();
        cols.sort_unstable();
        cols.dedup();

        let first = val.len();
        val.resize(first + cols.len() * bs, T::zero());
        for i in rows {
            for k in csr.row(i) {
                let c = (csr.col_ind[k] - csr.base) as usize;
                let slot = cols.binary_search(&((c / block_dim) as i32)).unwrap_or(0);
                let at = first
                    + slot * bs
                    + in_block(dir, i % block_dim, c % block_dim, block_dim);
                val[at] = csr.val[k];
            }
        }
        col_ind.extend(cols.iter().map(|&c| c + base));
        row_ptr.push(col_ind.len() as i32 + base);
    }
    HostBsr {
        mb,
        nb,
        block_dim,
        dir,
        base,
        row_ptr,
        col_ind,
        val,
    }
}

/// Expand a BSR matrix; every block contributes all of its values
pub fn bsr2csr<T: Element>(bsr: &HostBsr<T>, base: i32) -> HostCsr<T> {
    let dim = bsr.block_dim;
    let bs = dim * dim;
    let mut row_ptr = vec![base];
    let mut col_ind = Vec::new();
    let mut val = Vec::new();
    for br in 0..bsr.mb {
        let blocks = (bsr.row_ptr[br] - bsr.base) as usize..(bsr.row_ptr[br + 1] - bsr.base) as usize;
        for r in 0..dim {
            for b in blocks.clone() {
                let bc = (bsr.col_ind[b] - bsr.base) as usize;
                for c in 0..dim {
                    col_ind.push((bc * dim + c) as i32 + base);
                    val.push(bsr.val[b * bs + in_block(bsr.dir, r, c, dim)]);
                }
            }
            row_ptr.push(col_ind.len() as i32 + base);
        }
    }
    HostCsr {
        m: bsr.mb * dim,
        n: bsr.nb * dim,
        base,
        row_ptr,
        col_ind,
        val,
    }
}

/// HYB matrix in host memory
#[derive(Clone, Debug, PartialEq)]
pub struct HostHyb<T> {
    /// ELL slots per row
    pub ell_width: usize,
    /// Column-major `m x ell_width`, padding `-1`
    pub ell_col_ind: Vec<i32>,
    /// ELL values, zero in padding slots
    pub ell_val: Vec<T>,
    /// COO rows, ascending
    pub coo_row_ind: Vec<i32>,
    /// COO columns
    pub coo_col_ind: Vec<i32>,
    /// COO values
    pub coo_val: Vec<T>,
}

/// ELL width chosen for `partition`; `None` if a user width is out of range
pub fn ell_width<T: Element>(
    csr: &HostCsr<T>,
    partition: HybPartition,
    user_ell_width: i32,
) -> Option<usize> {
    if csr.m == 0 {
        return Some(0);
    }
    let nnz = csr.nnz();
    match partition {
        HybPartition::Auto => Some(nnz.div_ceil(csr.m)),
        HybPartition::Max => Some((0..csr.m).map(|i| csr.row(i).len()).max().unwrap_or(0)),
        HybPartition::User => {
            let w = usize::try_from(user_ell_width).ok()?;
            (w <= (2 * nnz).div_ceil(csr.m)).then_some(w)
        }
    }
}

/// Split a CSR matrix into ELL and COO parts of the given width
pub fn csr2hyb<T: Element>(csr: &HostCsr<T>, ell_width: usize) -> HostHyb<T> {
    let m = csr.m;
    let mut hyb = HostHyb {
        ell_width,
        ell_col_ind: vec![-1; m * ell_width],
        ell_val: vec![T::zero(); m * ell_width],
        coo_row_ind: Vec::new(),
        coo_col_ind: Vec::new(),
        coo_val: Vec::new(),
    };
    for i in 0..m {
        for (k, j) in csr.row(i).enumerate() {
            if k < ell_width {
                hyb.ell_col_ind[i + k * m] = csr.col_ind[j];
                hyb.ell_val[i + k * m] = csr.val[j];
            } else {
                hyb.coo_row_ind.push(i as i32 + csr.base);
                hyb.coo_col_ind.push(csr.col_ind[j]);
                hyb.coo_val.push(csr.val[j]);
            }
        }
    }
    hyb
}

/// Entries of each row whose magnitude exceeds `tol`
pub fn nnz_compress<T: Element>(csr: &HostCsr<T>, tol: f64) -> Vec<i32> {
    (0..csr.m)
        .map(|i| csr.row(i).filter(|&k| csr.val[k].magnitude() > tol).count() as i32)
        .collect()
}

/// Drop entries of magnitude at most `tol`
pub fn compress<T: Element>(csr: &HostCsr<T>, tol: f64) -> HostCsr<T> {
    let mut row_ptr = vec![csr.base];
    let mut col_ind = Vec::new();
    let mut val = Vec::new();
    for i in 0..csr.m {
        for k in csr.row(i) {
            if csr.val[k].magnitude() > tol {
                col_ind.push(csr.col_ind[k]);
                val.push(csr.val[k]);
            }
        }
        row_ptr.push(col_ind.len() as i32 + csr.base);
    }
    HostCsr {
        m: csr.m,
        n: csr.n,
        base: csr.base,
        row_ptr,
        col_ind,
        val,
    }
}

/// `alpha * A + beta * B` on the union structure, in index base `base`
pub fn csrgeam<T: Element>(
    alpha: T,
    a: &HostCsr<T>,
    beta: T,
    b: &HostCsr<T>,
    base: i32,
) -> HostCsr<T> {
    let mut row_ptr = vec![base];
    let mut col_ind = Vec::new();
    let mut val = Vec::new();
    for i in 0..a.m {
        let (mut ka, ea) = (a.row(i).start, a.row(i).end);
        let (mut kb, eb) = (b.row(i).start, b.row(i).end);
        while ka < ea || kb < eb {
            let ca = (ka < ea).then(|| a.col_ind[ka] - a.base);
            let cb = (kb < eb).then(|| b.col_ind[kb] - b.base);
            let (col, value) = match (ca, cb) {
                (Some(x), Some(y)) if x == y => {
                    let v = alpha * a.val[ka] + beta * b.val[kb];
                    ka += 1;
                    kb += 1;
                    (x, v)
                }
                (Some(x), Some(y)) if x > y => {
                    kb += 1;
                    (y, beta * b.val[kb - 1])
                }
                (None, Some(y)) => {
                    kb += 1;
                    (y, beta * b.val[kb - 1])
                }
                (Some(x), _) => {
                    ka += 1;
                    (x, alpha * a.val[ka - 1])
                }
                (None, None) => break,
            };
            col_ind.push(col + base);
            val.push(value);
        }
        row_ptr.push(col_ind.len() as i32 + base);
    }
    HostCsr {
        m: a.m,
        n: a.n,
        base,
        row_ptr,
        col_ind,
        val,
    }
}
