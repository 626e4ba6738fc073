//! Percentile weight pruning into CSR and the sparse x dense multiply.

use super::{for_each_chunk, simd};
use crate::error::{ConvError, Result};

/// Compressed-sparse-row matrix with separate row start/end offsets.
///
/// `row_end[r] == row_start[r + 1]`; column indices are unique and ascending
/// within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    row_start: Vec<usize>,
    row_end: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f32>,
}

impl CsrMatrix {
    pub fn new(
        rows: usize,
        cols: usize,
        row_start: Vec<usize>,
        row_end: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self> {
        if row_start.len() != rows || row_end.len() != rows {
            return Err(ConvError::ShapeMismatch(format!(
                "csr offsets {}/{} for {} rows",
                row_start.len(),
                row_end.len(),
                rows
            )));
        }
        if col_indices.len() != values.len() {
            return Err(ConvError::ShapeMismatch(format!(
                "csr has {} column indices but {} values",
                col_indices.len(),
                values.len()
            )));
        }
        let mut prev_end = 0;
        for r in 0..rows {
            let (s, e) = (row_start[r], row_end[r]);
            if s != prev_end || e < s || e > values.len() {
                return Err(ConvError::ShapeMismatch(format!(
                    "csr row {} spans {}..{} after {}",
                    r, s, e, prev_end
                )));
            }
            let row = &col_indices[s..e];
            if row.iter().any(|&c| c >= cols) || row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConvError::ShapeMismatch(format!(
                    "csr row {} has out-of-range or unsorted columns",
                    r
                )));
            }
            prev_end = e;
        }
        if prev_end != values.len() {
            return Err(ConvError::ShapeMismatch(format!(
                "csr rows cover {} of {} values",
                prev_end,
                values.len()
            )));
        }
        Ok(CsrMatrix {
            rows,
            cols,
            row_start,
            row_end,
            col_indices,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_start(&self) -> &[usize] {
        &self.row_start
    }

    pub fn row_end(&self) -> &[usize] {
        &self.row_end
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f32]) {
        let (s, e) = (self.row_start[r], self.row_end[r]);
        (&self.col_indices[s..e], &self.values[s..e])
    }

    /// Fraction of stored entries, 0.0 for an empty matrix.
    pub fn density(&self) -> f64 {
        let total = self.rows as f64 * self.cols as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.nnz() as f64 / total
    }

    /// Expands back into a dense row-major `rows x cols` buffer.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0f32; self.rows * self.cols];
        for r in 0..self.rows {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals.iter()) {
                dense[r * self.cols + c] = v;
            }
        }
        dense
    }
}

/// Drops each row's entries at or below a per-row percentile threshold.
///
/// The threshold of a row with `cols` entries is the `d`-th smallest value,
/// `d = ceil(percentile / 100 * cols)`; only entries strictly greater than it
/// survive, so ties at the threshold are always dropped. `d == 0` keeps the
/// whole row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSparsifier {
    percentile: f32,
}

impl WeightSparsifier {
    pub fn new(percentile: f32) -> Result<Self> {
        if !(0.0..=100.0).contains(&percentile) {
            return Err(ConvError::InvalidPercentile(percentile));
        }
        Ok(WeightSparsifier { percentile })
    }

    pub fn percentile(&self) -> f32 {
        self.percentile
    }

    /// Pruning fraction in `[0, 1]`, as printed in benchmark records.
    pub fn fraction(&self) -> f32 {
        self.percentile / 100.0
    }

    /// Number of smallest entries the threshold accounts for in a row of `len`.
    fn drop_count(&self, len: usize) -> usize {
        // 0.1% of 1000 must be exactly 1, not ceil(1.0000000149)
        let exact = self.percentile as f64 * len as f64 / 100.0;
        let d = ((exact * 1e6).round() / 1e6).ceil() as usize;
        d.min(len)
    }

    /// Threshold of one row; `None` when nothing is pruned.
    pub fn threshold(&self, row: &[f32]) -> Option<f32> {
        let d = self.drop_count(row.len());
        if d == 0 {
            return None;
        }
        let mut sorted = row.to_vec();
        sorted.sort_by(f32::total_cmp);
        Some(sorted[d - 1])
    }

    /// Prunes a dense row-major `rows x cols` weight matrix.
    pub fn prune(&self, weights: &[f32], rows: usize, cols: usize) -> Result<CsrMatrix> {
        if weights.len() != rows * cols {
            return Err(ConvError::ShapeMismatch(format!(
                "{} weights cannot form a {}x{} matrix",
                weights.len(),
                rows,
                cols
            )));
        }
        let mut row_start = Vec::with_capacity(rows);
        let mut row_end = Vec::with_capacity(rows);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        for r in 0..rows {
            let row = &weights[r * cols..(r + 1) * cols];
            row_start.push(values.len());
            let threshold = self.threshold(row);
            for (c, &v) in row.iter().enumerate() {
                let keep = match threshold {
                    Some(t) => v > t,
                    None => true,
                };
                if keep {
                    col_indices.push(c);
                    values.push(v);
                }
            }
            row_end.push(values.len());
        }
        Ok(CsrMatrix {
            rows,
            cols,
            row_start,
            row_end,
            col_indices,
            values,
        })
    }
}

/// Prunes `weights` (`rows x cols`, row-major) at `percentile`.
pub fn prune(weights: &[f32], rows: usize, cols: usize, percentile: f32) -> Result<CsrMatrix> {
    WeightSparsifier::new(percentile)?.prune(weights, rows, cols)
}

/// Sparse x dense multiply: `C = alpha * A * B + beta * C`.
///
/// `A` is `rows x cols` CSR, `B` is `cols x n` row-major with leading
/// dimension `ldb`, `C` is `rows x n` row-major with leading dimension `ldc`.
pub trait SparseMm: Send + Sync {
    fn name(&self) -> &str;

    #[allow(clippy::too_many_arguments)]
    fn spmm(
        &self,
        alpha: f32,
        a: &CsrMatrix,
        b: &[f32],
        ldb: usize,
        n: usize,
        beta: f32,
        c: &mut [f32],
        ldc: usize,
    );
}

/// Row-parallel CSR x dense multiply.
///
/// Each output element accumulates the stored entries of its row in
/// ascending column order, starting from zero when `beta == 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrSpmm;

impl SparseMm for CsrSpmm {
    fn name(&self) -> &str {
        "portable"
    }

    fn spmm(
        &self,
        alpha: f32,
        a: &CsrMatrix,
        b: &[f32],
        ldb: usize,
        n: usize,
        beta: f32,
        c: &mut [f32],
        ldc: usize,
    ) {
        let m = a.rows();
        if m == 0 || n == 0 {
            return;
        }
        assert!(ldc >= n && c.len() >= (m - 1) * ldc + n, "C dimensions mismatch");
        assert!(ldb >= n, "ldb {} < n {}", ldb, n);
        assert!(a.cols() == 0 || b.len() >= (a.cols() - 1) * ldb + n, "B dimensions mismatch");

        let kernel = |r: usize, c_row: &mut [f32]| {
            let c_row = &mut c_row[..n];
            simd::scale(c_row, beta);
            let (cols, vals) = a.row(r);
            for (&col, &v) in cols.iter().zip(vals.iter()) {
                let b_row = col * ldb;
                simd::axpy(c_row, &b[b_row..b_row + n], alpha * v);
            }
        };

        let rows = &mut c[..(m - 1) * ldc + n];
        if ldc == n {
            for_each_chunk(rows, ldc, kernel);
        } else {
            for r in 0..m {
                kernel(r, &mut rows[r * ldc..r * ldc + n]);
            }
        }
    }
}
