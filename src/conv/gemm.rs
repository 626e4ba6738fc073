//! Row-major dense GEMM contract and a portable tiled implementation.
//!
//! `C = alpha * op(A) * op(B) + beta * C`, with `op(A)` of shape `m x k`,
//! `op(B)` of shape `k x n` and `C` of shape `m x n`, each addressed through
//! its leading dimension like a cblas row-major call.

use super::{for_each_chunk, simd};

const TILE: usize = 64;

/// Whether an operand is used as stored or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

/// Dense single-precision matrix multiply.
///
/// Any BLAS-like backend can sit behind this; the executors only depend on
/// the contract.
pub trait Gemm: Send + Sync {
    /// Short name printed in the implementation column of benchmark records.
    fn name(&self) -> &str;

    #[allow(clippy::too_many_arguments)]
    fn sgemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f32,
        a: &[f32],
        lda: usize,
        b: &[f32],
        ldb: usize,
        beta: f32,
        c: &mut [f32],
        ldc: usize,
    );
}

/// Cache-tiled GEMM, parallel over rows of `C`.
///
/// Each output element accumulates its `k` products in ascending `p`
/// starting from zero, whatever the tiling.
#[derive(Debug, Clone, Copy)]
pub struct TiledGemm {
    tile: usize,
}

impl TiledGemm {
    pub fn new(tile: usize) -> Self {
        TiledGemm { tile: tile.max(1) }
    }
}

impl Default for TiledGemm {
    fn default() -> Self {
        TiledGemm::new(TILE)
    }
}

impl Gemm for TiledGemm {
    fn name(&self) -> &str {
        "portable"
    }

    fn sgemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f32,
        a: &[f32],
        lda: usize,
        b: &[f32],
        ldb: usize,
        beta: f32,
        c: &mut [f32],
        ldc: usize,
    ) {
        if m == 0 || n == 0 {
            return;
        }
        assert!(ldc >= n, "ldc {} < n {}", ldc, n);
        assert!(c.len() >= (m - 1) * ldc + n, "C dimensions mismatch");
        let a_rows = if trans_a == Transpose::No { m } else { k };
        let b_rows = if trans_b == Transpose::No { k } else { n };
        assert!(k == 0 || a.len() >= (a_rows - 1) * lda + 1, "A dimensions mismatch");
        assert!(k == 0 || b.len() >= (b_rows - 1) * ldb + 1, "B dimensions mismatch");

        let tile = self.tile;
        let rows = &mut c[..m * ldc - (ldc - n)];
        if k == 0 {
            for i in 0..m {
                simd::scale(&mut rows[i * ldc..i * ldc + n], beta);
            }
            return;
        }
        let kernel = |i: usize, c_row: &mut [f32]| {
            let c_row = &mut c_row[..n];
            match trans_b {
                Transpose::No => {
                    // ikj: broadcast A(i, p) over the contiguous row p of B.
                    simd::scale(c_row, beta);
                    let mut pp = 0;
                    while pp < k {
                        let p_end = (pp + tile).min(k);
                        let mut jj = 0;
                        while jj < n {
                            let j_end = (jj + tile).min(n);
                            for p in pp..p_end {
                                let a_val = match trans_a {
                                    Transpose::No => a[i * lda + p],
                                    Transpose::Yes => a[p * lda + i],
                                };
                                let b_row = p * ldb;
                                simd::axpy(
                                    &mut c_row[jj..j_end],
                                    &b[b_row + jj..b_row + j_end],
                                    alpha * a_val,
                                );
                            }
                            jj += tile;
                        }
                        pp += tile;
                    }
                }
                Transpose::Yes => {
                    // Row j of the stored B is column j of op(B): dot products.
                    for j in 0..n {
                        let b_row = &b[j * ldb..j * ldb + k];
                        let acc = match trans_a {
                            Transpose::No => simd::dot(&a[i * lda..i * lda + k], b_row),
                            Transpose::Yes => {
                                let mut acc = 0.0f32;
                                for (p, &bv) in b_row.iter().enumerate() {
                                    acc += a[p * lda + i] * bv;
                                }
                                acc
                            }
                        };
                        c_row[j] = if beta == 0.0 {
                            alpha * acc
                        } else {
                            alpha * acc + beta * c_row[j]
                        };
                    }
                }
            }
        };

        if ldc == n {
            for_each_chunk(rows, ldc, kernel);
        } else {
            // Padded rows: the last row is shorter than ldc, run serially.
            for i in 0..m {
                let start = i * ldc;
                kernel(i, &mut rows[start..start + n]);
            }
        }
    }
}
