use convbench::conv::{Gemm, TiledGemm, Transpose};
use convbench::loader::synth_weights;

/// Element of `op(X)` for a row-major matrix with leading dimension `ld`.
fn op(x: &[f32], ld: usize, t: Transpose, r: usize, c: usize) -> f32 {
    match t {
        Transpose::No => x[r * ld + c],
        Transpose::Yes => x[c * ld + r],
    }
}

#[allow(clippy::too_many_arguments)]
fn reference(
    ta: Transpose, tb: Transpose, m: usize, n: usize, k: usize,
    alpha: f32, a: &[f32], lda: usize, b: &[f32], ldb: usize,
    beta: f32, c: &mut [f32], ldc: usize,
) {
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0f64;
            for p in 0..k {
                acc += op(a, lda, ta, i, p) as f64 * op(b, ldb, tb, p, j) as f64;
            }
            c[i * ldc + j] = alpha * acc as f32 + beta * c[i * ldc + j];
        }
    }
}

fn stored(t: Transpose, rows: usize, cols: usize) -> (usize, usize) {
    match t {
        Transpose::No => (rows, cols),
        Transpose::Yes => (cols, rows),
    }
}

#[test]
fn test_all_transpose_combinations() {
    let (m, n, k) = (7, 9, 13);
    for ta in [Transpose::No, Transpose::Yes] {
        for tb in [Transpose::No, Transpose::Yes] {
            let (ar, ac) = stored(ta, m, k);
            let (br, bc) = stored(tb, k, n);
            let a = synth_weights(ar * ac, 1);
            let b = synth_weights(br * bc, 2);
            let mut expected = vec![0.0f32; m * n];
            reference(ta, tb, m, n, k, 1.0, &a, ac, &b, bc, 0.0, &mut expected, n);

            for tile in [1, 4, 64] {
                let mut c = vec![f32::NAN; m * n];
                TiledGemm::new(tile).sgemm(ta, tb, m, n, k, 1.0, &a, ac, &b, bc, 0.0, &mut c, n);
                for (i, (x, y)) in c.iter().zip(expected.iter()).enumerate() {
                    assert!((x - y).abs() < 1e-4, "{:?}/{:?} tile {} at {}: {} vs {}", ta, tb, tile, i, x, y);
                }
            }
        }
    }
}

#[test]
fn test_leading_dimensions_and_beta() {
    let (m, n, k) = (4, 3, 5);
    let (lda, ldb, ldc) = (k + 2, n + 1, n + 3);
    let a = synth_weights(m * lda, 3);
    let b = synth_weights(k * ldb, 4);
    let init = synth_weights(m * ldc, 5);

    let mut expected = init.clone();
    reference(Transpose::No, Transpose::No, m, n, k, 0.5, &a, lda, &b, ldb, 2.0, &mut expected, ldc);
    let mut c = init.clone();
    TiledGemm::default().sgemm(Transpose::No, Transpose::No, m, n, k, 0.5, &a, lda, &b, ldb, 2.0, &mut c, ldc);

    for i in 0..m {
        for j in 0..ldc {
            let idx = i * ldc + j;
            if j < n {
                assert!((c[idx] - expected[idx]).abs() < 1e-5);
            } else {
                assert_eq!(c[idx], init[idx], "column {} of row {} is outside C", j, i);
            }
        }
    }
}

#[test]
fn test_tiling_does_not_change_bits() {
    let (m, n, k) = (6, 70, 130);
    let a = synth_weights(m * k, 8);
    let b = synth_weights(k * n, 9);
    let mut small = vec![0.0f32; m * n];
    let mut large = vec![0.0f32; m * n];
    TiledGemm::new(3).sgemm(Transpose::No, Transpose::No, m, n, k, 1.0, &a, k, &b, n, 0.0, &mut small, n);
    TiledGemm::new(256).sgemm(Transpose::No, Transpose::No, m, n, k, 1.0, &a, k, &b, n, 0.0, &mut large, n);
    assert_eq!(small, large);
}

#[test]
fn test_empty_inner_dimension_scales_c() {
    let mut c = vec![2.0f32; 6];
    TiledGemm::default().sgemm(Transpose::No, Transpose::Yes, 2, 3, 0, 1.0, &[], 0, &[], 0, 0.5, &mut c, 3);
    assert_eq!(c, vec![1.0; 6]);
    TiledGemm::default().sgemm(Transpose::No, Transpose::Yes, 2, 3, 0, 1.0, &[], 0, &[], 0, 0.0, &mut c, 3);
    assert_eq!(c, vec![0.0; 6]);
    assert_eq!(TiledGemm::default().name(), "portable");
}
