//! Micro-kernels shared by the dense and sparse GEMM paths.
//!
//! The NEON path fuses multiply-add, so its results can differ in the last
//! bit from the scalar path. Bit-exact comparisons between dense and sparse
//! GEMM only hold on the scalar build.

// ── y[..] += a * x[..] ──

#[cfg(all(target_arch = "aarch64", feature = "simd"))]
#[inline]
pub fn axpy(y: &mut [f32], x: &[f32], a: f32) {
    use core::arch::aarch64::*;
    let len = y.len().min(x.len());
    let mut j = 0usize;
    unsafe {
        let a_vec = vdupq_n_f32(a);
        while j + 4 <= len {
            let x_vec = vld1q_f32(x.as_ptr().add(j));
            let y_vec = vld1q_f32(y.as_ptr().add(j));
            vst1q_f32(y.as_mut_ptr().add(j), vfmaq_f32(y_vec, a_vec, x_vec));
            j += 4;
        }
    }
    // scalar tail
    while j < len {
        y[j] += a * x[j];
        j += 1;
    }
}

#[cfg(not(all(target_arch = "aarch64", feature = "simd")))]
#[inline]
pub fn axpy(y: &mut [f32], x: &[f32], a: f32) {
    for (yv, &xv) in y.iter_mut().zip(x.iter()) {
        *yv += a * xv;
    }
}

// ── sequential dot product, fixed left-to-right order ──

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = 0.0f32;
    for (&av, &bv) in a.iter().zip(b.iter()) {
        acc += av * bv;
    }
    acc
}

// ── y[..] *= beta, with beta == 0 clearing NaN/inf garbage ──

#[inline]
pub fn scale(y: &mut [f32], beta: f32) {
    if beta == 0.0 {
        y.fill(0.0);
    } else if beta != 1.0 {
        for v in y.iter_mut() {
            *v *= beta;
        }
    }
}
