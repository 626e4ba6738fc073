//! Convolution execution strategies.
//!
//! Provides a direct nested-loop convolution, im2col + dense GEMM in NCHW and
//! NHWC layouts, and im2col + CSR sparse GEMM over pruned weights. All of
//! them run through [`ConvExecutor`], which dispatches on an explicit
//! [`Algorithm`] and [`Layout`](crate::tensor::Layout).

mod simd;
mod direct;
mod im2col;
mod gemm;
mod sparse;
mod executor;

use std::fmt;

pub use direct::DirectTile;
pub use im2col::{Im2colExpander, PatchOrder};
pub use gemm::{Gemm, TiledGemm, Transpose};
pub use sparse::{prune, CsrMatrix, CsrSpmm, SparseMm, WeightSparsifier};
pub use executor::{conv2d, ConvExecutor, ExecutorConfig};

use crate::error::{ConvError, Result};
use crate::tensor::{Dim, ShapeIndex, Slot};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Selects which convolution algorithm an executor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Nested-loop accumulation, no scratch buffer.
    Direct,
    /// Im2col patches times the dense weight matrix.
    DenseGemm,
    /// Im2col patches times the CSR-pruned weight matrix.
    SparseGemm,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Direct => write!(f, "direct"),
            Algorithm::DenseGemm => write!(f, "gemm"),
            Algorithm::SparseGemm => write!(f, "spgemm"),
        }
    }
}

/// How the spatial border is handled.
///
/// Each executor is given one of these explicitly; the two "same" modes
/// produce an `H x W` output, `Valid` produces `(H-K+1) x (W-K+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Zero border of `(K-1)/2` materialized once; taps read unconditionally.
    PrePadded,
    /// No materialized border; every tap is bounds-checked and zero outside.
    Inline,
    /// No padding; the output is cropped by `K-1`.
    Valid,
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Padding::PrePadded => write!(f, "prepad"),
            Padding::Inline => write!(f, "inline"),
            Padding::Valid => write!(f, "valid"),
        }
    }
}

/// Fixed problem size of one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParams {
    pub batch: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel: usize,
    pub padding: Padding,
}

impl ConvParams {
    /// Derives the parameters from an NCHW input and an `(F, C, K, K)` weight.
    pub fn from_shapes(input: &ShapeIndex, weight: &ShapeIndex, padding: Padding) -> Result<Self> {
        let (mut batch, mut in_channels, mut height, mut width) = (0, 0, 0, 0);
        input.unpack(&mut [
            Slot::Into(&mut batch),
            Slot::Into(&mut in_channels),
            Slot::Into(&mut height),
            Slot::Into(&mut width),
        ])?;

        let (mut out_channels, mut kernel) = (0, 0);
        weight.unpack(&mut [
            Slot::Into(&mut out_channels),
            Slot::Skip,
            Slot::Into(&mut kernel),
            Slot::Skip,
        ])?;
        if !weight.validate(&[Dim::Any, Dim::Is(in_channels), Dim::Is(kernel), Dim::Is(kernel)]) {
            return Err(ConvError::ShapeMismatch(format!(
                "weight {} does not match input {} (expected Fx{}xKxK, square kernel)",
                weight, input, in_channels
            )));
        }

        let params = ConvParams {
            batch,
            in_channels,
            out_channels,
            height,
            width,
            kernel,
            padding,
        };
        params.check()?;
        Ok(params)
    }

    fn check(&self) -> Result<()> {
        if self.kernel % 2 == 0 {
            return Err(ConvError::EvenKernel(self.kernel));
        }
        if self.padding == Padding::Valid && (self.height < self.kernel || self.width < self.kernel) {
            return Err(ConvError::KernelTooLarge {
                kernel: self.kernel,
                h: self.height,
                w: self.width,
            });
        }
        Ok(())
    }

    /// Half kernel width, `(K-1)/2`.
    pub fn half_kernel(&self) -> usize {
        (self.kernel - 1) / 2
    }

    /// Width of the zero border materialized in the prepared input.
    pub fn border(&self) -> usize {
        match self.padding {
            Padding::PrePadded => self.half_kernel(),
            Padding::Inline | Padding::Valid => 0,
        }
    }

    /// Offset subtracted from `out + k` to get the source coordinate.
    pub(crate) fn halo(&self) -> usize {
        match self.padding {
            Padding::Inline => self.half_kernel(),
            Padding::PrePadded | Padding::Valid => 0,
        }
    }

    /// Spatial extents of the prepared input.
    pub fn input_h(&self) -> usize {
        self.height + 2 * self.border()
    }

    pub fn input_w(&self) -> usize {
        self.width + 2 * self.border()
    }

    pub fn out_h(&self) -> usize {
        match self.padding {
            Padding::Valid => self.height - self.kernel + 1,
            Padding::PrePadded | Padding::Inline => self.height,
        }
    }

    pub fn out_w(&self) -> usize {
        match self.padding {
            Padding::Valid => self.width - self.kernel + 1,
            Padding::PrePadded | Padding::Inline => self.width,
        }
    }

    /// `Cin * K * K`, the length of one receptive-field patch.
    pub fn patch_len(&self) -> usize {
        self.in_channels * self.kernel * self.kernel
    }

    /// Output pixels per batch element.
    pub fn out_pixels(&self) -> usize {
        self.out_h() * self.out_w()
    }
}

/// Runs `f(chunk_index, chunk)` over `chunk`-sized pieces of `out`.
///
/// Chunks are disjoint, so with the `parallel` feature they run on the rayon
/// pool; the per-element work inside `f` is identical either way.
pub(crate) fn for_each_chunk<F>(out: &mut [f32], chunk: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if chunk == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    out.par_chunks_mut(chunk).enumerate().for_each(|(i, c)| f(i, c));
    #[cfg(not(feature = "parallel"))]
    out.chunks_mut(chunk).enumerate().for_each(|(i, c)| f(i, c));
}
