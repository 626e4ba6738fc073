use std::sync::Arc;

use tracing::debug;

use super::direct::{conv2d_direct_nchw, conv2d_direct_nhwc};
use super::{
    Algorithm, ConvParams, CsrMatrix, CsrSpmm, DirectTile, Gemm, Im2colExpander, Padding,
    PatchOrder, SparseMm, TiledGemm, Transpose, WeightSparsifier,
};
use crate::error::{ConvError, Result};
use crate::metrics::{Clock, ConvRecord};
use crate::tensor::layout::{pad_nchw, to_nchw, to_nhwc, to_nhwc_padded};
use crate::tensor::{Layout, Tensor};

/// What an executor runs and how it treats the border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    pub layout: Layout,
    pub algorithm: Algorithm,
    pub padding: Padding,
    /// Spatial tile of the direct loop nest.
    pub tile: DirectTile,
    /// Initial pruning percentile for [`Algorithm::SparseGemm`].
    pub percentile: f32,
}

impl ExecutorConfig {
    pub fn new(layout: Layout, algorithm: Algorithm) -> Self {
        ExecutorConfig {
            layout,
            algorithm,
            ..ExecutorConfig::default()
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_tile(mut self, tile: DirectTile) -> Self {
        self.tile = tile;
        self
    }

    pub fn with_percentile(mut self, percentile: f32) -> Self {
        self.percentile = percentile;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            layout: Layout::Nchw,
            algorithm: Algorithm::Direct,
            padding: Padding::PrePadded,
            tile: DirectTile::default(),
            percentile: 0.0,
        }
    }
}

/// One convolution variant bound to a fixed input/weight pair.
///
/// Construction validates shapes and prepares the data (padding, layout
/// conversion, scratch allocation). Each [`compute`](Self::compute) then
/// runs `im2col` and `compute_kernel` as two timed phases, reusing the same
/// buffers.
pub struct ConvExecutor {
    config: ExecutorConfig,
    params: ConvParams,
    data: Tensor,
    weight: Tensor,
    result: Tensor,
    expander: Option<Im2colExpander>,
    sparsifier: Option<WeightSparsifier>,
    sparse: Option<CsrMatrix>,
    gemm: Arc<dyn Gemm>,
    spmm: Arc<dyn SparseMm>,
}

impl ConvExecutor {
    /// Builds an executor with the portable GEMM and sparse backends.
    ///
    /// `input` is NCHW, `weight` is `(F, C, K, K)`; neither is modified.
    pub fn new(config: ExecutorConfig, input: &Tensor, weight: &Tensor) -> Result<Self> {
        Self::with_backends(
            config,
            input,
            weight,
            Arc::new(TiledGemm::default()),
            Arc::new(CsrSpmm),
        )
    }

    pub fn with_backends(
        config: ExecutorConfig,
        input: &Tensor,
        weight: &Tensor,
        gemm: Arc<dyn Gemm>,
        spmm: Arc<dyn SparseMm>,
    ) -> Result<Self> {
        let params = check_size(&config, input, weight)?;
        let (data, weight) = prepare_data(&config, &params, input, weight)?;

        let (n, f, oh, ow) = (params.batch, params.out_channels, params.out_h(), params.out_w());
        let result = match config.layout {
            Layout::Nchw => Tensor::zeros(&[n, f, oh, ow])?,
            Layout::Nhwc => Tensor::zeros(&[n, oh, ow, f])?,
        };
        let expander = match (config.algorithm, config.layout) {
            (Algorithm::Direct, _) => None,
            (Algorithm::DenseGemm, Layout::Nchw) => Some(Im2colExpander::new(PatchOrder::PixelChw, &params)?),
            (Algorithm::DenseGemm, Layout::Nhwc) => Some(Im2colExpander::new(PatchOrder::PixelHwc, &params)?),
            (Algorithm::SparseGemm, _) => Some(Im2colExpander::new(PatchOrder::ChannelMajor, &params)?),
        };

        debug!(
            layout = %config.layout,
            algorithm = %config.algorithm,
            padding = %config.padding,
            input = %data,
            weight = %weight,
            "prepared convolution"
        );

        let mut exec = ConvExecutor {
            config,
            params,
            data,
            weight,
            result,
            expander,
            sparsifier: None,
            sparse: None,
            gemm,
            spmm,
        };
        if config.algorithm == Algorithm::SparseGemm {
            exec.set_sparsity(config.percentile)?;
        }
        Ok(exec)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn params(&self) -> &ConvParams {
        &self.params
    }

    /// Input after padding and layout conversion.
    pub fn prepared_input(&self) -> &Tensor {
        &self.data
    }

    /// Weights after layout conversion: `(F, C, K, K)` or `(F, K, K, C)`.
    pub fn prepared_weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn sparse_weights(&self) -> Option<&CsrMatrix> {
        self.sparse.as_ref()
    }

    /// Rebuilds the CSR weights at a new pruning percentile.
    pub fn set_sparsity(&mut self, percentile: f32) -> Result<()> {
        if self.config.algorithm != Algorithm::SparseGemm {
            return Err(ConvError::Unsupported(format!(
                "{} convolution has no sparse weights",
                self.config.algorithm
            )));
        }
        let sparsifier = WeightSparsifier::new(percentile)?;
        let csr = sparsifier.prune(self.weight.data(), self.params.out_channels, self.params.patch_len())?;
        debug!(percentile, nnz = csr.nnz(), density = csr.density(), "pruned weights");
        self.sparse = Some(csr);
        self.sparsifier = Some(sparsifier);
        Ok(())
    }

    /// Data-preparation phase: builds the im2col patches, no-op for direct.
    pub fn im2col(&mut self) -> Result<()> {
        if let Some(expander) = self.expander.as_mut() {
            expander.expand(&self.data)?;
        }
        Ok(())
    }

    /// Compute phase: direct accumulation, dense GEMM or sparse GEMM.
    pub fn compute_kernel(&mut self) -> Result<()> {
        let p = self.params;
        let (f, ckk, pixels) = (p.out_channels, p.patch_len(), p.out_pixels());
        let out = self.result.data_mut();
        match (self.config.algorithm, self.config.layout) {
            (Algorithm::Direct, Layout::Nchw) => {
                conv2d_direct_nchw(&p, self.config.tile, self.data.data(), self.weight.data(), out);
            }
            (Algorithm::Direct, Layout::Nhwc) => {
                conv2d_direct_nhwc(&p, self.data.data(), self.weight.data(), out);
            }
            (Algorithm::DenseGemm, Layout::Nchw) => {
                let patches = patches_of(&self.expander)?;
                // result[n] (F x OHW) = W (F x CKK) * P[n]^T, P[n] is OHW x CKK
                for n in 0..p.batch {
                    self.gemm.sgemm(
                        Transpose::No,
                        Transpose::Yes,
                        f,
                        pixels,
                        ckk,
                        1.0,
                        self.weight.data(),
                        ckk,
                        &patches[n * pixels * ckk..(n + 1) * pixels * ckk],
                        ckk,
                        0.0,
                        &mut out[n * f * pixels..(n + 1) * f * pixels],
                        pixels,
                    );
                }
            }
            (Algorithm::DenseGemm, Layout::Nhwc) => {
                let patches = patches_of(&self.expander)?;
                // result (N*OHW x F) = P (N*OHW x KKC) * W^T, W is F x KKC
                self.gemm.sgemm(
                    Transpose::No,
                    Transpose::Yes,
                    p.batch * pixels,
                    f,
                    ckk,
                    1.0,
                    patches,
                    ckk,
                    self.weight.data(),
                    ckk,
                    0.0,
                    out,
                    f,
                );
            }
            (Algorithm::SparseGemm, Layout::Nchw) => {
                let patches = patches_of(&self.expander)?;
                let csr = self
                    .sparse
                    .as_ref()
                    .ok_or_else(|| ConvError::Unsupported("sparse weights were never built".into()))?;
                // result[n] (F x OHW) = csr(W) (F x CKK) * P[n] (CKK x OHW)
                for n in 0..p.batch {
                    self.spmm.spmm(
                        1.0,
                        csr,
                        &patches[n * ckk * pixels..(n + 1) * ckk * pixels],
                        pixels,
                        pixels,
                        0.0,
                        &mut out[n * f * pixels..(n + 1) * f * pixels],
                        pixels,
                    );
                }
            }
            (Algorithm::SparseGemm, Layout::Nhwc) => {
                return Err(ConvError::Unsupported("sparse GEMM in NHWC layout".into()));
            }
        }
        Ok(())
    }

    /// Runs both phases and times them as two sequential intervals.
    pub fn compute<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<ConvRecord> {
        let t1 = clock.now();
        self.im2col()?;
        let t2 = clock.now();
        self.compute_kernel()?;
        let t3 = clock.now();

        let record = ConvRecord {
            layout: self.config.layout,
            algorithm: self.config.algorithm,
            implementation: self.implementation().to_string(),
            sparse_format: if self.sparse.is_some() { "csr" } else { "none" },
            sparsity: self.sparsifier.map(|s| s.fraction()).unwrap_or(0.0),
            filters: self.params.out_channels,
            spatial: self.params.height,
            convert: t2.saturating_sub(t1),
            compute: t3.saturating_sub(t2),
        };
        debug!(%record, "compute done");
        Ok(record)
    }

    fn implementation(&self) -> &str {
        match self.config.algorithm {
            Algorithm::Direct => "raw",
            Algorithm::DenseGemm => self.gemm.name(),
            Algorithm::SparseGemm => self.spmm.name(),
        }
    }

    /// Result in the executor's own layout.
    pub fn raw_result(&self) -> &Tensor {
        &self.result
    }

    /// Result in canonical NCHW, permuted back for NHWC executors.
    pub fn result(&self) -> Result<Tensor> {
        match self.config.layout {
            Layout::Nchw => Ok(self.result.clone()),
            Layout::Nhwc => to_nchw(&self.result),
        }
    }
}

fn patches_of(expander: &Option<Im2colExpander>) -> Result<&[f32]> {
    expander
        .as_ref()
        .map(|e| e.patches().data())
        .ok_or_else(|| ConvError::Unsupported("GEMM convolution without im2col scratch".into()))
}

/// Validates the input/weight pair against the requested variant.
fn check_size(config: &ExecutorConfig, input: &Tensor, weight: &Tensor) -> Result<ConvParams> {
    if config.algorithm == Algorithm::SparseGemm && config.layout == Layout::Nhwc {
        return Err(ConvError::Unsupported("sparse GEMM in NHWC layout".into()));
    }
    for t in [input, weight] {
        if t.index().rank() != 4 {
            return Err(ConvError::RankMismatch {
                expected: 4,
                got: t.index().rank(),
            });
        }
    }
    ConvParams::from_shapes(input.index(), weight.index(), config.padding)
}

/// Pads and converts the input, converts the weights.
fn prepare_data(
    config: &ExecutorConfig,
    params: &ConvParams,
    input: &Tensor,
    weight: &Tensor,
) -> Result<(Tensor, Tensor)> {
    let border = params.border();
    match config.layout {
        Layout::Nchw => Ok((pad_nchw(input, border)?, weight.clone())),
        Layout::Nhwc => Ok((to_nhwc_padded(input, border)?, to_nhwc(weight)?)),
    }
}

/// Runs one convolution and returns the NCHW result.
pub fn conv2d(config: ExecutorConfig, input: &Tensor, weight: &Tensor) -> Result<Tensor> {
    let mut exec = ConvExecutor::new(config, input, weight)?;
    exec.im2col()?;
    exec.compute_kernel()?;
    exec.result()
}
