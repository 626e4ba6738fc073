use std::fmt;
use std::io::Write;
use std::time::Duration;

use tracing::{info, warn};

use super::clock::{millis, Clock};
use crate::conv::{Algorithm, ConvExecutor, DirectTile, ExecutorConfig, Padding};
use crate::error::{ConvError, Result};
use crate::loader::FilterShape;
use crate::tensor::{Layout, Tensor};

/// Largest relative error tolerated between the dense paths and direct.
pub const DENSE_TOLERANCE: f64 = 1e-3;

/// One timed `compute()` call.
///
/// Displays as
/// `conv,<layout>,<algorithm>,<implementation>,<sparse-format>,<sparsity>,<filters>,<spatial>,<convert ms>,<compute ms>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvRecord {
    pub layout: Layout,
    pub algorithm: Algorithm,
    pub implementation: String,
    pub sparse_format: &'static str,
    /// Pruning fraction in `[0, 1]`.
    pub sparsity: f32,
    pub filters: usize,
    pub spatial: usize,
    pub convert: Duration,
    pub compute: Duration,
}

impl fmt::Display for ConvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conv,{},{},{},{},{},{},{},{:.3},{:.3}",
            self.layout,
            self.algorithm,
            self.implementation,
            self.sparse_format,
            self.sparsity,
            self.filters,
            self.spatial,
            millis(self.convert),
            millis(self.compute),
        )
    }
}

/// Divergence of one variant from the direct NCHW reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRecord {
    pub layout: Layout,
    pub algorithm: Algorithm,
    /// Sum of squared differences.
    pub ssd: f64,
    pub max_relative: f64,
}

impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diff,{},{},{}", self.layout, self.algorithm, self.ssd)
    }
}

fn check_same_len(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.dims() != b.dims() {
        return Err(ConvError::ShapeMismatch(format!(
            "cannot compare {} with {}",
            a, b
        )));
    }
    Ok(())
}

/// Sum of squared element differences, accumulated in f64.
pub fn square_diff(a: &Tensor, b: &Tensor) -> Result<f64> {
    check_same_len(a, b)?;
    Ok(a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum())
}

/// Largest per-element `|a - b| / max(|a|, |b|, 1)`.
///
/// Magnitudes below one are compared absolutely so that sums cancelling to
/// near zero do not blow up the ratio.
pub fn max_relative_error(a: &Tensor, b: &Tensor) -> Result<f64> {
    check_same_len(a, b)?;
    Ok(a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (x - y).abs() / x.abs().max(y.abs()).max(1.0)
        })
        .fold(0.0, f64::max))
}

/// Knobs of the benchmark sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub batch: usize,
    /// Spatial size is `spatial_budget / Cout` unless `spatial` is set.
    pub spatial_budget: usize,
    pub spatial: Option<usize>,
    /// Timed `compute()` calls per variant.
    pub repeat: usize,
    /// Pruning percentiles swept by the sparse variant.
    pub percentiles: Vec<f32>,
    pub padding: Padding,
    pub tile: DirectTile,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            batch: 10,
            spatial_budget: 64 * 256,
            spatial: None,
            repeat: 1,
            percentiles: vec![35.0, 50.0, 65.0, 80.0, 95.0],
            padding: Padding::PrePadded,
            tile: DirectTile::default(),
        }
    }
}

impl BenchConfig {
    /// Square spatial extent used for a case.
    pub fn spatial_for(&self, shape: &FilterShape) -> usize {
        self.spatial
            .unwrap_or_else(|| self.spatial_budget / shape.out_channels.max(1))
            .max(shape.kernel_h)
            .max(1)
    }

    /// NCHW input shape of a case.
    pub fn input_dims(&self, shape: &FilterShape) -> [usize; 4] {
        let s = self.spatial_for(shape);
        [self.batch, shape.in_channels, s, s]
    }

    /// Floats needed to carve every case's input out of one buffer.
    pub fn input_len(&self, shapes: &[FilterShape]) -> usize {
        shapes
            .iter()
            .map(|s| self.input_dims(s).iter().product::<usize>())
            .max()
            .unwrap_or(0)
    }
}

/// Everything measured for one filter case.
#[derive(Debug, Clone, Default)]
pub struct CaseReport {
    pub records: Vec<ConvRecord>,
    pub diffs: Vec<DiffRecord>,
}

fn run_timed<C: Clock + ?Sized>(
    exec: &mut ConvExecutor,
    repeat: usize,
    clock: &C,
    out: &mut dyn Write,
    report: &mut CaseReport,
) -> Result<()> {
    for _ in 0..repeat.max(1) {
        let record = exec.compute(clock)?;
        writeln!(out, "{}", record)?;
        report.records.push(record);
    }
    Ok(())
}

/// Runs every variant on one case and writes its records to `out`.
///
/// Direct NCHW is the reference; the other dense variants are diffed against
/// it. The sparse variant sweeps `config.percentiles` and is not diffed,
/// since pruning diverges on purpose.
pub fn run_case<C: Clock + ?Sized>(
    shape: &FilterShape,
    weight: &Tensor,
    input_pool: &[f32],
    config: &BenchConfig,
    clock: &C,
    out: &mut dyn Write,
) -> Result<CaseReport> {
    let input = Tensor::from_prefix(&config.input_dims(shape), input_pool)?;
    info!(filters = %shape, input = %input, "running case");

    let base = ExecutorConfig::default()
        .with_padding(config.padding)
        .with_tile(config.tile);
    let mut report = CaseReport::default();

    let mut reference_exec = ConvExecutor::new(base, &input, weight)?;
    run_timed(&mut reference_exec, config.repeat, clock, out, &mut report)?;
    let reference = reference_exec.result()?;
    drop(reference_exec);

    let dense_variants = [
        (Layout::Nhwc, Algorithm::Direct),
        (Layout::Nchw, Algorithm::DenseGemm),
        (Layout::Nhwc, Algorithm::DenseGemm),
    ];
    for (layout, algorithm) in dense_variants {
        let cfg = ExecutorConfig { layout, algorithm, ..base };
        let mut exec = ConvExecutor::new(cfg, &input, weight)?;
        run_timed(&mut exec, config.repeat, clock, out, &mut report)?;
        let result = exec.result()?;
        let diff = DiffRecord {
            layout,
            algorithm,
            ssd: square_diff(&reference, &result)?,
            max_relative: max_relative_error(&reference, &result)?,
        };
        if diff.max_relative > DENSE_TOLERANCE {
            warn!(%layout, %algorithm, max_relative = diff.max_relative, "dense result diverges from direct");
        }
        writeln!(out, "{}", diff)?;
        report.diffs.push(diff);
    }

    if !config.percentiles.is_empty() {
        let cfg = ExecutorConfig::new(Layout::Nchw, Algorithm::SparseGemm)
            .with_padding(config.padding)
            .with_percentile(config.percentiles[0]);
        let mut exec = ConvExecutor::new(cfg, &input, weight)?;
        for &percentile in &config.percentiles {
            exec.set_sparsity(percentile)?;
            run_timed(&mut exec, config.repeat, clock, out, &mut report)?;
        }
    }

    Ok(report)
}
