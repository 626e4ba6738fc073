//! CPU performance explorer for 2D convolution.
//!
//! Compares a direct nested-loop convolution, im2col + dense GEMM in NCHW
//! and NHWC layouts, and im2col + CSR sparse GEMM over percentile-pruned
//! weights, all built on a runtime row-major [`tensor::ShapeIndex`].
//!
//! # Example
//!
//! ```
//! use convbench::conv::{conv2d, Algorithm, ExecutorConfig};
//! use convbench::tensor::{Layout, Tensor};
//!
//! let input = Tensor::filled(&[1, 1, 5, 5], 1.0).unwrap();
//! let weight = Tensor::filled(&[1, 1, 3, 3], 1.0).unwrap();
//! let out = conv2d(ExecutorConfig::new(Layout::Nchw, Algorithm::DenseGemm), &input, &weight).unwrap();
//! assert_eq!(out.get(&[0, 0, 2, 2]), 9.0);
//! ```

/// Error type and result alias.
pub mod error;
/// Shape indexing, owned f32 tensors and NCHW/NHWC conversion.
pub mod tensor;
/// Convolution executors, im2col, dense/sparse GEMM and weight pruning.
pub mod conv;
/// Clocks, benchmark records, diff metrics and the per-case sweep.
pub mod metrics;
/// Descriptor/weight blob readers and seeded input synthesis.
pub mod loader;
/// Process-wide tracing subscriber setup.
pub mod trace_init;

pub use error::{ConvError, Result};
