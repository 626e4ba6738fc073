//! Error types for tensor indexing, convolution setup and weight loading.

use thiserror::Error;

/// Errors raised by the convolution benchmark.
///
/// Every variant is an unrecoverable precondition violation for the current
/// case; nothing here is retried.
#[derive(Debug, Error)]
pub enum ConvError {
    /// A shape was empty, contained a zero extent, or overflowed `usize`.
    #[error("invalid shape {0:?}: extents must be positive, non-empty and fit in usize")]
    InvalidShape(Vec<usize>),

    /// The number of coordinates or slots does not match the tensor rank.
    #[error("rank mismatch: expected {expected} dimensions, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Validated extents disagree (e.g. input channels vs weight channels).
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Same-padding is only modeled for odd kernel sizes.
    #[error("kernel size {0} is even; only odd square kernels are supported")]
    EvenKernel(usize),

    /// Valid convolution needs the kernel to fit inside the input.
    #[error("kernel size {kernel} does not fit a {h}x{w} input")]
    KernelTooLarge { kernel: usize, h: usize, w: usize },

    /// Pruning percentile outside `[0, 100]`.
    #[error("pruning percentile {0} is outside [0, 100]")]
    InvalidPercentile(f32),

    /// The requested layout/algorithm combination is not implemented.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Fewer floats available than the case declares.
    #[error("truncated weight blob: expected {expected} floats, got {got}")]
    Truncated { expected: usize, got: usize },

    /// Malformed filter descriptor text.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConvError>;
