use std::fmt;

use super::shape::{Dim, ShapeIndex};
use crate::error::{ConvError, Result};

/// An f32 tensor owning one flat row-major buffer.
///
/// The axis order is whatever the caller says it is: the same type carries
/// NCHW activations, NHWC activations, `(F, C, K, K)` weights and 6-D im2col
/// scratch. Cloning copies the buffer; there is no shared storage.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    index: ShapeIndex,
    data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(dims: &[usize]) -> Result<Self> {
        let index = ShapeIndex::new(dims)?;
        let data = vec![0.0; index.total_size()];
        Ok(Tensor { index, data })
    }

    pub fn filled(dims: &[usize], val: f32) -> Result<Self> {
        let mut t = Tensor::zeros(dims)?;
        t.fill(val);
        Ok(t)
    }

    /// Wraps `data`, which must hold exactly the shape's element count.
    pub fn from_vec(dims: &[usize], data: Vec<f32>) -> Result<Self> {
        let index = ShapeIndex::new(dims)?;
        if data.len() != index.total_size() {
            return Err(ConvError::ShapeMismatch(format!(
                "buffer of {} floats cannot back a {} tensor",
                data.len(),
                index
            )));
        }
        Ok(Tensor { index, data })
    }

    /// Copies the leading elements of `source` into a tensor of `dims`.
    ///
    /// Used to carve per-case inputs out of one large synthesized buffer.
    pub fn from_prefix(dims: &[usize], source: &[f32]) -> Result<Self> {
        let index = ShapeIndex::new(dims)?;
        let len = index.total_size();
        if source.len() < len {
            return Err(ConvError::ShapeMismatch(format!(
                "source of {} floats is too short for a {} tensor",
                source.len(),
                index
            )));
        }
        Ok(Tensor {
            index,
            data: source[..len].to_vec(),
        })
    }

    pub fn index(&self) -> &ShapeIndex {
        &self.index
    }

    pub fn dims(&self) -> &[usize] {
        self.index.dims()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn fill(&mut self, val: f32) {
        self.data.fill(val);
    }

    pub fn get(&self, coords: &[usize]) -> f32 {
        self.data[self.index.flat_index(coords)]
    }

    pub fn set(&mut self, coords: &[usize], val: f32) {
        let idx = self.index.flat_index(coords);
        self.data[idx] = val;
    }

    pub fn validate(&self, expected: &[Dim]) -> bool {
        self.index.validate(expected)
    }

    /// Reinterprets the buffer under a new shape with the same element count.
    pub fn reshape(self, dims: &[usize]) -> Result<Self> {
        Tensor::from_vec(dims, self.data)
    }

    /// Sum of squares in f64, used as a permutation checksum.
    pub fn sum_of_squares(&self) -> f64 {
        self.data.iter().map(|&v| (v as f64) * (v as f64)).sum()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({}, {} floats)", self.index, self.data.len())
    }
}
