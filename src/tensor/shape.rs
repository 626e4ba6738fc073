use std::fmt;

use crate::error::{ConvError, Result};

/// A query extent for [`ShapeIndex::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    /// Matches any extent.
    Any,
    /// Matches exactly this extent.
    Is(usize),
}

impl From<usize> for Dim {
    fn from(v: usize) -> Self {
        Dim::Is(v)
    }
}

/// A destination for [`ShapeIndex::unpack`].
#[derive(Debug)]
pub enum Slot<'a> {
    /// Receives the extent of this dimension.
    Into(&'a mut usize),
    /// Ignores this dimension.
    Skip,
}

/// Row-major extent/stride table for an N-dimensional shape.
///
/// `stride[last] == 1`, `stride[i] == stride[i + 1] * extent[i + 1]` and
/// `total_size == extent[0] * stride[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeIndex {
    extents: Vec<usize>,
    strides: Vec<usize>,
    total: usize,
}

impl ShapeIndex {
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(ConvError::InvalidShape(dims.to_vec()));
        }
        let overflow = || ConvError::InvalidShape(dims.to_vec());
        let mut strides = vec![1usize; dims.len()];
        for i in (0..dims.len() - 1).rev() {
            strides[i] = strides[i + 1].checked_mul(dims[i + 1]).ok_or_else(overflow)?;
        }
        let total = strides[0].checked_mul(dims[0]).ok_or_else(overflow)?;
        Ok(ShapeIndex {
            extents: dims.to_vec(),
            total,
            strides,
        })
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.extents
    }

    pub fn extent(&self, axis: usize) -> usize {
        self.extents[axis]
    }

    pub fn stride(&self, axis: usize) -> usize {
        self.strides[axis]
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn total_size(&self) -> usize {
        self.total
    }

    /// Flat offset of `coords`: `sum(coords[i] * stride[i])`.
    ///
    /// The coordinate count must equal the rank; this is only checked in
    /// debug builds, so callers on hot paths pre-check with [`rank`](Self::rank).
    #[inline]
    pub fn flat_index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.rank(), "coordinate count != rank");
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(c, s)| c * s)
            .sum()
    }

    /// Inverse of [`flat_index`](Self::flat_index) for `offset < total_size`.
    pub fn coords_of(&self, mut offset: usize) -> Vec<usize> {
        let mut coords = Vec::with_capacity(self.rank());
        for &s in &self.strides {
            coords.push(offset / s);
            offset %= s;
        }
        coords
    }

    /// Writes each extent into its slot, skipping [`Slot::Skip`].
    pub fn unpack(&self, slots: &mut [Slot<'_>]) -> Result<()> {
        if slots.len() != self.rank() {
            return Err(ConvError::RankMismatch {
                expected: self.rank(),
                got: slots.len(),
            });
        }
        for (slot, &extent) in slots.iter_mut().zip(self.extents.iter()) {
            if let Slot::Into(target) = slot {
                **target = extent;
            }
        }
        Ok(())
    }

    /// True iff the rank matches and every [`Dim::Is`] equals its extent.
    pub fn validate(&self, expected: &[Dim]) -> bool {
        expected.len() == self.rank()
            && expected
                .iter()
                .zip(self.extents.iter())
                .all(|(d, &e)| match d {
                    Dim::Any => true,
                    Dim::Is(v) => *v == e,
                })
    }
}

impl fmt::Display for ShapeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.extents.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", dims.join("x"))
    }
}
