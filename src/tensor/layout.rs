//! NCHW <-> NHWC transposition for activations and weights.
//!
//! Weights go through the same functions: `(F, C, K, K)` is treated as a
//! batch-like filter axis followed by channel and two spatial axes, so
//! `to_nhwc` yields `(F, K, K, C)`.

use std::fmt;

use super::shape::Slot;
use super::tensor::Tensor;
use crate::error::Result;

/// Axis order of a 4-D activation tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Nchw,
    Nhwc,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Nchw => write!(f, "NCHW"),
            Layout::Nhwc => write!(f, "NHWC"),
        }
    }
}

fn dims4(t: &Tensor) -> Result<[usize; 4]> {
    let (mut a, mut b, mut c, mut d) = (0, 0, 0, 0);
    t.index().unpack(&mut [
        Slot::Into(&mut a),
        Slot::Into(&mut b),
        Slot::Into(&mut c),
        Slot::Into(&mut d),
    ])?;
    Ok([a, b, c, d])
}

/// `(N, C, H, W) -> (N, H, W, C)`.
pub fn to_nhwc(src: &Tensor) -> Result<Tensor> {
    to_nhwc_padded(src, 0)
}

/// `(N, C, H, W) -> (N, H + 2 * pad, W + 2 * pad, C)` with a zero border.
pub fn to_nhwc_padded(src: &Tensor, pad: usize) -> Result<Tensor> {
    let [n, c, h, w] = dims4(src)?;
    let (ph, pw) = (h + 2 * pad, w + 2 * pad);
    let mut dst = Tensor::zeros(&[n, ph, pw, c])?;
    let s = src.data();
    let d = dst.data_mut();
    for in_ in 0..n {
        for ic in 0..c {
            for ih in 0..h {
                let src_row = ((in_ * c + ic) * h + ih) * w;
                let dst_row = (in_ * ph + ih + pad) * pw + pad;
                for iw in 0..w {
                    d[(dst_row + iw) * c + ic] = s[src_row + iw];
                }
            }
        }
    }
    Ok(dst)
}

/// `(N, H, W, C) -> (N, C, H, W)`.
pub fn to_nchw(src: &Tensor) -> Result<Tensor> {
    let [n, h, w, c] = dims4(src)?;
    let mut dst = Tensor::zeros(&[n, c, h, w])?;
    let s = src.data();
    let d = dst.data_mut();
    for in_ in 0..n {
        for ih in 0..h {
            for iw in 0..w {
                let src_px = ((in_ * h + ih) * w + iw) * c;
                for ic in 0..c {
                    d[((in_ * c + ic) * h + ih) * w + iw] = s[src_px + ic];
                }
            }
        }
    }
    Ok(dst)
}

/// Copies an NCHW tensor into one with a zero spatial border of `pad`.
pub fn pad_nchw(src: &Tensor, pad: usize) -> Result<Tensor> {
    if pad == 0 {
        return Ok(src.clone());
    }
    let [n, c, h, w] = dims4(src)?;
    let (ph, pw) = (h + 2 * pad, w + 2 * pad);
    let mut dst = Tensor::zeros(&[n, c, ph, pw])?;
    let s = src.data();
    let d = dst.data_mut();
    for plane in 0..n * c {
        for ih in 0..h {
            let src_row = (plane * h + ih) * w;
            let dst_row = (plane * ph + ih + pad) * pw + pad;
            d[dst_row..dst_row + w].copy_from_slice(&s[src_row..src_row + w]);
        }
    }
    Ok(dst)
}
