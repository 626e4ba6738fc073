//! Im2col expansion into an owned 6-D scratch tensor.
//!
//! Every output pixel's receptive field is copied into a contiguous patch so
//! the convolution becomes one matrix multiply. The patch order has to match
//! the operand layout of the GEMM call that consumes it.

use super::{for_each_chunk, ConvParams, Padding};
use crate::error::{ConvError, Result};
use crate::tensor::{Dim, Tensor};

/// Axis order of the scratch tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOrder {
    /// `(N, OH, OW, C, K, K)` from an NCHW input; row-major patches of
    /// length `C*K*K`, one per output pixel.
    PixelChw,
    /// `(N, OH, OW, K, K, C)` from an NHWC input.
    PixelHwc,
    /// `(N, C, K, K, OH, OW)` from an NCHW input; per batch a
    /// `C*K*K x OH*OW` matrix.
    ChannelMajor,
}

/// Builds im2col patches for a fixed [`ConvParams`].
///
/// The scratch is allocated once and overwritten by every [`expand`](Self::expand).
#[derive(Debug)]
pub struct Im2colExpander {
    order: PatchOrder,
    params: ConvParams,
    patches: Tensor,
}

impl Im2colExpander {
    pub fn new(order: PatchOrder, params: &ConvParams) -> Result<Self> {
        let p = params;
        let (n, c, k, oh, ow) = (p.batch, p.in_channels, p.kernel, p.out_h(), p.out_w());
        let dims = match order {
            PatchOrder::PixelChw => [n, oh, ow, c, k, k],
            PatchOrder::PixelHwc => [n, oh, ow, k, k, c],
            PatchOrder::ChannelMajor => [n, c, k, k, oh, ow],
        };
        Ok(Im2colExpander {
            order,
            params: *params,
            patches: Tensor::zeros(&dims)?,
        })
    }

    pub fn order(&self) -> PatchOrder {
        self.order
    }

    pub fn patches(&self) -> &Tensor {
        &self.patches
    }

    /// `C * K * K`.
    pub fn patch_len(&self) -> usize {
        self.params.patch_len()
    }

    /// Output pixels, i.e. patches, per batch element.
    pub fn pixels_per_batch(&self) -> usize {
        self.params.out_pixels()
    }

    /// Expected shape of the input tensor for this order and padding mode.
    fn expected_input(&self) -> [Dim; 4] {
        let p = &self.params;
        let (ih, iw) = (Dim::Is(p.input_h()), Dim::Is(p.input_w()));
        let (n, c) = (Dim::Is(p.batch), Dim::Is(p.in_channels));
        match self.order {
            PatchOrder::PixelHwc => [n, ih, iw, c],
            PatchOrder::PixelChw | PatchOrder::ChannelMajor => [n, c, ih, iw],
        }
    }

    /// Fills the scratch from `input`.
    ///
    /// With [`Padding::Inline`] each tap is bounds-checked against the
    /// unpadded input and zero-filled outside; otherwise taps are read
    /// unconditionally.
    pub fn expand(&mut self, input: &Tensor) -> Result<()> {
        let expected = self.expected_input();
        if !input.validate(&expected) {
            return Err(ConvError::ShapeMismatch(format!(
                "im2col {:?} expects input {:?}, got {}",
                self.order, expected, input
            )));
        }
        let p = self.params;
        let per_batch = p.out_pixels() * p.patch_len();
        let src = input.data();
        let inline = p.padding == Padding::Inline;
        let scratch = self.patches.data_mut();
        match self.order {
            PatchOrder::PixelChw => for_each_chunk(scratch, per_batch, |n, dst| {
                im2col_pixel_chw(&p, src, n, inline, dst)
            }),
            PatchOrder::PixelHwc => for_each_chunk(scratch, per_batch, |n, dst| {
                im2col_pixel_hwc(&p, src, n, inline, dst)
            }),
            PatchOrder::ChannelMajor => for_each_chunk(scratch, per_batch, |n, dst| {
                im2col_channel_major(&p, src, n, inline, dst)
            }),
        }
        Ok(())
    }
}

/// Source coordinate of tap `k` for output coordinate `o`, or `None` when it
/// falls into the inline padding. `halo == 0` never returns `None` for valid
/// outputs.
#[inline]
fn source(o: usize, k: usize, halo: usize, extent: usize) -> Option<usize> {
    let s = (o + k).wrapping_sub(halo);
    if s < extent {
        Some(s)
    } else {
        None
    }
}

fn im2col_pixel_chw(p: &ConvParams, input: &[f32], n: usize, inline: bool, dst: &mut [f32]) {
    let (c, k, ih_n, iw_n) = (p.in_channels, p.kernel, p.input_h(), p.input_w());
    let (oh_n, ow_n, ckk) = (p.out_h(), p.out_w(), p.patch_len());
    let halo = p.halo();
    let plane = ih_n * iw_n;
    let batch_off = n * c * plane;
    for oh in 0..oh_n {
        for ow in 0..ow_n {
            let patch = &mut dst[(oh * ow_n + ow) * ckk..(oh * ow_n + ow + 1) * ckk];
            for ic in 0..c {
                let chan = batch_off + ic * plane;
                for kh in 0..k {
                    let row = (ic * k + kh) * k;
                    if inline {
                        for kw in 0..k {
                            patch[row + kw] = match (source(oh, kh, halo, ih_n), source(ow, kw, halo, iw_n)) {
                                (Some(ih), Some(iw)) => input[chan + ih * iw_n + iw],
                                _ => 0.0,
                            };
                        }
                    } else {
                        let src = chan + (oh + kh) * iw_n + ow;
                        patch[row..row + k].copy_from_slice(&input[src..src + k]);
                    }
                }
            }
        }
    }
}

fn im2col_pixel_hwc(p: &ConvParams, input: &[f32], n: usize, inline: bool, dst: &mut [f32]) {
    let (c, k, ih_n, iw_n) = (p.in_channels, p.kernel, p.input_h(), p.input_w());
    let (oh_n, ow_n, ckk) = (p.out_h(), p.out_w(), p.patch_len());
    let halo = p.halo();
    let batch_off = n * ih_n * iw_n * c;
    for oh in 0..oh_n {
        for ow in 0..ow_n {
            let patch = &mut dst[(oh * ow_n + ow) * ckk..(oh * ow_n + ow + 1) * ckk];
            for kh in 0..k {
                for kw in 0..k {
                    let tap = &mut patch[(kh * k + kw) * c..(kh * k + kw + 1) * c];
                    let src = if inline {
                        match (source(oh, kh, halo, ih_n), source(ow, kw, halo, iw_n)) {
                            (Some(ih), Some(iw)) => Some(batch_off + (ih * iw_n + iw) * c),
                            _ => None,
                        }
                    } else {
                        Some(batch_off + ((oh + kh) * iw_n + ow + kw) * c)
                    };
                    match src {
                        Some(s) => tap.copy_from_slice(&input[s..s + c]),
                        None => tap.fill(0.0),
                    }
                }
            }
        }
    }
}

fn im2col_channel_major(p: &ConvParams, input: &[f32], n: usize, inline: bool, dst: &mut [f32]) {
    let (c, k, ih_n, iw_n) = (p.in_channels, p.kernel, p.input_h(), p.input_w());
    let (oh_n, ow_n) = (p.out_h(), p.out_w());
    let halo = p.halo();
    let plane = ih_n * iw_n;
    let cols = oh_n * ow_n;
    let batch_off = n * c * plane;
    for ic in 0..c {
        let chan = batch_off + ic * plane;
        for kh in 0..k {
            for kw in 0..k {
                let row = (ic * k + kh) * k + kw;
                let row_off = row * cols;
                for oh in 0..oh_n {
                    let out = &mut dst[row_off + oh * ow_n..row_off + (oh + 1) * ow_n];
                    if inline {
                        match source(oh, kh, halo, ih_n) {
                            Some(ih) => {
                                for (ow, v) in out.iter_mut().enumerate() {
                                    *v = match source(ow, kw, halo, iw_n) {
                                        Some(iw) => input[chan + ih * iw_n + iw],
                                        None => 0.0,
                                    };
                                }
                            }
                            None => out.fill(0.0),
                        }
                    } else {
                        let src = chan + (oh + kh) * iw_n + kw;
                        out.copy_from_slice(&input[src..src + ow_n]);
                    }
                }
            }
        }
    }
}
