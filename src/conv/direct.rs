//! Direct nested-loop convolution (reference implementation).
//!
//! No scratch buffer. Output pixels are visited in spatial tiles to bound
//! the working set; tiling changes the visiting order, never the per-pixel
//! accumulation order.

use super::{for_each_chunk, ConvParams, Padding};

/// Spatial tile of the direct loop nest, in output rows x cols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectTile {
    pub rows: usize,
    pub cols: usize,
}

impl Default for DirectTile {
    fn default() -> Self {
        DirectTile { rows: 2, cols: 10 }
    }
}

/// `(N, C, IH, IW) * (F, C, K, K) -> (N, F, OH, OW)`.
///
/// One parallel task per `(n, f)` output plane.
pub(crate) fn conv2d_direct_nchw(
    p: &ConvParams,
    tile: DirectTile,
    input: &[f32],
    weights: &[f32],
    output: &mut [f32],
) {
    let (c, f_n, k) = (p.in_channels, p.out_channels, p.kernel);
    let (ih_n, iw_n, oh_n, ow_n) = (p.input_h(), p.input_w(), p.out_h(), p.out_w());
    let halo = p.halo() as isize;
    let inline = p.padding == Padding::Inline;
    let (tile_h, tile_w) = (tile.rows.max(1), tile.cols.max(1));
    let in_plane = ih_n * iw_n;
    let ckk = p.patch_len();

    for_each_chunk(output, oh_n * ow_n, |plane, out| {
        let (n, f) = (plane / f_n, plane % f_n);
        let w_filter = &weights[f * ckk..(f + 1) * ckk];
        let in_batch = n * c * in_plane;

        for oh0 in (0..oh_n).step_by(tile_h) {
            for ow0 in (0..ow_n).step_by(tile_w) {
                let oh1 = (oh0 + tile_h).min(oh_n);
                let ow1 = (ow0 + tile_w).min(ow_n);
                for oh in oh0..oh1 {
                    for ow in ow0..ow1 {
                        let mut sum = 0.0f32;
                        for ic in 0..c {
                            let chan = in_batch + ic * in_plane;
                            for kh in 0..k {
                                let w_row = &w_filter[(ic * k + kh) * k..(ic * k + kh + 1) * k];
                                if inline {
                                    let ih = (oh + kh) as isize - halo;
                                    if ih < 0 || ih >= ih_n as isize {
                                        continue;
                                    }
                                    for (kw, &wv) in w_row.iter().enumerate() {
                                        let iw = (ow + kw) as isize - halo;
                                        if iw >= 0 && iw < iw_n as isize {
                                            sum += input[chan + ih as usize * iw_n + iw as usize] * wv;
                                        }
                                    }
                                } else {
                                    let src = chan + (oh + kh) * iw_n + ow;
                                    for (kw, &wv) in w_row.iter().enumerate() {
                                        sum += input[src + kw] * wv;
                                    }
                                }
                            }
                        }
                        out[oh * ow_n + ow] = sum;
                    }
                }
            }
        }
    });
}

/// `(N, IH, IW, C) * (F, K, K, C) -> (N, OH, OW, F)`.
///
/// One parallel task per `(n, oh)` output row; channel is the innermost,
/// contiguous reduction axis.
pub(crate) fn conv2d_direct_nhwc(p: &ConvParams, input: &[f32], weights: &[f32], output: &mut [f32]) {
    let (c, f_n, k) = (p.in_channels, p.out_channels, p.kernel);
    let (ih_n, iw_n, oh_n, ow_n) = (p.input_h(), p.input_w(), p.out_h(), p.out_w());
    let halo = p.halo() as isize;
    let inline = p.padding == Padding::Inline;
    let kkc = p.patch_len();

    for_each_chunk(output, ow_n * f_n, |row, out| {
        let (n, oh) = (row / oh_n, row % oh_n);
        let in_batch = n * ih_n * iw_n * c;
        for ow in 0..ow_n {
            for f in 0..f_n {
                let w_filter = &weights[f * kkc..(f + 1) * kkc];
                let mut sum = 0.0f32;
                for kh in 0..k {
                    let ih = (oh + kh) as isize - halo;
                    if inline && (ih < 0 || ih >= ih_n as isize) {
                        continue;
                    }
                    for kw in 0..k {
                        let iw = (ow + kw) as isize - halo;
                        if inline && (iw < 0 || iw >= iw_n as isize) {
                            continue;
                        }
                        let src = in_batch + (ih as usize * iw_n + iw as usize) * c;
                        let w_tap = &w_filter[(kh * k + kw) * c..(kh * k + kw + 1) * c];
                        for (x, &wv) in input[src..src + c].iter().zip(w_tap.iter()) {
                            sum += x * wv;
                        }
                    }
                }
                out[ow * f_n + f] = sum;
            }
        }
    });
}
