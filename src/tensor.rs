//! # Tensor conversion and resampling
//!
//! Conversion between `image` buffers and NCHW network tensors, plus the bilinear resampling
//! used on both sides of the network.
//!
//! Two sampling conventions are used. Images and disparity maps are resized with half-pixel
//! centres (pixel `i` covers `[i, i + 1)`), while the coarse pass input is produced with aligned
//! corners, where the first and last samples of both grids coincide.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayView2};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Precomputed source taps along one axis.
struct Taps {
    i0: Vec<usize>,
    i1: Vec<usize>,
    frac: Vec<f32>
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Convert an RGB image into a `[1, 3, H, W]` float tensor holding raw 0..255 values.
pub fn image_to_tensor(img: &RgbImage) -> Array4<f32> {
    let (w, h) = img.dimensions();

    Array4::from_shape_fn((1, 3, h as usize, w as usize), |(_, c, y, x)| {
        img.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Bilinearly resize every channel of an NCHW tensor with aligned corners.
pub fn interpolate_align_corners(
    input: &Array4<f32>,
    out_h: usize,
    out_w: usize
) -> Array4<f32> {
    let (n, c, in_h, in_w) = input.dim();
    let ys = Taps::align_corners(in_h, out_h);
    let xs = Taps::align_corners(in_w, out_w);

    Array4::from_shape_fn((n, c, out_h, out_w), |(b, ch, y, x)| {
        let p00 = input[[b, ch, ys.i0[y], xs.i0[x]]];
        let p10 = input[[b, ch, ys.i0[y], xs.i1[x]]];
        let p01 = input[[b, ch, ys.i1[y], xs.i0[x]]];
        let p11 = input[[b, ch, ys.i1[y], xs.i1[x]]];
        lerp2(p00, p10, p01, p11, xs.frac[x], ys.frac[y])
    })
}

/// Bilinearly resize a single channel float map with half-pixel centres.
pub fn resize_linear_f32(input: ArrayView2<f32>, out_w: usize, out_h: usize) -> Vec<f32> {
    let (in_h, in_w) = input.dim();
    let ys = Taps::half_pixel(in_h, out_h);
    let xs = Taps::half_pixel(in_w, out_w);

    let mut out = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            out.push(lerp2(
                input[[ys.i0[y], xs.i0[x]]],
                input[[ys.i0[y], xs.i1[x]]],
                input[[ys.i1[y], xs.i0[x]]],
                input[[ys.i1[y], xs.i1[x]]],
                xs.frac[x],
                ys.frac[y]
            ));
        }
    }

    out
}

/// Bilinearly resize an RGB image with half-pixel centres.
pub fn resize_rgb_linear(img: &RgbImage, out_w: u32, out_h: u32) -> RgbImage {
    let (in_w, in_h) = img.dimensions();
    if (in_w, in_h) == (out_w, out_h) {
        return img.clone();
    }

    let ys = Taps::half_pixel(in_h as usize, out_h as usize);
    let xs = Taps::half_pixel(in_w as usize, out_w as usize);

    RgbImage::from_fn(out_w, out_h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let p00 = img.get_pixel(xs.i0[x] as u32, ys.i0[y] as u32);
        let p10 = img.get_pixel(xs.i1[x] as u32, ys.i0[y] as u32);
        let p01 = img.get_pixel(xs.i0[x] as u32, ys.i1[y] as u32);
        let p11 = img.get_pixel(xs.i1[x] as u32, ys.i1[y] as u32);

        let mut px = [0u8; 3];
        for (c, out) in px.iter_mut().enumerate() {
            let v = lerp2(
                p00[c] as f32,
                p10[c] as f32,
                p01[c] as f32,
                p11[c] as f32,
                xs.frac[x],
                ys.frac[y]
            );
            *out = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(px)
    })
}

#[inline]
fn lerp2(p00: f32, p10: f32, p01: f32, p11: f32, fx: f32, fy: f32) -> f32 {
    let top = p00 + (p10 - p00) * fx;
    let bottom = p01 + (p11 - p01) * fx;
    top + (bottom - top) * fy
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Taps {
    fn with_capacity(n: usize) -> Self {
        Self {
            i0: Vec::with_capacity(n),
            i1: Vec::with_capacity(n),
            frac: Vec::with_capacity(n)
        }
    }

    fn push(&mut self, src: f32, in_len: usize) {
        let max = in_len.saturating_sub(1);
        let src = src.clamp(0.0, max as f32);
        let i0 = (src.floor() as usize).min(max);

        self.i0.push(i0);
        self.i1.push((i0 + 1).min(max));
        self.frac.push(src - i0 as f32);
    }

    fn half_pixel(in_len: usize, out_len: usize) -> Self {
        let scale = in_len as f32 / out_len.max(1) as f32;
        let mut taps = Self::with_capacity(out_len);

        for o in 0..out_len {
            taps.push((o as f32 + 0.5) * scale - 0.5, in_len);
        }

        taps
    }

    fn align_corners(in_len: usize, out_len: usize) -> Self {
        let scale = match out_len {
            0 | 1 => 0.0,
            _ => (in_len.saturating_sub(1)) as f32 / (out_len - 1) as f32
        };
        let mut taps = Self::with_capacity(out_len);

        for o in 0..out_len {
            taps.push(o as f32 * scale, in_len);
        }

        taps
    }
}
