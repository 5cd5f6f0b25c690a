//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use cv_crestereo::prelude::*;
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Records the shapes it is called with and predicts a disparity equal to the column index.
#[derive(Default)]
pub struct RampModel {
    /// (left image shape, flow seed shape) per call.
    pub calls: Vec<((usize, usize, usize, usize), Option<(usize, usize, usize, usize)>)>
}

impl StereoModel for RampModel {
    fn forward(
        &mut self,
        left: &Array4<f32>,
        right: &Array4<f32>,
        flow_init: Option<&Array4<f32>>
    ) -> Result<Array4<f32>> {
        assert_eq!(left.dim(), right.dim());
        self.calls.push((left.dim(), flow_init.map(|f| f.dim())));

        let (_, _, h, w) = left.dim();
        Ok(Array4::from_shape_fn((1, 2, h, w), |(_, c, _, x)| match c {
            0 => x as f32,
            _ => 0.0
        }))
    }
}

/// Serves frames from memory.
pub struct VecSource {
    pub frames: std::vec::IntoIter<RgbImage>,
    pub dims: (u32, u32)
}

impl VecSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let dims = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            frames: frames.into_iter(),
            dims
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.next())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dims
    }

    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

/// A side-by-side frame whose left half is `left` and right half is `right`.
pub fn side_by_side(half_w: u32, h: u32, left: [u8; 3], right: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(half_w * 2, h, |x, _| match x < half_w {
        true => Rgb(left),
        false => Rgb(right)
    })
}

pub fn small_params() -> Params {
    Params {
        size: "16x32".into(),
        ..Params::default()
    }
}
