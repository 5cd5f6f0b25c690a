//! # Two pass disparity inference
//!
//! The network is first run on a half resolution copy of the pair. Its prediction then seeds a
//! second pass at full evaluation resolution, which converges faster and more reliably than an
//! unseeded pass at that size.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::Instant;

use log::debug;
use ndarray::{s, Array4};

use crate::disparity::DisparityMap;
use crate::error::*;
use crate::frame::StereoFrame;
use crate::model::StereoModel;
use crate::tensor::{image_to_tensor, interpolate_align_corners};

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Predict the disparity of an evaluation sized stereo pair.
///
/// The returned map has the dimensions of the input pair, in pixels of that resolution.
pub fn inference<M: StereoModel + ?Sized>(
    frame: &StereoFrame,
    model: &mut M
) -> Result<DisparityMap> {
    debug!("Model Forwarding...");

    let img_l = image_to_tensor(&frame.left);
    let img_r = image_to_tensor(&frame.right);
    let (_, _, h, w) = img_l.dim();

    let img_l_dw2 = interpolate_align_corners(&img_l, h / 2, w / 2);
    let img_r_dw2 = interpolate_align_corners(&img_r, h / 2, w / 2);

    let start = Instant::now();
    let pred_flow_dw2 = model.forward(&img_l_dw2, &img_r_dw2, None)?;
    check_flow(&pred_flow_dw2, h / 2, w / 2)?;
    debug!("Coarse pass took {:?}", start.elapsed());

    let start = Instant::now();
    let pred_flow = model.forward(&img_l, &img_r, Some(&pred_flow_dw2))?;
    check_flow(&pred_flow, h, w)?;
    debug!("Refinement pass took {:?}", start.elapsed());

    DisparityMap::from_view(pred_flow.slice(s![0, 0, .., ..]))
}

/// Check a predicted flow is `[1, C, h, w]` with at least one channel.
fn check_flow(flow: &Array4<f32>, h: usize, w: usize) -> Result<()> {
    let (n, c, fh, fw) = flow.dim();

    if n != 1 || c == 0 || fh != h || fw != w {
        return Err(Error::Model(format!(
            "expected a [1, 2, {}, {}] flow, the network produced {:?}",
            h,
            w,
            flow.shape()
        )));
    }

    Ok(())
}
