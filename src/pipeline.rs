//! # Disparity video pipeline
//!
//! Runs every frame of a side-by-side stereo video through the network and writes a video of
//! `left | right | disparity` panels.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use image::RgbImage;
use log::{debug, info};

use crate::colormap::ColorLut;
use crate::disparity::DisparityMap;
use crate::error::*;
use crate::frame::{hconcat, StereoFrame};
use crate::inference::inference;
use crate::model::StereoModel;
use crate::params::{EvalSize, Params};
use crate::video::{FrameSink, FrameSource};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Everything produced for a single input frame.
pub struct FrameOutput {
    /// The `left | right | disparity` output frame, at three times the evaluation width.
    pub composed: RgbImage,

    /// Disparity at the input resolution, in input pixels.
    pub disparity: DisparityMap
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub frames: usize,

    /// Per frame (min, max) of the input resolution disparity.
    pub disparity_ranges: Vec<(f32, f32)>,

    pub elapsed: Duration
}

pub struct Pipeline<M: StereoModel> {
    model: M,
    size: EvalSize,
    lut: ColorLut,
    max_frames: Option<usize>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl<M: StereoModel> Pipeline<M> {
    pub fn new(model: M, params: &Params) -> Result<Self> {
        Ok(Self {
            model,
            size: params.eval_size()?,
            lut: params.colormap.lut(),
            max_frames: params.max_frames
        })
    }

    pub fn eval_size(&self) -> EvalSize {
        self.size
    }

    /// Dimensions of the composed output frames.
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.size.width * 3, self.size.height)
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Process one side-by-side frame.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<FrameOutput> {
        let stereo = StereoFrame::split_side_by_side(frame)?;
        let (in_w, in_h) = (stereo.width(), stereo.height());

        let eval = stereo.resized(self.size);
        let pred = inference(&eval, &mut self.model)?;

        // The min-max normalisation is invariant to the disparity scale, so the panel is
        // coloured straight from the evaluation sized prediction
        let disp_vis = self.lut.apply(&pred.to_luma_normalised());
        let composed = compose_output(&eval.left, &eval.right, &disp_vis)?;

        let disparity = pred.rescaled(in_w as usize, in_h as usize)?;

        Ok(FrameOutput {
            composed,
            disparity
        })
    }

    /// Process frames until the source is exhausted or the frame limit is reached.
    ///
    /// `on_frame` is called with the index and output of every frame after it has been written
    /// to the sink.
    pub fn run<S, W, F>(&mut self, source: &mut S, sink: &mut W, mut on_frame: F) -> Result<RunStats>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
        F: FnMut(usize, &FrameOutput) -> Result<()>
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        info!("Images resized: {}", self.size);

        while self.max_frames.map_or(true, |max| stats.frames < max) {
            let frame = match source.next_frame()? {
                Some(f) => f,
                None => break
            };

            let frame_start = Instant::now();
            let output = self.process_frame(&frame)?;
            sink.write_frame(&output.composed)?;

            stats
                .disparity_ranges
                .push((output.disparity.min_disp, output.disparity.max_disp));
            on_frame(stats.frames, &output)?;
            stats.frames += 1;

            debug!(
                "Frame {} disparity {:.2}..{:.2}",
                stats.frames, output.disparity.min_disp, output.disparity.max_disp
            );
            info!("Processed frame {} in {:.2?}", stats.frames, frame_start.elapsed());
        }

        stats.elapsed = start.elapsed();
        info!("Processed {} frames in {:.2?}", stats.frames, stats.elapsed);

        Ok(stats)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Stitch the output frame from the evaluation sized views and the disparity visualisation.
pub fn compose_output(left: &RgbImage, right: &RgbImage, disp_vis: &RgbImage) -> Result<RgbImage> {
    hconcat(&[left, right, disp_vis])
}
