//! Runs a stereo disparity network over a side-by-side stereo video and writes an MJPG AVI of
//! `left | right | disparity` frames.
//!
//! Usage:
//!   crestereo-video --model_path crestereo_eth3d.onnx --video_path stereo.mp4 --size 768x1024

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use cv_crestereo::colormap::Colormap;
use cv_crestereo::model::load_model;
use cv_crestereo::params::Params;
use cv_crestereo::pipeline::Pipeline;
use cv_crestereo::video::{avi::MjpegAviWriter, open_video};
use cv_crestereo::Error;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "crestereo-video", about = "A demo to run CREStereo on stereo videos.")]
struct Args {
    /// The path of the pre-trained ONNX model.
    #[arg(long = "model_path", default_value = "crestereo_eth3d.onnx")]
    model_path: PathBuf,

    /// Optional network for the half resolution pass, taking no flow seed.
    #[arg(long = "init_model_path")]
    init_model_path: Option<PathBuf>,

    /// The image size for inference as HxW. The default is 1024x1536; to evaluate on the ETH3D
    /// benchmark use 768x1024 instead.
    #[arg(long)]
    size: Option<String>,

    /// The path of the output disparity video.
    #[arg(long, default_value = "disparity.avi")]
    output: PathBuf,

    /// The path of the side-by-side stereo video.
    #[arg(long = "video_path", default_value = "stereo.avi")]
    video_path: PathBuf,

    /// TOML file of run parameters. Command line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Colour map of the disparity panel: inferno or gray.
    #[arg(long)]
    colormap: Option<Colormap>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many frames.
    #[arg(long = "max_frames")]
    max_frames: Option<usize>,

    /// Directory to save input resolution disparity into, as 16 bit PNGs of disparity * 256.
    #[arg(long = "save_disparity")]
    save_disparity: Option<PathBuf>,

    /// Show frames in a window while processing.
    #[cfg(feature = "preview")]
    #[arg(long)]
    preview: bool,

    /// Plot the per frame disparity range to this PNG.
    #[cfg(feature = "statistics")]
    #[arg(long)]
    stats: Option<PathBuf>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Args {
    /// Merge the config file, if any, with the command line.
    fn params(&self) -> cv_crestereo::Result<Params> {
        let mut params = match &self.config {
            Some(path) => Params::from_file(path)?,
            None => Params::default()
        };

        if let Some(size) = &self.size {
            params.size = size.clone();
        }
        if let Some(colormap) = self.colormap {
            params.colormap = colormap;
        }
        if let Some(fps) = self.fps {
            params.fps = fps;
        }
        if self.max_frames.is_some() {
            params.max_frames = self.max_frames;
        }

        Ok(params)
    }
}

// -----------------------------------------------------------------------------------------------
// MAIN
// -----------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let params = args.params().context("invalid parameters")?;
    params.eval_size()?;

    for (what, path) in [("model", &args.model_path), ("video", &args.video_path)] {
        if !path.exists() {
            return Err(Error::MissingPath {
                what,
                path: path.clone()
            }.into());
        }
    }

    let mut source = open_video(&args.video_path)
        .with_context(|| format!("failed to open {}", args.video_path.display()))?;
    if let Some(rate) = source.frame_rate() {
        info!("Input runs at {:.2} fps, writing at {} fps", rate, params.fps);
    }

    let model = load_model(
        &args.model_path,
        args.init_model_path.as_deref(),
        params.intra_threads
    ).context("failed to load the stereo model")?;

    let mut pipeline = Pipeline::new(model, &params)?;
    let (out_w, out_h) = pipeline.output_dimensions();
    info!("Writing {}x{} frames to {}", out_w, out_h, args.output.display());

    if let Some(dir) = &args.save_disparity {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut writer = MjpegAviWriter::create(
        &args.output,
        out_w,
        out_h,
        params.fps,
        params.jpeg_quality
    ).with_context(|| format!("failed to create {}", args.output.display()))?;

    #[cfg(feature = "preview")]
    let mut preview = match args.preview {
        true => Some(cv_crestereo::preview::Preview::new(out_w, out_h)?),
        false => None
    };

    let result = pipeline.run(&mut source, &mut writer, |i, output| {
        if let Some(dir) = &args.save_disparity {
            output.disparity.save_png16(dir.join(format!("{:06}.png", i)))?;
        }

        #[cfg(feature = "preview")]
        if let Some(window) = preview.as_mut() {
            if window.is_open() {
                window.show(&output.composed)?;
            }
        }

        Ok(())
    });

    // The output stays playable up to the failing frame
    writer.finish().context("failed to finalise the output video")?;
    let stats = result?;

    #[cfg(feature = "statistics")]
    if let Some(path) = &args.stats {
        cv_crestereo::statistics::plot_disparity_ranges(path, &stats.disparity_ranges)?;
        info!("Disparity statistics plotted to {}", path.display());
    }

    info!("Wrote {} frames to {}", stats.frames, args.output.display());
    Ok(())
}
