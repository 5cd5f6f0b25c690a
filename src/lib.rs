//! # CREStereo video disparity
//!
//! This crate runs a pretrained stereo matching network over side-by-side stereo videos,
//! producing colour mapped disparity videos.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod colormap;
pub mod disparity;
mod error;
pub mod frame;
pub mod inference;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod tensor;
pub mod video;

#[cfg(feature = "preview")]
pub mod preview;
#[cfg(feature = "statistics")]
pub mod statistics;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use crate::error::{Error, Result};

pub mod prelude {
    pub use crate::colormap::Colormap;
    pub use crate::disparity::DisparityMap;
    pub use crate::error::{Error, Result};
    pub use crate::frame::StereoFrame;
    pub use crate::inference::inference;
    pub use crate::model::{load_model, StereoModel};
    pub use crate::params::{EvalSize, Params};
    pub use crate::pipeline::Pipeline;
    pub use crate::video::{open_video, FrameSink, FrameSource};
}
