//! # Run parameters
//!
//! Parameters controlling a disparity video run. These may be loaded from a TOML file and are
//! then overridden field by field from the command line.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::colormap::Colormap;
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Default evaluation size, height first.
pub const DEFAULT_SIZE: &str = "1024x1536";

/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 10;

/// Default JPEG quality of the output frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Evaluation dimensions must be divisible by this so the half resolution coarse pass still
/// lands on the network's 1/8 feature grid.
pub const SIZE_ALIGNMENT: u32 = 16;

/// Largest accepted evaluation height or width. Output frames are three evaluation widths wide
/// and JPEG frames are limited to 65535 pixels a side.
pub const MAX_EVAL_DIM: u32 = 8192;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// The size images are resized to before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalSize {
    pub height: u32,
    pub width: u32
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    /// Evaluation size as `HxW`.
    pub size: String,
    pub fps: u32,
    pub jpeg_quality: u8,
    pub colormap: Colormap,
    pub intra_threads: Option<usize>,
    pub max_frames: Option<usize>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl EvalSize {
    /// Parse a size string of the form `HxW`, height first.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('x');

        let (h, w) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(w), None) => (h, w),
            _ => return Err(Error::InvalidSize(s.into(), "expected HxW"))
        };

        let height: u32 = h.trim().parse()
            .map_err(|_| Error::InvalidSize(s.into(), "height is not a number"))?;
        let width: u32 = w.trim().parse()
            .map_err(|_| Error::InvalidSize(s.into(), "width is not a number"))?;

        if height == 0 || width == 0 {
            return Err(Error::InvalidSize(s.into(), "dimensions must be non-zero"));
        }
        if height > MAX_EVAL_DIM || width > MAX_EVAL_DIM {
            return Err(Error::InvalidSize(s.into(), "dimensions must be at most 8192"));
        }
        if height % SIZE_ALIGNMENT != 0 || width % SIZE_ALIGNMENT != 0 {
            return Err(Error::InvalidSize(s.into(), "dimensions must be multiples of 16"));
        }

        Ok(Self { height, width })
    }

    /// Size of the coarse pass.
    pub fn half(&self) -> (u32, u32) {
        (self.height / 2, self.width / 2)
    }
}

impl FromStr for EvalSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for EvalSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE.into(),
            fps: DEFAULT_FPS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            colormap: Colormap::default(),
            intra_threads: None,
            max_frames: None
        }
    }
}

impl Params {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load parameters from a TOML file, any missing key taking its default value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingPath {
                what: "config",
                path: path.to_path_buf()
            });
        }

        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn eval_size(&self) -> Result<EvalSize> {
        EvalSize::parse(&self.size)
    }
}
