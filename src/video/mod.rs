//! # Video input and output
//!
//! Side-by-side stereo videos are read frame by frame through a [`FrameSource`], and composed
//! output frames are written through a [`FrameSink`].
//!
//! MJPG AVI files are handled natively. Any other input is decoded by an external `ffmpeg`
//! process.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod avi;
pub mod ffmpeg;

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::RgbImage;
use log::{info, warn};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// A sequential source of RGB video frames.
pub trait FrameSource {
    /// Read the next frame, or `None` once the video is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Nominal frame dimensions.
    fn dimensions(&self) -> (u32, u32);

    /// Nominal frame rate, if the container declares one.
    fn frame_rate(&self) -> Option<f64>;
}

/// A destination for RGB video frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl FrameSink for Vec<RgbImage> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Open a video for reading, choosing the native MJPG AVI reader where possible.
pub fn open_video<P: AsRef<Path>>(path: P) -> Result<Box<dyn FrameSource>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingPath {
            what: "video",
            path: path.to_path_buf()
        });
    }

    if is_avi(path)? {
        match avi::AviReader::open(path) {
            Ok(reader) => {
                info!("Reading {} with the native MJPG AVI reader", path.display());
                return Ok(Box::new(reader));
            },
            Err(Error::Avi(e)) => {
                warn!("Native AVI reader cannot handle {}: {}", path.display(), e);
            },
            Err(e) => return Err(e)
        }
    }

    info!("Reading {} through ffmpeg", path.display());
    Ok(Box::new(ffmpeg::FfmpegReader::open(path)?))
}

/// Check for the `RIFF....AVI ` signature.
fn is_avi(path: &Path) -> Result<bool> {
    let mut sig = [0u8; 12];
    let mut file = File::open(path)?;

    match file.read_exact(&mut sig) {
        Ok(()) => Ok(&sig[0..4] == b"RIFF" && &sig[8..12] == b"AVI "),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into())
    }
}
