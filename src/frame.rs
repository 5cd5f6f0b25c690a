//! # Stereo frames
//!
//! Splitting side-by-side video frames into stereo pairs, and stitching images back together
//! for output.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{imageops, RgbImage};

use crate::error::*;
use crate::params::EvalSize;
use crate::tensor::resize_rgb_linear;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A left/right image pair of identical dimensions.
#[derive(Clone, Debug)]
pub struct StereoFrame {
    pub left: RgbImage,
    pub right: RgbImage
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StereoFrame {
    /// Build a frame from two images, checking that their shapes agree.
    pub fn new(left: RgbImage, right: RgbImage) -> Result<Self> {
        if left.dimensions() != right.dimensions() {
            return Err(Error::ShapeMismatch {
                left: left.dimensions(),
                right: right.dimensions()
            });
        }

        Ok(Self { left, right })
    }

    /// Split a side-by-side frame down the middle, left view on the left.
    ///
    /// The left view covers columns `[0, cols / 2)` and the right view `[cols / 2, cols)`, so a
    /// frame with an odd number of columns produces views of different shapes and is rejected.
    pub fn split_side_by_side(frame: &RgbImage) -> Result<Self> {
        let (cols, rows) = frame.dimensions();
        let half = cols / 2;

        if half == 0 || rows == 0 {
            return Err(Error::ShapeMismatch {
                left: (half, rows),
                right: (cols - half, rows)
            });
        }

        let left = imageops::crop_imm(frame, 0, 0, half, rows).to_image();
        let right = imageops::crop_imm(frame, half, 0, cols - half, rows).to_image();

        Self::new(left, right)
    }

    pub fn width(&self) -> u32 {
        self.left.width()
    }

    pub fn height(&self) -> u32 {
        self.left.height()
    }

    /// Resize both views to the evaluation size with bilinear interpolation.
    pub fn resized(&self, size: EvalSize) -> Self {
        Self {
            left: resize_rgb_linear(&self.left, size.width, size.height),
            right: resize_rgb_linear(&self.right, size.width, size.height)
        }
    }
}

/// Concatenate images horizontally. All images must share the same height.
pub fn hconcat(images: &[&RgbImage]) -> Result<RgbImage> {
    let height = match images.first() {
        Some(img) => img.height(),
        None => return Ok(RgbImage::new(0, 0))
    };

    if let Some(bad) = images.iter().find(|img| img.height() != height) {
        return Err(Error::ShapeMismatch {
            left: images[0].dimensions(),
            right: bad.dimensions()
        });
    }

    let width = images.iter().map(|img| img.width()).sum();
    let mut out = RgbImage::new(width, height);

    let mut x = 0i64;
    for img in images {
        imageops::replace(&mut out, *img, x, 0);
        x += img.width() as i64;
    }

    Ok(out)
}
