//! # Disparity maps
//!
//! This module provides the floating point disparity map produced by the stereo network, and its
//! conversions for visualisation and storage.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::ArrayView2;

use crate::error::*;
use crate::tensor::resize_linear_f32;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// A 16 bit greyscale image.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Fixed point scale used when storing disparity as 16 bit PNG.
pub const PNG16_SCALE: f32 = 256.0;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A floating point disparity map, stored row major.
#[derive(Clone, Debug, PartialEq)]
pub struct DisparityMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
    pub min_disp: f32,
    pub max_disp: f32
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl DisparityMap {
    /// Create a map from row major data, computing the disparity range.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::Model(format!(
                "disparity data has {} values, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }

        let (min_disp, max_disp) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Ok(Self {
            width,
            height,
            data,
            min_disp,
            max_disp
        })
    }

    /// Create a map from a 2D `[H, W]` view.
    pub fn from_view(view: ArrayView2<f32>) -> Result<Self> {
        let (h, w) = view.dim();
        Self::from_vec(w, h, view.iter().copied().collect())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Resize the map to the given resolution, scaling disparity values by the horizontal
    /// resize factor so they remain in pixels of the new resolution.
    pub fn rescaled(&self, width: usize, height: usize) -> Result<Self> {
        let t = width as f32 / self.width as f32;
        let view = ArrayView2::from_shape((self.height, self.width), &self.data)?;

        let data = resize_linear_f32(view, width, height)
            .into_iter()
            .map(|d| d * t)
            .collect();

        Self::from_vec(width, height, data)
    }

    /// Converts the map to a min-max normalised GrayImage.
    ///
    /// The smallest disparity maps to 0 and the largest to 255. A map with a single value
    /// throughout maps to all zeros.
    pub fn to_luma_normalised(&self) -> GrayImage {
        let range = self.max_disp - self.min_disp;

        if !(range.is_finite() && range > 0.0) {
            return GrayImage::new(self.width as u32, self.height as u32);
        }

        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let val = (self.get(x as usize, y as usize) - self.min_disp) / range * 255.0;
            Luma([val.clamp(0.0, 255.0) as u8])
        })
    }

    /// Converts the map into a 16 bit image of disparity multiplied by [`PNG16_SCALE`].
    pub fn to_png16(&self) -> Gray16Image {
        Gray16Image::from_fn(self.width as u32, self.height as u32, |x, y| {
            let val = self.get(x as usize, y as usize) * PNG16_SCALE;
            Luma([val.round().clamp(0.0, u16::MAX as f32) as u16])
        })
    }

    /// Save the map as a 16 bit PNG, see [`DisparityMap::to_png16`].
    pub fn save_png16<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_png16()
            .save_with_format(path, ImageFormat::Png)
            .map_err(Error::from)
    }
}
