//! # Colour maps
//!
//! Maps normalised 8-bit disparity images onto RGB for visualisation.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::str::FromStr;

use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::Deserialize;

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Polynomial coefficients (c0..c6) of a least squares fit to matplotlib's inferno map, one
/// array per channel.
const INFERNO_COEFFS: [[f64; 3]; 7] = [
    [0.000_218_940_369_119_226_5, 0.001_651_004_631_001_012, -0.019_480_898_437_091_84],
    [0.106_513_419_485_611_6, 0.563_956_436_788_409_1, 3.932_712_388_889_277],
    [11.602_493_082_471_87, -3.972_853_965_665_698, -15.942_394_106_291_4],
    [-41.703_996_131_394_59, 17.436_398_882_053_13, 44.354_145_198_728_13],
    [77.162_935_699_427, -33.402_358_942_100_92, -81.807_309_257_389_93],
    [-71.319_428_244_992_14, 32.626_064_263_977_23, 73.209_519_858_032_02],
    [25.131_126_224_773_41, -12.242_668_952_385_67, -23.070_325_002_871_72],
];

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Inferno,
    #[serde(alias = "grey")]
    Gray
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A 256 entry lookup table for a colour map.
#[derive(Clone)]
pub struct ColorLut {
    table: [Rgb<u8>; 256]
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Colormap {
    /// Build the lookup table for this map.
    pub fn lut(&self) -> ColorLut {
        let mut table = [Rgb([0u8; 3]); 256];

        for (i, entry) in table.iter_mut().enumerate() {
            *entry = match self {
                Colormap::Gray => Rgb([i as u8; 3]),
                Colormap::Inferno => inferno(i as f64 / 255.0)
            };
        }

        ColorLut { table }
    }

    /// Colourise the given image. Prefer building a [`ColorLut`] once when mapping many frames.
    pub fn apply(&self, gray: &GrayImage) -> RgbImage {
        self.lut().apply(gray)
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inferno" => Ok(Colormap::Inferno),
            "gray" | "grey" => Ok(Colormap::Gray),
            _ => Err(Error::UnknownColormap(s.into()))
        }
    }
}

impl ColorLut {
    pub fn get(&self, val: u8) -> Rgb<u8> {
        self.table[val as usize]
    }

    pub fn apply(&self, gray: &GrayImage) -> RgbImage {
        imageproc::map::map_colors(gray, |Luma([v])| self.get(v))
    }
}

/// Evaluate the inferno fit at `t` in [0, 1].
fn inferno(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mut rgb = [0u8; 3];

    for (c, out) in rgb.iter_mut().enumerate() {
        // Horner's scheme from the highest order term down
        let val = INFERNO_COEFFS
            .iter()
            .rev()
            .fold(0.0, |acc, coeffs| acc * t + coeffs[c]);

        *out = (val.clamp(0.0, 1.0) * 255.0).round() as u8;
    }

    Rgb(rgb)
}
