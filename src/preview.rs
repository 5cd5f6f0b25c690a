//! # Live preview
//!
//! Shows composed output frames in a window while a video is processed. Closing the window or
//! pressing escape stops the preview, not the run.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use minifb::{Key, Window, WindowOptions};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct Preview {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Preview {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let (width, height) = (width as usize, height as usize);

        let mut window = Window::new(
            "Stereo Disparity",
            width,
            height,
            WindowOptions::default()
        ).map_err(|e| Error::Preview(e.to_string()))?;

        window.set_target_fps(60);

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Display a frame, which must match the window size.
    pub fn show(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width as u32, self.height as u32) {
            return Err(Error::Preview(format!(
                "frame is {}x{} but the window is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        for (dst, px) in self.buffer.iter_mut().zip(frame.pixels()) {
            *dst = rgb_to_u32(px);
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| Error::Preview(e.to_string()))
    }
}

fn rgb_to_u32(rgb: &Rgb<u8>) -> u32 {
    (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32
}
