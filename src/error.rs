//! # Error standards
//!
//! This module provides a standardised error enum and result type for this crate.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Standard result type used in the crestereo crate.
pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The {what} path does not exist: {path:?}")]
    MissingPath {
        what: &'static str,
        path: PathBuf
    },

    #[error("Invalid evaluation size {0:?}: {1}")]
    InvalidSize(String, &'static str),

    #[error("The input images have inconsistent shapes: left {left:?}, right {right:?}")]
    ShapeMismatch {
        left: (u32, u32),
        right: (u32, u32)
    },

    #[error("Stereo model error: {0}")]
    Model(String),

    #[error("ONNX Runtime error: {0}")]
    Runtime(#[from] ort::Error),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed AVI file: {0}")]
    Avi(String),

    #[error("Video writer error: {0}")]
    Writer(String),

    #[error("External decoder error: {0}")]
    Decoder(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown colour map {0:?}, expected one of: inferno, gray")]
    UnknownColormap(String),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[cfg(feature = "statistics")]
    #[error("Statistics plotting error: {0}")]
    Statistics(String),

    #[cfg(feature = "preview")]
    #[error("Preview window error: {0}")]
    Preview(String)
}
