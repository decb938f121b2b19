use thiserror::Error;

use crate::frame::FrameKey;

#[derive(Error, Debug)]
pub enum DefmapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Frame source unavailable for {key}: {reason}")]
    SourceUnavailable { key: FrameKey, reason: String },

    #[error("No frames matching the naming convention")]
    NoFrames,

    #[error("Slice {slice} has {frames} frame(s); at least 2 are needed to form a pair")]
    EmptyInput { slice: u32, frames: usize },

    #[error("Invalid stack: {0}")]
    InvalidStack(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl DefmapError {
    /// True for errors that abort a whole slice (missing frames, empty
    /// sequences, mismatched dimensions).
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::EmptyInput { .. }
                | Self::ShapeMismatch { .. }
                | Self::InvalidCrop(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DefmapError>;
