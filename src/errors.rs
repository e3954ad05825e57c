//! Custom error types for watermark processing

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Watermarking error types
#[derive(Debug)]
pub enum WatermarkError {
    /// I/O error
    IoError(io::Error),
    /// Error raised by the image codecs
    ImageError(image::ImageError),
    /// File does not start with a JPEG SOI marker
    NotJpeg,
    /// JPEG marker structure is broken
    InvalidJpeg(String),
    /// DFL payload is present but cannot be decoded
    InvalidMetadata(String),
    /// Decoded mask size differs from the declared image shape
    MaskShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// Mask cannot be split into four equal quadrants
    OddMaskDimensions(u32, u32),
    /// Font could not be loaded or parsed
    FontError(String),
    /// Invalid configuration value or file
    ConfigError(String),
    /// Input directory does not exist
    InputNotFound(PathBuf),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkError::IoError(e) => write!(f, "I/O error: {}", e),
            WatermarkError::ImageError(e) => write!(f, "Image error: {}", e),
            WatermarkError::NotJpeg => write!(f, "Not a JPEG file"),
            WatermarkError::InvalidJpeg(msg) => write!(f, "Invalid JPEG structure: {}", msg),
            WatermarkError::InvalidMetadata(msg) => write!(f, "Invalid DFL metadata: {}", msg),
            WatermarkError::MaskShapeMismatch { expected, actual } => write!(
                f,
                "Mask size {}x{} does not match image shape {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            WatermarkError::OddMaskDimensions(w, h) => {
                write!(f, "Mask dimensions {}x{} are not both even", w, h)
            }
            WatermarkError::FontError(msg) => write!(f, "Font error: {}", msg),
            WatermarkError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            WatermarkError::InputNotFound(path) => {
                write!(f, "Input directory not found: {}", path.display())
            }
            WatermarkError::GenericError(msg) => write!(f, "Watermark error: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatermarkError::IoError(e) => Some(e),
            WatermarkError::ImageError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WatermarkError {
    fn from(error: io::Error) -> Self {
        WatermarkError::IoError(error)
    }
}

impl From<image::ImageError> for WatermarkError {
    fn from(error: image::ImageError) -> Self {
        WatermarkError::ImageError(error)
    }
}

/// Result type for watermark operations
pub type WatermarkResult<T> = Result<T, WatermarkError>;

impl From<String> for WatermarkError {
    fn from(msg: String) -> Self {
        WatermarkError::GenericError(msg)
    }
}
