//! Unified error types for chromastrip

use std::path::Path;
use thiserror::Error;

/// Main error type for chromastrip operations
#[derive(Error, Debug)]
pub enum StripError {
    /// Audio file could not be read or decoded
    #[error("Failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    /// Video writer failed
    #[error("Video encoding failed: {0}")]
    Encoding(String),

    /// Capture device failed to open or stream
    #[error("Capture error: {0}")]
    Capture(String),

    /// No input device to capture from
    #[error("No audio input device available")]
    NoInputDevice,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Display surface failed
    #[error("Display error: {0}")]
    Display(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for chromastrip operations
pub type Result<T> = std::result::Result<T, StripError>;

impl StripError {
    /// Create a decode error for the given file
    pub fn decode(path: &Path, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }
}
