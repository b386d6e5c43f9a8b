//! chromastrip - audio to color strip visualizer
//!
//! Maps every audio sample to a color and draws the most recent samples as a
//! strip of vertical blocks, either live from an input device or offline
//! from an audio file into a video.

pub mod audio;
pub mod color;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod strip;
pub mod sync;

pub use error::{Result, StripError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
