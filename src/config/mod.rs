//! Render configuration, CLI arguments and config file support

mod args;
mod file;

pub use args::{Args, Command, EncoderKind, RenderArgs};
pub use file::{ConfigError, FileConfig};

use crate::color::ColorMode;
use crate::error::{Result, StripError};
use std::fmt;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_STRIP_WIDTH: u32 = 2;

/// Output raster size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable render configuration
///
/// `max_blocks` is derived once at construction and never changes for the
/// lifetime of the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    sample_rate: u32,
    frame_rate: u32,
    resolution: Resolution,
    strip_width: u32,
    color_mode: ColorMode,
    max_blocks: usize,
}

impl RenderConfig {
    /// Create a validated configuration
    pub fn new(
        sample_rate: u32,
        frame_rate: u32,
        resolution: Resolution,
        strip_width: u32,
        color_mode: ColorMode,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StripError::InvalidConfig(
                "sample_rate must be positive".into(),
            ));
        }
        if frame_rate == 0 {
            return Err(StripError::InvalidConfig("frame_rate must be positive".into()));
        }
        if strip_width == 0 {
            return Err(StripError::InvalidConfig(
                "strip_width must be positive".into(),
            ));
        }
        if resolution.height == 0 {
            return Err(StripError::InvalidConfig("height must be positive".into()));
        }
        if resolution.width < strip_width {
            return Err(StripError::InvalidConfig(format!(
                "width {} cannot fit a single {}px strip",
                resolution.width, strip_width
            )));
        }

        Ok(Self {
            sample_rate,
            frame_rate,
            resolution,
            strip_width,
            color_mode,
            max_blocks: (resolution.width / strip_width) as usize,
        })
    }

    /// Same configuration at a different sample rate
    ///
    /// Used when the decoded file or the capture device dictates the rate.
    pub fn with_sample_rate(&self, sample_rate: u32) -> Result<Self> {
        Self::new(
            sample_rate,
            self.frame_rate,
            self.resolution,
            self.strip_width,
            self.color_mode,
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn strip_width(&self) -> u32 {
        self.strip_width
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Number of color blocks that fit across the frame
    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Samples elapsed per output frame, not truncated
    pub fn samples_per_frame(&self) -> f64 {
        self.sample_rate as f64 / self.frame_rate as f64
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_rate: DEFAULT_FRAME_RATE,
            resolution: Resolution::default(),
            strip_width: DEFAULT_STRIP_WIDTH,
            color_mode: ColorMode::Hue,
            max_blocks: (DEFAULT_WIDTH / DEFAULT_STRIP_WIDTH) as usize,
        }
    }
}

impl fmt::Display for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz {}fps {} strip={}px blocks={} mode={}",
            self.sample_rate,
            self.frame_rate,
            self.resolution,
            self.strip_width,
            self.max_blocks,
            self.color_mode
        )
    }
}
