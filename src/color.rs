//! Sample to color mapping
//!
//! Every audio sample becomes one RGB color. The mapping is pure and total:
//! out-of-range samples are clamped to [-1, 1] and non-finite samples map to
//! black.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest positive value of a signed 24-bit sample
const PACKED_MAX_AMPLITUDE: f64 = 8_388_607.0;

/// An RGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Padding and fallback color
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// How sample amplitude is turned into color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Cubic-emphasized amplitude drives the hue at full saturation and value
    #[default]
    Hue,
    /// The sample as a signed 24-bit integer, its three bytes read as R, G, B
    Packed,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hue" => Ok(ColorMode::Hue),
            "packed" | "packed24" => Ok(ColorMode::Packed),
            other => Err(format!("unknown color mode '{}' (expected hue or packed)", other)),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Hue => write!(f, "hue"),
            ColorMode::Packed => write!(f, "packed"),
        }
    }
}

/// Maps audio samples to colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorMapper {
    mode: ColorMode,
}

impl ColorMapper {
    pub fn new(mode: ColorMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Map one sample to a color
    ///
    /// Samples outside [-1, 1] are clamped. NaN and infinities cannot be
    /// placed on the color wheel and come back as black.
    pub fn map(&self, sample: f32) -> Color {
        if !sample.is_finite() {
            return Color::BLACK;
        }
        let sample = f64::from(sample).clamp(-1.0, 1.0);
        match self.mode {
            ColorMode::Hue => hue_color(sample),
            ColorMode::Packed => packed_color(sample),
        }
    }

    /// Whether a sample would take the malformed (black) fallback
    pub fn is_malformed(sample: f32) -> bool {
        !sample.is_finite()
    }
}

fn hue_color(sample: f64) -> Color {
    let normalized = (sample + 1.0) / 2.0;
    let hue = normalized.powi(3);
    let (r, g, b) = hsv_to_rgb(hue, 1.0, 1.0);
    Color::new(to_channel(r), to_channel(g), to_channel(b))
}

fn packed_color(sample: f64) -> Color {
    // `as` truncates toward zero, then the two's complement bits are masked to 24
    let value = (sample * PACKED_MAX_AMPLITUDE) as i32;
    let bits = (value as u32) & 0x00FF_FFFF;
    Color::new((bits >> 16) as u8, (bits >> 8) as u8, bits as u8)
}

/// Truncating scale of a [0, 1] channel to [0, 255]
fn to_channel(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0) as u8
}

/// Standard HSV to RGB conversion, all components in [0, 1]
///
/// A hue of exactly 1.0 wraps to the same sector as 0.0.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let scaled = h * 6.0;
    let sector = scaled.floor();
    let f = scaled - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
