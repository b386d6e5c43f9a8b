//! Frame consumers: the live display and the offline video writers

mod display;
mod encoder;

pub use display::{DisplaySurface, TerminalDisplay};
pub use encoder::{EncodeJob, FfmpegEncoder, FrameSource, PngSequenceEncoder, VideoEncoder};
