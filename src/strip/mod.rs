//! Color strip model and frame synthesis
//!
//! Two fillers produce the visible strip: [`LiveStrip`] slides over incoming
//! samples and evicts the oldest colors, while [`FrameSynthesizer`] computes
//! the strip for any point in time from a precomputed [`ColorTrack`]. Both
//! hand their strip to [`render`] to get a [`Frame`].

mod frame;
mod live;
mod synth;

pub use frame::{render, Frame};
pub use live::LiveStrip;
pub use synth::{ColorTrack, FrameSynthesizer};
