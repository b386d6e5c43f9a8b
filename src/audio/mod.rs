//! Audio capture, decoding and the capture-to-render channel

mod buffer;
mod capture;
mod decoder;
pub mod mix;

pub use buffer::{block_channel, BlockConsumer, BlockProducer, ChannelStats};
pub use capture::{
    fault_channel, CaptureFault, CaptureGuard, CaptureSource, DeviceCapture, FaultReceiver,
    FaultSender, ToneCapture,
};
pub use decoder::{decode_file, DecodedAudio};

/// A block of interleaved samples as delivered by a capture callback
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl SampleBlock {
    pub fn new(channels: u16, samples: Vec<f32>) -> Self {
        Self {
            channels: channels.max(1),
            samples,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Mono view of the block, averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        mix::downmix_to_mono(&self.samples, self.channels as usize)
    }
}

/// Format of a capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz {}ch", self.sample_rate, self.channels)
    }
}
