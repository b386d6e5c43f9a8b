use crate::audio::SampleBlock;
use crate::color::{Color, ColorMapper};
use crate::strip::{render, Frame};
use crate::config::RenderConfig;
use std::collections::VecDeque;

/// Sliding window of the most recent sample colors
///
/// Oldest color first. Never holds more than `max_blocks` colors; each push
/// past capacity evicts from the front.
pub struct LiveStrip {
    colors: VecDeque<Color>,
    max_blocks: usize,
    mapper: ColorMapper,
    malformed: u64,
}

impl LiveStrip {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            colors: VecDeque::with_capacity(config.max_blocks()),
            max_blocks: config.max_blocks(),
            mapper: ColorMapper::new(config.color_mode()),
            malformed: 0,
        }
    }

    /// Map one sample and append its color
    pub fn push_sample(&mut self, sample: f32) {
        if ColorMapper::is_malformed(sample) {
            self.malformed += 1;
        }
        if self.colors.len() == self.max_blocks {
            self.colors.pop_front();
        }
        self.colors.push_back(self.mapper.map(sample));
    }

    /// Append mono samples in order
    pub fn extend(&mut self, samples: &[f32]) {
        // Only the tail can survive eviction
        let skip = samples.len().saturating_sub(self.max_blocks);
        for &s in &samples[skip..] {
            self.push_sample(s);
        }
        self.malformed += samples[..skip]
            .iter()
            .filter(|s| ColorMapper::is_malformed(**s))
            .count() as u64;
    }

    /// Down-mix a captured block and append it
    pub fn push_block(&mut self, block: &SampleBlock) {
        if block.channels <= 1 {
            self.extend(&block.samples);
        } else {
            self.extend(&block.to_mono());
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_blocks
    }

    /// Samples that mapped to the black fallback
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    pub fn colors(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter()
    }

    /// Render the current strip
    pub fn render(&self, config: &RenderConfig) -> Frame {
        render(&self.colors, config)
    }
}
