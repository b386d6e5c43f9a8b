use crate::color::{Color, ColorMapper, ColorMode};
use crate::config::RenderConfig;
use crate::strip::{render, Frame};
use std::sync::Arc;
use tracing::{debug, warn};

/// Conversion progress is logged every this many samples
const PROGRESS_INTERVAL: usize = 100_000;

/// The full, immutable color sequence of a track, one color per sample
#[derive(Debug, Clone)]
pub struct ColorTrack {
    colors: Arc<[Color]>,
    malformed: usize,
}

impl ColorTrack {
    /// Map every sample once
    ///
    /// A sample that cannot be mapped becomes black and conversion goes on.
    pub fn from_samples(samples: &[f32], mode: ColorMode) -> Self {
        let mapper = ColorMapper::new(mode);
        let mut malformed = 0usize;
        let mut colors = Vec::with_capacity(samples.len());

        for (idx, &sample) in samples.iter().enumerate() {
            if ColorMapper::is_malformed(sample) {
                malformed += 1;
            }
            colors.push(mapper.map(sample));
            if (idx + 1) % PROGRESS_INTERVAL == 0 {
                debug!("Converted {} / {} samples to colors", idx + 1, samples.len());
            }
        }

        if malformed > 0 {
            warn!("{} samples could not be mapped and were drawn black", malformed);
        }

        Self {
            colors: colors.into(),
            malformed,
        }
    }

    pub fn from_colors(colors: Vec<Color>) -> Self {
        Self {
            colors: colors.into(),
            malformed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.colors
    }
}

/// Computes the frame shown at any time of an offline render
///
/// Pure over an immutable [`ColorTrack`]: any call order, repeated calls and
/// concurrent calls all give the same frame for the same time.
#[derive(Debug, Clone)]
pub struct FrameSynthesizer {
    track: ColorTrack,
    config: RenderConfig,
}

impl FrameSynthesizer {
    pub fn new(track: ColorTrack, config: RenderConfig) -> Self {
        Self { track, config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn track(&self) -> &ColorTrack {
        &self.track
    }

    /// Frame number for a time in seconds: `floor(t * frame_rate)`
    pub fn frame_number(&self, t: f64) -> u64 {
        (t.max(0.0) * self.config.frame_rate() as f64).floor() as u64
    }

    /// Exclusive end index of the window for a frame
    ///
    /// The window is the newest `max_blocks` colors before this index, so
    /// samples between consecutive frames beyond the window width are never
    /// shown.
    pub fn end_index(&self, frame_number: u64) -> usize {
        let start = (frame_number as f64 * self.config.samples_per_frame()).floor() as usize;
        start + self.config.max_blocks()
    }

    /// Strip for a frame, left-padded with black to exactly `max_blocks`
    pub fn window(&self, frame_number: u64) -> Vec<Color> {
        let max_blocks = self.config.max_blocks();
        let colors = self.track.as_slice();

        let end = self.end_index(frame_number);
        let start = end.saturating_sub(max_blocks);
        let visible = &colors[start.min(colors.len())..end.min(colors.len())];

        let mut window = Vec::with_capacity(max_blocks);
        window.resize(max_blocks - visible.len(), Color::BLACK);
        window.extend_from_slice(visible);
        window
    }

    /// Frame shown at time `t` seconds
    pub fn synthesize(&self, t: f64) -> Frame {
        self.synthesize_frame(self.frame_number(t))
    }

    /// Frame for a frame number
    pub fn synthesize_frame(&self, frame_number: u64) -> Frame {
        render(&self.window(frame_number), &self.config)
    }

    /// Number of frames covering `duration_secs`
    pub fn frame_count(&self, duration_secs: f64) -> u64 {
        (duration_secs.max(0.0) * self.config.frame_rate() as f64).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;
    use std::thread;

    fn config(sample_rate: u32, fps: u32, width: u32, strip_width: u32) -> RenderConfig {
        RenderConfig::new(
            sample_rate,
            fps,
            Resolution::new(width, 10),
            strip_width,
            ColorMode::Hue,
        )
        .unwrap()
    }

    fn numbered(n: usize) -> ColorTrack {
        ColorTrack::from_colors((0..n).map(|i| Color::new(i as u8, 1, 1)).collect())
    }

    #[test]
    fn test_end_to_end_three_samples() {
        let track = ColorTrack::from_samples(&[-1.0, 0.0, 1.0], ColorMode::Hue);
        let synth = FrameSynthesizer::new(track, config(44_100, 60, 6, 2));

        let frame = synth.synthesize(0.0);
        assert_eq!(frame.dimensions(), (6, 10));
        let row: Vec<[u8; 3]> = (0..6).map(|x| frame.get_pixel(x, 4).0).collect();
        assert_eq!(
            row,
            vec![
                [255, 0, 0],
                [255, 0, 0],
                [255, 191, 0],
                [255, 191, 0],
                [255, 0, 0],
                [255, 0, 0]
            ]
        );
    }

    #[test]
    fn test_window_is_newest_blocks_before_end() {
        // 100 samples per frame, 4 blocks
        let synth = FrameSynthesizer::new(numbered(1000), config(6_000, 60, 8, 2));
        assert_eq!(synth.end_index(0), 4);
        assert_eq!(synth.end_index(3), 304);

        let window = synth.window(3);
        let reds: Vec<u8> = window.iter().map(|c| c.r).collect();
        // colors 300..304, the 96 samples between frames are skipped
        assert_eq!(reds, vec![44, 45, 46, 47]);
    }

    #[test]
    fn test_fractional_samples_per_frame_not_truncated() {
        // 44100 / 60 = 735, 22050 / 60 = 367.5
        let synth = FrameSynthesizer::new(numbered(2000), config(22_050, 60, 4, 2));
        assert_eq!(synth.end_index(1), 367 + 2);
        assert_eq!(synth.end_index(2), 735 + 2);
        assert_eq!(synth.end_index(3), 1102 + 2);
    }

    #[test]
    fn test_short_track_is_left_padded() {
        let synth = FrameSynthesizer::new(numbered(3), config(44_100, 60, 10, 2));
        let window = synth.window(0);
        assert_eq!(window.len(), 5);
        assert_eq!(&window[..2], &[Color::BLACK, Color::BLACK]);
        assert_eq!(window[2], Color::new(0, 1, 1));

        let frame = synth.synthesize(0.0);
        for x in 0..4 {
            assert_eq!(frame.get_pixel(x, 0).0, [0, 0, 0]);
        }
        assert_eq!(frame.get_pixel(4, 0).0, [0, 1, 1]);
    }

    #[test]
    fn test_past_end_of_track_is_all_black() {
        let synth = FrameSynthesizer::new(numbered(10), config(600, 60, 8, 2));
        assert!(synth.window(50).iter().all(|c| *c == Color::BLACK));
    }

    #[test]
    fn test_frame_number_from_time() {
        let synth = FrameSynthesizer::new(numbered(1), config(44_100, 60, 4, 2));
        assert_eq!(synth.frame_number(0.0), 0);
        assert_eq!(synth.frame_number(0.5), 30);
        assert_eq!(synth.frame_number(0.0166), 0);
        assert_eq!(synth.frame_number((1.0 - 1e-8) / 60.0), 0);
        assert_eq!(synth.frame_number(1.0 / 60.0), 1);
        assert_eq!(synth.frame_number(-1.0), 0);
    }

    #[test]
    fn test_frame_midpoints_map_back_to_their_frame() {
        for fps in [24, 25, 30, 60] {
            let synth = FrameSynthesizer::new(numbered(1), config(44_100, fps, 4, 2));
            for i in 0..10_000u64 {
                let t = (i as f64 + 0.5) / fps as f64;
                assert_eq!(synth.frame_number(t), i, "fps {} frame {}", fps, i);
            }
        }
    }

    #[test]
    fn test_frame_count_rounds_up() {
        let synth = FrameSynthesizer::new(numbered(1), config(44_100, 60, 4, 2));
        assert_eq!(synth.frame_count(1.0), 60);
        assert_eq!(synth.frame_count(1.001), 61);
        assert_eq!(synth.frame_count(0.0), 0);
    }

    #[test]
    fn test_repeated_and_concurrent_calls_are_identical() {
        let samples: Vec<f32> = (0..20_000).map(|i| (i as f32 * 0.01).sin()).collect();
        let track = ColorTrack::from_samples(&samples, ColorMode::Hue);
        let synth = FrameSynthesizer::new(track, config(44_100, 30, 64, 2));

        let first = synth.synthesize(0.25);
        let second = synth.synthesize(0.25);
        assert_eq!(first.as_raw(), second.as_raw());

        // Out of order and from several threads at once
        let frames: Vec<Vec<u8>> = thread::scope(|s| {
            let handles: Vec<_> = [0.4, 0.1, 0.25, 0.0]
                .iter()
                .map(|&t| {
                    let synth = &synth;
                    s.spawn(move || synth.synthesize(t).into_raw())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(frames[2], first.into_raw());
        assert_eq!(frames[3], synth.synthesize(0.0).into_raw());
    }

    #[test]
    fn test_silent_track_is_uniform() {
        let track = ColorTrack::from_samples(&vec![0.0; 500], ColorMode::Hue);
        let synth = FrameSynthesizer::new(track, config(44_100, 60, 20, 2));
        let window = synth.window(0);
        assert!(window.iter().all(|c| *c == Color::new(255, 191, 0)));

        let packed = ColorTrack::from_samples(&vec![0.0; 500], ColorMode::Packed);
        assert!(packed.as_slice().iter().all(|c| *c == Color::BLACK));
    }

    #[test]
    fn test_malformed_samples_become_black() {
        let track = ColorTrack::from_samples(&[0.0, f32::NAN, 1.0], ColorMode::Hue);
        assert_eq!(track.malformed(), 1);
        assert_eq!(
            track.as_slice(),
            &[Color::new(255, 191, 0), Color::BLACK, Color::RED]
        );
    }
}
