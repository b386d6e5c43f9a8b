//! Audio capture sources feeding the block channel
//!
//! A capture callback only copies its block into the channel. All mixing and
//! color work happens on the render side.

use crate::audio::{BlockProducer, CaptureFormat, SampleBlock};
use crate::error::{Result, StripError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedBufferSize,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Capacity of the fault status channel
const FAULT_QUEUE: usize = 32;

/// A status or error report from a running capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFault {
    pub message: String,
    /// The stream cannot continue (device removed)
    pub fatal: bool,
}

pub type FaultSender = Sender<CaptureFault>;
pub type FaultReceiver = Receiver<CaptureFault>;

/// Create the bounded status channel a capture source reports faults on
///
/// Faults that do not fit are discarded; the stream is never stalled for them.
pub fn fault_channel() -> (FaultSender, FaultReceiver) {
    bounded(FAULT_QUEUE)
}

/// Something that can deliver audio blocks into the channel
pub trait CaptureSource {
    /// Human readable name for logs
    fn name(&self) -> String;

    /// Start streaming blocks into `producer`
    ///
    /// Capture runs until the returned guard is dropped.
    fn start(&mut self, producer: BlockProducer, faults: FaultSender) -> Result<CaptureGuard>;
}

/// Keeps a capture stream alive; releases it on drop
pub struct CaptureGuard {
    name: String,
    format: CaptureFormat,
    release: Option<Box<dyn FnOnce()>>,
}

impl CaptureGuard {
    pub fn new(name: impl Into<String>, format: CaptureFormat, release: impl FnOnce() + 'static) -> Self {
        Self {
            name: name.into(),
            format,
            release: Some(Box::new(release)),
        }
    }

    pub fn format(&self) -> &CaptureFormat {
        &self.format
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            info!("Capture released: {}", self.name);
        }
    }
}

/// Capture from the default input device
pub struct DeviceCapture {
    requested_rate: Option<u32>,
    block_frames: u32,
}

impl DeviceCapture {
    pub fn new(requested_rate: Option<u32>, block_frames: u32) -> Self {
        Self {
            requested_rate,
            block_frames: block_frames.max(1),
        }
    }

    /// Pick a stream config, honoring the requested rate when the device supports it
    fn pick_config(&self, device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
        if let Some(rate) = self.requested_rate {
            let ranges = device
                .supported_input_configs()
                .map_err(|e| StripError::Capture(e.to_string()))?;
            let mut matching: Vec<_> = ranges
                .filter(|r| r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0)
                .collect();
            // Prefer float streams, then the fewest channels
            matching.sort_by_key(|r| (r.sample_format() != SampleFormat::F32, r.channels()));
            if let Some(range) = matching.into_iter().next() {
                return Ok(range.with_sample_rate(cpal::SampleRate(rate)));
            }
            warn!("Input device does not support {}Hz, using its default rate", rate);
        }

        device
            .default_input_config()
            .map_err(|e| StripError::Capture(e.to_string()))
    }
}

impl CaptureSource for DeviceCapture {
    fn name(&self) -> String {
        "default input device".to_string()
    }

    fn start(&mut self, producer: BlockProducer, faults: FaultSender) -> Result<CaptureGuard> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(StripError::NoInputDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = self.pick_config(&device)?;
        let sample_format = supported.sample_format();
        if !matches!(
            sample_format,
            SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16 | SampleFormat::I32
        ) {
            return Err(StripError::Capture(format!(
                "Unsupported sample format: {:?}",
                sample_format
            )));
        }
        let buffer_size = block_size(supported.buffer_size(), self.block_frames);
        let mut config: StreamConfig = supported.into();
        config.buffer_size = buffer_size;

        let format = CaptureFormat {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };
        info!(
            "Capturing from {} ({}, {:?}, buffer {:?})",
            device_name, format, sample_format, config.buffer_size
        );

        let producer = Arc::new(producer);
        let stream = match open_stream(&device, &config, sample_format, &producer, &faults) {
            Err(cpal::BuildStreamError::StreamConfigNotSupported)
                if config.buffer_size != BufferSize::Default =>
            {
                warn!(
                    "Input device rejected {:?}, using its default buffer size",
                    config.buffer_size
                );
                config.buffer_size = BufferSize::Default;
                open_stream(&device, &config, sample_format, &producer, &faults)
            }
            other => other,
        }
        .map_err(|e| StripError::Capture(e.to_string()))?;

        stream
            .play()
            .map_err(|e| StripError::Capture(e.to_string()))?;

        Ok(CaptureGuard::new(device_name, format, move || {
            let _ = stream.pause();
            drop(stream);
        }))
    }
}

/// Buffer size to request for `block_frames`, kept inside what the device supports
fn block_size(supported: &SupportedBufferSize, block_frames: u32) -> BufferSize {
    match supported {
        SupportedBufferSize::Range { min, max } if min <= max => {
            let frames = block_frames.clamp(*min, *max);
            if frames != block_frames {
                debug!(
                    "Block size {} outside device range {}..={}, using {}",
                    block_frames, min, max, frames
                );
            }
            BufferSize::Fixed(frames)
        }
        _ => BufferSize::Default,
    }
}

fn open_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    producer: &Arc<BlockProducer>,
    faults: &FaultSender,
) -> std::result::Result<Stream, cpal::BuildStreamError> {
    match sample_format {
        SampleFormat::F32 => build_stream::<f32>(device, config, producer.clone(), faults.clone()),
        SampleFormat::I16 => build_stream::<i16>(device, config, producer.clone(), faults.clone()),
        SampleFormat::U16 => build_stream::<u16>(device, config, producer.clone(), faults.clone()),
        SampleFormat::I32 => build_stream::<i32>(device, config, producer.clone(), faults.clone()),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    producer: Arc<BlockProducer>,
    faults: FaultSender,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels;

    let err_fn = move |err: cpal::StreamError| {
        let fatal = matches!(err, cpal::StreamError::DeviceNotAvailable);
        let _ = faults.try_send(CaptureFault {
            message: err.to_string(),
            fatal,
        });
    };

    let data_fn = move |data: &[T], _: &cpal::InputCallbackInfo| {
        let block: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
        producer.send(SampleBlock::new(channels, block));
    };

    device.build_input_stream(config, data_fn, err_fn, None)
}

/// Synthetic sine tone source
///
/// Runs the live path without an input device. Paced sources deliver blocks
/// at the real-time rate; unpaced ones as fast as the thread can run.
pub struct ToneCapture {
    frequency: f32,
    sample_rate: u32,
    block_frames: usize,
    amplitude: f32,
    paced: bool,
}

impl ToneCapture {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            frequency,
            sample_rate: sample_rate.max(1),
            block_frames: 1024,
            amplitude: 0.8,
            paced: true,
        }
    }

    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames.max(1);
        self
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Deliver blocks without real-time pacing
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }
}

impl CaptureSource for ToneCapture {
    fn name(&self) -> String {
        format!("{}Hz tone", self.frequency)
    }

    fn start(&mut self, producer: BlockProducer, _faults: FaultSender) -> Result<CaptureGuard> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let frequency = self.frequency;
        let sample_rate = self.sample_rate;
        let block_frames = self.block_frames;
        let amplitude = self.amplitude;
        let paced = self.paced;

        let handle: JoinHandle<()> = thread::Builder::new()
            .name("tone-capture".into())
            .spawn(move || {
                let step = TAU * frequency / sample_rate as f32;
                let block_time =
                    Duration::from_secs_f64(block_frames as f64 / sample_rate as f64);
                let mut phase = 0.0f32;
                let mut next_block = Instant::now();
                let mut block = vec![0.0f32; block_frames];

                while !thread_stop.load(Ordering::Relaxed) {
                    for s in block.iter_mut() {
                        *s = amplitude * phase.sin();
                        phase = (phase + step) % TAU;
                    }
                    producer.push(1, &block);

                    if paced {
                        next_block += block_time;
                        let now = Instant::now();
                        if next_block > now {
                            thread::sleep(next_block - now);
                        }
                    } else {
                        thread::yield_now();
                    }
                }
                debug!("Tone capture thread stopped");
            })?;

        let format = CaptureFormat {
            sample_rate: self.sample_rate,
            channels: 1,
        };
        info!("Capturing from {} ({})", self.name(), format);

        Ok(CaptureGuard::new(self.name(), format, move || {
            stop.store(true, Ordering::Relaxed);
            let _ = handle.join();
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::block_channel;

    #[test]
    fn test_tone_delivers_blocks_until_released() {
        let (producer, consumer) = block_channel(64);
        let (faults_tx, _faults_rx) = fault_channel();

        let mut tone = ToneCapture::new(440.0, 8_000).block_frames(80);
        let guard = tone.start(producer, faults_tx).unwrap();
        assert_eq!(guard.format().sample_rate, 8_000);
        assert_eq!(guard.format().channels, 1);

        thread::sleep(Duration::from_millis(100));
        drop(guard);

        let mut frames = 0;
        consumer.drain(|block| {
            assert!(block.samples.iter().all(|s| s.abs() <= 0.8 + f32::EPSILON));
            frames += block.frames();
        });
        assert!(frames > 0);

        // Released: nothing new arrives
        thread::sleep(Duration::from_millis(30));
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_guard_runs_release_once() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let guard = CaptureGuard::new(
            "test",
            CaptureFormat {
                sample_rate: 48_000,
                channels: 2,
            },
            move || flag.store(true, Ordering::SeqCst),
        );
        assert_eq!(guard.name(), "test");
        assert!(!released.load(Ordering::SeqCst));
        drop(guard);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_block_size_is_clamped_to_device_range() {
        let range = SupportedBufferSize::Range { min: 2048, max: 8192 };
        assert_eq!(block_size(&range, 1024), BufferSize::Fixed(2048));
        assert_eq!(block_size(&range, 4096), BufferSize::Fixed(4096));
        assert_eq!(block_size(&range, 16_384), BufferSize::Fixed(8192));

        let small = SupportedBufferSize::Range { min: 64, max: 512 };
        assert_eq!(block_size(&small, 1024), BufferSize::Fixed(512));
    }

    #[test]
    fn test_unknown_buffer_range_uses_device_default() {
        assert_eq!(block_size(&SupportedBufferSize::Unknown, 1024), BufferSize::Default);
    }

    #[test]
    fn test_fault_channel_never_blocks() {
        let (tx, rx) = fault_channel();
        for i in 0..(FAULT_QUEUE * 2) {
            let _ = tx.try_send(CaptureFault {
                message: format!("overrun {}", i),
                fatal: false,
            });
        }
        assert_eq!(rx.len(), FAULT_QUEUE);
    }
}
