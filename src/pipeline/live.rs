//! Live visualizer - captures audio and refreshes the display at a fixed rate

use crate::audio::{block_channel, fault_channel, CaptureSource, FaultReceiver};
use crate::config::RenderConfig;
use crate::error::Result;
use crate::output::DisplaySurface;
use crate::strip::LiveStrip;
use crate::sync::FrameClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Live visualizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Running,
    Stopped,
}

/// Why the live loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Quit key on the display
    UserQuit,
    /// External stop flag (Ctrl+C handler)
    Interrupted,
    /// The capture stream reported an unrecoverable fault
    CaptureLost(String),
}

/// Summary of a finished live session
#[derive(Debug, Clone)]
pub struct LiveReport {
    pub reason: StopReason,
    pub frames: u64,
    pub overruns: u64,
    pub blocks_enqueued: u64,
    pub blocks_dropped: u64,
    pub malformed_samples: u64,
    /// Longest the strip got after any frame's drain
    pub peak_strip: usize,
}

/// Drives capture, the live strip and the display
pub struct LiveVisualizer {
    config: RenderConfig,
    queue_blocks: usize,
    state: LiveState,
}

impl LiveVisualizer {
    pub fn new(config: RenderConfig, queue_blocks: usize) -> Self {
        Self {
            config,
            queue_blocks: queue_blocks.max(1),
            state: LiveState::Stopped,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LiveState::Running
    }

    /// Run until quit, interruption, or loss of the capture stream
    ///
    /// `stop` is polled once per frame. The capture stream is released
    /// before this returns, whatever the exit path.
    pub fn run(
        &mut self,
        source: &mut dyn CaptureSource,
        display: &mut dyn DisplaySurface,
        stop: Arc<AtomicBool>,
    ) -> Result<LiveReport> {
        info!("Starting live visualizer ({})", self.config);

        let (producer, consumer) = block_channel(self.queue_blocks);
        let stats = producer.stats();
        let (fault_tx, fault_rx) = fault_channel();

        let guard = source.start(producer, fault_tx)?;

        let config = if guard.format().sample_rate != self.config.sample_rate() {
            info!(
                "Capture runs at {}Hz instead of {}Hz",
                guard.format().sample_rate,
                self.config.sample_rate()
            );
            self.config.with_sample_rate(guard.format().sample_rate)?
        } else {
            self.config
        };

        self.state = LiveState::Running;
        info!("Live visualizer running, capture: {} ({})", guard.name(), guard.format());

        let mut strip = LiveStrip::new(&config);
        let mut clock = FrameClock::new(config.frame_rate());
        let mut peak_strip = 0;

        let result = loop {
            if stop.load(Ordering::SeqCst) {
                break Ok(StopReason::Interrupted);
            }
            match display.quit_requested() {
                Ok(true) => break Ok(StopReason::UserQuit),
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            if let Some(message) = drain_faults(&fault_rx) {
                break Ok(StopReason::CaptureLost(message));
            }

            let blocks = consumer.drain(|block| strip.push_block(&block));
            trace!("Frame {}: {} blocks, strip {}", clock.frames(), blocks, strip.len());
            peak_strip = peak_strip.max(strip.len());

            let frame = strip.render(&config);
            if let Err(e) = display.present(&frame) {
                break Err(e);
            }
            clock.tick();
        };

        // Stop the stream before reporting so nothing is enqueued afterwards
        drop(guard);
        self.state = LiveState::Stopped;

        info!(
            "Live visualizer stopped: {} frames, {} late, {} blocks received, {} dropped",
            clock.frames(),
            clock.overruns(),
            stats.enqueued(),
            stats.dropped()
        );
        if strip.malformed() > 0 {
            warn!("{} samples could not be mapped and were drawn black", strip.malformed());
        }

        match result {
            Ok(reason) => {
                debug!("Stop reason: {:?}", reason);
                Ok(LiveReport {
                    reason,
                    frames: clock.frames(),
                    overruns: clock.overruns(),
                    blocks_enqueued: stats.enqueued(),
                    blocks_dropped: stats.dropped(),
                    malformed_samples: strip.malformed(),
                    peak_strip,
                })
            }
            Err(e) => {
                error!("Live visualizer aborted: {}", e);
                Err(e)
            }
        }
    }
}

/// Log pending capture faults; returns the message of the first fatal one
fn drain_faults(faults: &FaultReceiver) -> Option<String> {
    for fault in faults.try_iter() {
        if fault.fatal {
            error!("Capture lost: {}", fault.message);
            return Some(fault.message);
        }
        warn!("Capture fault: {}", fault.message);
    }
    None
}
