//! Fixed-rate frame pacing for the live loop

use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

/// Paces a loop at a fixed frame rate
///
/// `tick` sleeps until the next deadline. A tick that arrives after its
/// deadline counts as an overrun and the schedule restarts from now, so a
/// slow frame never causes a burst of catch-up frames.
pub struct FrameClock {
    period: Duration,
    next: Instant,
    frames: u64,
    overruns: u64,
}

impl FrameClock {
    pub fn new(frame_rate: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64);
        Self {
            period,
            next: Instant::now() + period,
            frames: 0,
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the end of the current frame period
    pub fn tick(&mut self) {
        let now = Instant::now();
        if now < self.next {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            let late = now - self.next;
            trace!("Frame {} late by {:?}", self.frames, late);
            self.overruns += 1;
            self.next = now + self.period;
        }
        self.frames += 1;
    }

    /// Frames ticked so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames that missed their deadline
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
