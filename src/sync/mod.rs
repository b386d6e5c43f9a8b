//! Timing for the live loop

mod clock;

pub use clock::FrameClock;
