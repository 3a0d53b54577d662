//! Time sources for the control domain
//!
//! Guards, cue deadlines and crossfade scheduling all read the time from a
//! [`Clock`]. In production that is the renderer's device frame counter, so
//! control decisions line up with the audio that is actually being played.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::RenderAtomics;

/// A monotonic time source in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Device time published by the renderer
///
/// Advances once per audio block.
#[derive(Clone)]
pub struct DeviceClock {
    atomics: Arc<RenderAtomics>,
}

impl DeviceClock {
    pub fn new(atomics: Arc<RenderAtomics>) -> Self {
        Self { atomics }
    }
}

impl Clock for DeviceClock {
    #[inline]
    fn now(&self) -> f64 {
        self.atomics.device_time()
    }
}

/// Externally driven clock for offline rendering and tests
///
/// Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Reference point of a running playback voice
///
/// `position(now) = offset + (now - start_time) * rate`, with elapsed time
/// never negative so a start scheduled in the future reads as `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveClock {
    pub start_time: f64,
    pub offset: f64,
    pub rate: f64,
}

impl LiveClock {
    pub fn position(&self, now: f64, duration: f64) -> f64 {
        let elapsed = (now - self.start_time).max(0.0);
        (self.offset + elapsed * self.rate).clamp(0.0, duration.max(0.0))
    }

    /// Restart the reference at `now` with a new rate, keeping position continuous
    pub fn rebase(&mut self, now: f64, duration: f64, rate: f64) {
        if now > self.start_time {
            self.offset = self.position(now, duration);
            self.start_time = now;
        }
        self.rate = rate;
    }
}
