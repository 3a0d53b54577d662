//! Platter gesture tracking
//!
//! Turns a stream of platter angles (degrees, with UI event timestamps in
//! seconds) into scratch rate/hold updates and, on release, a
//! [`ReleaseSample`] for the fling model. Positive angles turn forward.

use crate::config::GestureConfig;
use crate::engine::fling::{DEGREES_PER_ROTATION, FLING_START_RATE};
use crate::engine::{RecentRate, ReleaseSample};
use crate::types::finite_or_zero;

/// Shortest time step used for the release velocity
const MIN_RELEASE_DT: f64 = 0.001;

/// Wrap an angle difference into (-180, 180]
pub fn wrap_degrees(delta: f64) -> f64 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Result of one platter movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureUpdate {
    /// Smoothed rate to hand to the scratch voice
    pub rate: f64,
    pub holding: bool,
    /// Hold state flipped with this update
    pub hold_changed: bool,
    /// Integrated track position (seconds)
    pub position: f64,
}

#[derive(Debug, Clone)]
pub struct ScratchGesture {
    config: GestureConfig,
    active: bool,
    last_angle: f64,
    last_time: f64,
    smoothed_rate: f64,
    holding: bool,
    last_nonzero: Option<(f64, f64)>,
    /// Time of the last update that actually turned the platter
    last_move: f64,
    position: f64,
    duration: f64,
}

impl ScratchGesture {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            active: false,
            last_angle: 0.0,
            last_time: 0.0,
            smoothed_rate: 0.0,
            holding: false,
            last_nonzero: None,
            last_move: 0.0,
            position: 0.0,
            duration: 0.0,
        }
    }

    /// Track seconds per platter rotation
    pub fn sensitivity(&self) -> f64 {
        self.config.sensitivity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Grab the platter at `angle` while the track is at `position`
    pub fn press(&mut self, angle: f64, time: f64, position: f64, duration: f64) {
        self.active = true;
        self.last_angle = finite_or_zero(angle);
        self.last_time = finite_or_zero(time);
        self.smoothed_rate = 0.0;
        self.holding = false;
        self.last_nonzero = None;
        self.last_move = self.last_time;
        self.duration = duration.max(0.0);
        self.position = finite_or_zero(position).clamp(0.0, self.duration);
    }

    fn max_rate(&self) -> f64 {
        (self.config.max_rate_base * self.config.sensitivity).max(1.0)
    }

    /// Platter moved to `angle` at `time`
    ///
    /// Returns `None` when not grabbed or when time did not advance.
    pub fn update(&mut self, angle: f64, time: f64) -> Option<GestureUpdate> {
        if !self.active || !angle.is_finite() || !time.is_finite() {
            return None;
        }
        let dt = time - self.last_time;
        if dt <= 0.0 {
            return None;
        }
        let delta = wrap_degrees(angle - self.last_angle);
        self.last_angle = angle;
        self.last_time = time;

        let was_holding = self.holding;
        if self.holding {
            if delta.abs() > self.config.hold_exit_deg {
                self.holding = false;
            }
        } else if delta.abs() < self.config.hold_enter_deg {
            self.holding = true;
        }

        if self.holding {
            self.smoothed_rate = 0.0;
        } else {
            let max = self.max_rate();
            let raw = (delta / dt / DEGREES_PER_ROTATION * self.config.sensitivity).clamp(-max, max);
            let k = self.config.smoothing;
            self.smoothed_rate = k * self.smoothed_rate + (1.0 - k) * raw;
            if self.smoothed_rate.abs() > self.config.nonzero_threshold {
                self.last_nonzero = Some((self.smoothed_rate, time));
            }
            // Held frames do not move the track
            self.position = (self.position + delta / DEGREES_PER_ROTATION * self.config.sensitivity)
                .clamp(0.0, self.duration);
            if delta.abs() >= self.config.move_threshold_deg {
                self.last_move = time;
            }
        }
        self.stalled(time);

        Some(GestureUpdate {
            rate: self.smoothed_rate,
            holding: self.holding,
            hold_changed: self.holding != was_holding,
            position: self.position,
        })
    }

    /// Drop a lingering rate once the platter has not turned for `stop_after`
    ///
    /// Returns `true` when the rate was reset by this call.
    pub fn stalled(&mut self, time: f64) -> bool {
        if !self.active || !time.is_finite() {
            return false;
        }
        if time - self.last_move > self.config.stop_after && self.smoothed_rate.abs() > FLING_START_RATE {
            self.smoothed_rate = 0.0;
            return true;
        }
        false
    }

    /// Let go of the platter at `angle` and `time`
    pub fn release(&mut self, angle: f64, time: f64) -> ReleaseSample {
        let angle = if angle.is_finite() { angle } else { self.last_angle };
        let time = if time.is_finite() { time } else { self.last_time };
        let delta = wrap_degrees(angle - self.last_angle);
        let dt = (time - self.last_time).max(MIN_RELEASE_DT);
        self.position = (self.position + delta / DEGREES_PER_ROTATION * self.config.sensitivity)
            .clamp(0.0, self.duration);
        self.active = false;

        ReleaseSample {
            smoothed_rate: self.smoothed_rate,
            release_deg_per_sec: delta / dt,
            last_nonzero: self.last_nonzero.map(|(rate, at)| RecentRate {
                rate,
                age: (time - at).max(0.0),
            }),
            position: self.position,
        }
    }
}
