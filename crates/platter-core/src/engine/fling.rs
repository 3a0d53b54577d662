//! Fling model
//!
//! A fling is the post-release coast of the platter: the scratch rate keeps
//! going and decays exponentially, `r(t) = r0 * exp(-t / tau)`.
//!
//! On release, three candidate rates are considered and the one with the
//! largest magnitude wins (earlier candidates win ties):
//!
//! 1. the last smoothed gesture rate
//! 2. the rate derived from the raw release angular velocity
//! 3. the last non-zero rate seen within a short memory window, decayed by age
//!
//! The third candidate catches releases where the final pointer frame was
//! inside the hold deadzone even though the platter was clearly moving.

use crate::config::FlingConfig;
use crate::types::clamp_rate;

/// |rate| below which a running fling is considered finished
pub const FLING_STOP_RATE: f64 = 1e-3;

/// |rate| a fling command needs to actually start coasting
pub const FLING_START_RATE: f64 = 5e-4;

/// Degrees of platter rotation per track second at sensitivity 1.0
pub const DEGREES_PER_ROTATION: f64 = 360.0;

/// Smoothed rates at or below this magnitude are not fling candidates
const SMOOTHED_CANDIDATE_MIN: f64 = 1e-3;

/// Per-sample decay multiplier for a fling time constant
///
/// Returns 1.0 (no decay) for a non-positive or non-finite tau.
#[inline]
pub fn decay_per_sample(sample_rate: f64, tau: f64) -> f64 {
    if tau > 0.0 && tau.is_finite() && sample_rate > 0.0 {
        (-1.0 / (sample_rate * tau)).exp()
    } else {
        1.0
    }
}

/// Fling rate `t` seconds after launch
pub fn rate_at(initial_rate: f64, tau: f64, t: f64) -> f64 {
    initial_rate * (-t / tau).exp()
}

/// Track seconds travelled `t` seconds after launch
pub fn distance(initial_rate: f64, tau: f64, t: f64) -> f64 {
    initial_rate * tau * (1.0 - (-t / tau).exp())
}

/// Seconds until the fling slows to `rate`, or `None` if it starts below it
pub fn time_to_rate(initial_rate: f64, tau: f64, rate: f64) -> Option<f64> {
    let r0 = initial_rate.abs();
    let rate = rate.abs();
    if rate <= 0.0 || r0 <= rate || tau <= 0.0 {
        return None;
    }
    Some(tau * (r0 / rate).ln())
}

/// A rate remembered from earlier in the gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentRate {
    /// The remembered rate
    pub rate: f64,
    /// Seconds between capture and release
    pub age: f64,
}

/// Summary of a scratch gesture at the moment of release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseSample {
    /// Last smoothed gesture rate
    pub smoothed_rate: f64,
    /// Raw angular velocity of the final pointer delta (deg/sec)
    pub release_deg_per_sec: f64,
    /// Last non-zero rate seen while moving
    pub last_nonzero: Option<RecentRate>,
    /// Track position the gesture ended at (seconds)
    pub position: f64,
}

/// Parameters handed to the render engine's fling mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlingLaunch {
    /// Initial rate (already boosted and clamped)
    pub rate: f64,
    /// Decay time constant (seconds)
    pub tau: f64,
}

/// Decides whether a release becomes a fling and with what parameters
#[derive(Debug, Clone)]
pub struct FlingModel {
    config: FlingConfig,
    sensitivity: f64,
}

impl FlingModel {
    /// Create a fling model
    ///
    /// `sensitivity` is the gesture's track seconds per rotation, used to turn
    /// angular velocity into a rate.
    pub fn new(config: FlingConfig, sensitivity: f64) -> Self {
        Self {
            config,
            sensitivity,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &FlingConfig {
        &self.config
    }

    /// Rate derived from an angular velocity
    pub fn derived_rate(&self, deg_per_sec: f64) -> f64 {
        deg_per_sec / DEGREES_PER_ROTATION * self.sensitivity
    }

    /// Pick the release rate: largest magnitude of the three candidates
    pub fn candidate_rate(&self, release: &ReleaseSample) -> f64 {
        let smoothed = if release.smoothed_rate.abs() > SMOOTHED_CANDIDATE_MIN {
            release.smoothed_rate
        } else {
            0.0
        };
        let derived = self.derived_rate(release.release_deg_per_sec);
        let remembered = release
            .last_nonzero
            .filter(|recent| recent.rate != 0.0 && recent.age < self.config.memory_window)
            .map(|recent| recent.rate * (-recent.age.max(0.0) / self.config.memory_tau).exp())
            .unwrap_or(0.0);

        [smoothed, derived, remembered]
            .into_iter()
            .map(|r| if r.is_finite() { r } else { 0.0 })
            .fold(0.0, |best, r| if r.abs() > best.abs() { r } else { best })
    }

    /// Decide whether the release flings, and if so how fast
    pub fn evaluate(&self, release: &ReleaseSample) -> Option<FlingLaunch> {
        let candidate = self.candidate_rate(release);
        let fast_enough = candidate.abs() >= self.config.min_rate
            || release.release_deg_per_sec.abs() >= self.config.min_deg_per_sec;
        if !fast_enough {
            return None;
        }

        let rate = clamp_rate(candidate * self.config.speed_mult);
        if rate.abs() <= FLING_START_RATE {
            return None;
        }
        Some(FlingLaunch {
            rate,
            tau: self.config.tau,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FlingModel {
        FlingModel::new(FlingConfig::default(), 1.0)
    }

    fn release(smoothed: f64, deg_per_sec: f64, recent: Option<(f64, f64)>) -> ReleaseSample {
        ReleaseSample {
            smoothed_rate: smoothed,
            release_deg_per_sec: deg_per_sec,
            last_nonzero: recent.map(|(rate, age)| RecentRate { rate, age }),
            position: 0.0,
        }
    }

    #[test]
    fn test_largest_candidate_wins() {
        let m = model();
        // derived = 720 / 360 = 2.0 beats smoothed 0.5
        assert!((m.candidate_rate(&release(0.5, 720.0, None)) - 2.0).abs() < 1e-12);
        // negative magnitudes count too
        assert!((m.candidate_rate(&release(0.5, -720.0, None)) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_smoothed_rate() {
        let m = model();
        // smoothed 1.0 and derived 1.0 (360 deg/s) tie: smoothed is kept,
        // observable through the sign when the derived rate is negative
        assert_eq!(m.candidate_rate(&release(1.0, -360.0, None)), 1.0);
    }

    #[test]
    fn test_memory_window() {
        let m = model();
        // Fresh memory decays by exp(-age/tau)
        let fresh = m.candidate_rate(&release(0.0, 0.0, Some((1.0, 0.12))));
        assert!((fresh - (-1.0f64).exp()).abs() < 1e-12);
        // Past the 400ms window it is ignored entirely
        assert_eq!(m.candidate_rate(&release(0.0, 0.0, Some((1.0, 0.5)))), 0.0);
    }

    #[test]
    fn test_evaluate_thresholds() {
        let m = model();
        assert!(m.evaluate(&release(0.1, 10.0, None)).is_none());

        let launch = m.evaluate(&release(0.5, 0.0, None)).unwrap();
        assert!((launch.rate - 1.0).abs() < 1e-12, "speed_mult 2.0 applied");
        assert_eq!(launch.tau, 0.45);

        // Velocity fallback: 70 deg/s is above min_deg_per_sec
        let launch = m.evaluate(&release(0.0, 70.0, None)).unwrap();
        assert!((launch.rate - 70.0 / 360.0 * 2.0).abs() < 1e-12);

        // Boosted rate is clamped to the engine bounds
        let launch = m.evaluate(&release(6.0, 0.0, None)).unwrap();
        assert_eq!(launch.rate, 8.0);
    }

    #[test]
    fn test_decay_law() {
        let sr = 48000.0;
        let tau = 0.45;
        let k = decay_per_sample(sr, tau);
        let mut rate = 1.5;
        let samples = (0.3 * sr) as usize;
        for _ in 0..samples {
            rate *= k;
        }
        let expected = rate_at(1.5, tau, samples as f64 / sr);
        assert!((rate - expected).abs() < 1e-9, "{} vs {}", rate, expected);
        assert_eq!(decay_per_sample(sr, 0.0), 1.0);
    }

    #[test]
    fn test_time_to_rate() {
        let t = time_to_rate(2.0, 0.5, 0.25).unwrap();
        assert!((rate_at(2.0, 0.5, t) - 0.25).abs() < 1e-12);
        assert!(time_to_rate(0.1, 0.5, 0.25).is_none());
        assert!((distance(1.0, 0.5, 1e9) - 0.5).abs() < 1e-12);
    }
}
