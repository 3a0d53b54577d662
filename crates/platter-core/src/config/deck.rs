//! Deck tunables
//!
//! Every section uses `#[serde(default)]` so a partial YAML file only
//! overrides the keys it names.

use serde::{Deserialize, Serialize};

/// Complete configuration for one deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub render: RenderConfig,
    pub transport: TransportConfig,
    pub fling: FlingConfig,
    pub resume: ResumeConfig,
    pub gesture: GestureConfig,
}

/// Render-path time constants and thresholds
///
/// Time constants are in seconds and converted to per-sample coefficients
/// with `1 - exp(-1 / (sample_rate * tau))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// One-pole smoothing coefficient applied per sample to the scratch rate.
    /// 0.003..0.008 gives a 3-10ms time constant at 48kHz.
    pub rate_smoothing: f64,
    /// Gate envelope time constant
    pub gate_tau: f64,
    /// Lower bound for the (halved) gate time constant used during fling
    pub fling_gate_tau_min: f64,
    /// |rate| below which the gate mutes
    pub mute_enter: f64,
    /// |rate| above which the gate unmutes
    pub mute_exit: f64,
    /// Position slew time constant
    pub slew_tau: f64,
    /// Fling decay used when a fling command carries no usable tau
    pub default_fling_tau: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rate_smoothing: 0.0045,
            gate_tau: 0.008,
            fling_gate_tau_min: 0.002,
            mute_enter: 0.0035,
            mute_exit: 0.007,
            slew_tau: 0.004,
            default_fling_tau: 0.4,
        }
    }
}

/// Control-domain guard windows (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Re-entrancy lock held after each guarded operation
    pub lock_window: f64,
    /// Minimum spacing between play/pause triggers
    pub debounce_window: f64,
    /// Cue press duration that turns a tap into a hold
    pub cue_hold_threshold: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            lock_window: 0.008,
            debounce_window: 0.040,
            cue_hold_threshold: 0.180,
        }
    }
}

/// Fling detection and decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlingConfig {
    /// Minimum |rate| that triggers a fling
    pub min_rate: f64,
    /// Fallback trigger on raw release angular velocity (deg/sec)
    pub min_deg_per_sec: f64,
    /// Exponential decay time constant (seconds)
    pub tau: f64,
    /// Multiplier applied to the detected release rate
    pub speed_mult: f64,
    /// How long the last non-zero rate stays a fling candidate (seconds)
    pub memory_window: f64,
    /// Decay time constant of the remembered rate (seconds)
    pub memory_tau: f64,
    /// Start the resume crossfade once the fling has slowed below this rate.
    /// `None` waits for the fling to end.
    pub overlap_rate: Option<f64>,
    /// Fade-in length of the playback resume that follows a fling (seconds)
    pub accel_duration: f64,
}

impl Default for FlingConfig {
    fn default() -> Self {
        Self {
            min_rate: 0.18,
            min_deg_per_sec: 65.0,
            tau: 0.45,
            speed_mult: 2.0,
            memory_window: 0.4,
            memory_tau: 0.12,
            overlap_rate: None,
            accel_duration: 0.5,
        }
    }
}

/// Scratch → playback handoff timing (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// Delay between scheduling and the start of the new playback voice
    pub preload_lead: f64,
    /// Length of the gain crossfade
    pub crossfade: f64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            preload_lead: 0.016,
            crossfade: 0.040,
        }
    }
}

/// Platter gesture interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Track seconds per platter rotation
    pub sensitivity: f64,
    /// Base clamp for |rate|; effective clamp is `max(1, max_rate_base * sensitivity)`
    pub max_rate_base: f64,
    /// Angle delta (deg) below which the platter counts as held
    pub hold_enter_deg: f64,
    /// Angle delta (deg) above which a hold is released
    pub hold_exit_deg: f64,
    /// Weight of the previous rate in the gesture rate smoother
    pub smoothing: f64,
    /// |rate| above which a rate is remembered as the last non-zero rate
    pub nonzero_threshold: f64,
    /// Angle delta (deg) that counts as platter movement
    pub move_threshold_deg: f64,
    /// Without movement for this long (seconds) the rate is forced to zero
    pub stop_after: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            max_rate_base: 4.0,
            hold_enter_deg: 0.25,
            hold_exit_deg: 0.5,
            smoothing: 0.3,
            nonzero_threshold: 0.02,
            move_threshold_deg: 0.1,
            stop_after: 0.030,
        }
    }
}
