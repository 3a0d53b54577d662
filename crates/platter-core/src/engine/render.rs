//! Scratch voice synthesis
//!
//! [`RenderState`] is the whole state of the scratch voice and
//! [`render_scratch`] advances it one block at a time. Both are plain data
//! and a function, with no host or threading assumptions, so the same code
//! runs inside the real-time renderer and in offline tests.
//!
//! Per output sample, in this order:
//!
//! 1. resolve the rate (hold → 0, fling → decaying rate, else one-pole smoothing)
//! 2. snap near-zero rates to exactly zero
//! 3. update the mute gate and its envelope
//! 4. read the buffer with cubic interpolation
//! 5. integrate the position
//! 6. apply any pending position slew
//! 7. decay the fling rate and detect its end

use crate::config::RenderConfig;
use crate::types::{clamp_rate, finite_or_zero, AudioBuffer, Sample, MAX_RATE};

use super::fling::{decay_per_sample, FLING_START_RATE, FLING_STOP_RATE};
use super::interpolation::read_cubic;
use super::voice::GainRamp;

/// Target magnitude below which a rate snaps to zero
pub const SNAP_TARGET_RATE: f64 = 5e-3;

/// Smoothed magnitude below which a rate snaps to zero (outside fling)
pub const SNAP_SMOOTHED_RATE: f64 = 2e-3;

/// A slew within this many samples of its target is complete
const SLEW_DONE_SAMPLES: f64 = 0.25;

/// Gate gain a fling starts from at minimum, so it is audible at once
const FLING_GATE_HEAD_START: f64 = 0.12;

/// One-pole coefficient for a time constant in seconds
#[inline]
fn one_pole(sample_rate: f64, tau: f64) -> f64 {
    if tau > 0.0 && tau.is_finite() {
        1.0 - (-1.0 / (sample_rate * tau)).exp()
    } else {
        1.0
    }
}

/// Mute decision with hysteresis
///
/// Once muted, the rate magnitude has to rise above `exit` to unmute; once
/// unmuted, it has to fall below `enter` to mute again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuteGate {
    muted: bool,
    enter: f64,
    exit: f64,
}

impl MuteGate {
    pub fn new(enter: f64, exit: f64) -> Self {
        Self {
            muted: true,
            enter,
            exit: exit.max(enter),
        }
    }

    /// Feed the current rate magnitude, returns the muted state
    #[inline]
    pub fn update(&mut self, magnitude: f64) -> bool {
        if self.muted {
            if magnitude > self.exit {
                self.muted = false;
            }
        } else if magnitude < self.enter {
            self.muted = true;
        }
        self.muted
    }

    #[inline]
    pub fn force(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Complete state of the scratch voice
#[derive(Debug, Clone)]
pub struct RenderState {
    config: RenderConfig,
    output_rate: f64,

    active: bool,
    /// Position in output-rate samples
    position_samples: f64,
    target_rate: f64,
    smoothed_rate: f64,
    holding: bool,

    fling_active: bool,
    fling_rate: f64,
    fling_tau: f64,

    gate: MuteGate,
    gate_gain: f64,
    slew_target: Option<f64>,
    voice_gain: GainRamp,
}

impl RenderState {
    pub fn new(config: &RenderConfig, output_rate: u32) -> Self {
        Self {
            config: config.clone(),
            output_rate: output_rate.max(1) as f64,
            active: false,
            position_samples: 0.0,
            target_rate: 0.0,
            smoothed_rate: 0.0,
            holding: false,
            fling_active: false,
            fling_rate: 0.0,
            fling_tau: config.default_fling_tau,
            gate: MuteGate::new(config.mute_enter, config.mute_exit),
            gate_gain: 0.0,
            slew_target: None,
            voice_gain: GainRamp::UNITY,
        }
    }

    /// Return to the silent, inactive state at position zero
    pub fn reset(&mut self) {
        self.stop();
        self.position_samples = 0.0;
    }

    /// Begin a scratch session
    pub fn start(&mut self, position_sec: f64, rate: f64) {
        let rate = clamp_rate(rate);
        let rate = if rate.abs() < SNAP_TARGET_RATE { 0.0 } else { rate };

        self.active = true;
        self.position_samples = self.to_samples(position_sec);
        self.target_rate = rate;
        self.smoothed_rate = rate;
        self.holding = false;
        self.fling_active = false;
        self.fling_rate = 0.0;
        self.gate.force(true);
        self.gate_gain = 0.0;
        self.slew_target = None;
        self.voice_gain = GainRamp::UNITY;
    }

    /// Slew toward a new position; cancels a running fling
    ///
    /// Ignored outside a session.
    pub fn set_position(&mut self, position_sec: f64) {
        if !self.active {
            return;
        }
        if self.fling_active {
            self.fling_active = false;
            self.target_rate = 0.0;
        }
        self.slew_target = Some(self.to_samples(position_sec));
    }

    /// New target rate; tiny rates stop the voice at once
    pub fn set_rate(&mut self, rate: f64) {
        let rate = clamp_rate(rate);
        if rate.abs() < SNAP_TARGET_RATE {
            self.target_rate = 0.0;
            self.smoothed_rate = 0.0;
        } else {
            self.target_rate = rate;
        }
    }

    /// Hold the platter still; also cancels a fling
    pub fn set_hold(&mut self, hold: bool) {
        self.holding = hold;
        if hold {
            self.fling_active = false;
            self.target_rate = 0.0;
            self.smoothed_rate = 0.0;
        }
    }

    /// Launch a fling
    pub fn fling(&mut self, rate: f64, tau: f64) {
        let rate = clamp_rate(rate);
        self.holding = false;
        self.active = true;
        self.fling_active = rate.abs() > FLING_START_RATE;
        self.fling_rate = rate;
        self.fling_tau = if tau > 0.0 && tau.is_finite() {
            tau
        } else {
            self.config.default_fling_tau
        };
        self.target_rate = rate;
        self.smoothed_rate = rate;
        self.slew_target = None;
        self.gate.force(false);
        self.gate_gain = self.gate_gain.max(FLING_GATE_HEAD_START);
    }

    /// End the session immediately; the position is kept
    pub fn stop(&mut self) {
        self.active = false;
        self.holding = false;
        self.fling_active = false;
        self.fling_rate = 0.0;
        self.target_rate = 0.0;
        self.smoothed_rate = 0.0;
        self.gate.force(true);
        self.gate_gain = 0.0;
        self.slew_target = None;
        self.voice_gain = GainRamp::UNITY;
    }

    /// Schedule the voice gain
    pub fn set_gain(&mut self, ramp: GainRamp) {
        self.voice_gain = ramp;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_fling_active(&self) -> bool {
        self.fling_active
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn is_muted(&self) -> bool {
        self.gate.is_muted()
    }

    pub fn fling_rate(&self) -> f64 {
        self.fling_rate
    }

    pub fn smoothed_rate(&self) -> f64 {
        self.smoothed_rate
    }

    pub fn gate_gain(&self) -> f64 {
        self.gate_gain
    }

    pub fn position_samples(&self) -> f64 {
        self.position_samples
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_samples / self.output_rate
    }

    fn to_samples(&self, seconds: f64) -> f64 {
        finite_or_zero(seconds).max(0.0) * self.output_rate
    }
}

/// Render one block of the scratch voice into `output`
///
/// Overwrites the first `frames` samples of every output channel (silence
/// when the voice is idle or no buffer is loaded). `block_start` is the
/// device frame of the first sample, used for gain automation.
///
/// Returns the scratch position in seconds if a fling ended in this block.
pub fn render_scratch(
    state: &mut RenderState,
    buffer: Option<&AudioBuffer>,
    block_start: u64,
    output: &mut [&mut [Sample]],
    frames: usize,
) -> Option<f64> {
    for out in output.iter_mut() {
        out[..frames].fill(0.0);
    }
    let buffer = match buffer {
        Some(buffer) if state.active => buffer,
        _ => return None,
    };

    let sr = state.output_rate;
    let resample = buffer.sample_rate() as f64 / sr;
    let max_position = (buffer.frames() as f64 / resample - 1.0).max(0.0);

    let gate_tau = if state.fling_active {
        state.config.fling_gate_tau_min.max(state.config.gate_tau * 0.5)
    } else {
        state.config.gate_tau
    };
    let gate_k = one_pole(sr, gate_tau);
    let slew_k = one_pole(sr, state.config.slew_tau);
    let fling_decay = if state.fling_active {
        decay_per_sample(sr, state.fling_tau)
    } else {
        1.0
    };
    let smoothing = state.config.rate_smoothing;

    let mut fling_ended = None;

    for i in 0..frames {
        // 1. rate
        if state.holding {
            state.target_rate = 0.0;
            state.smoothed_rate = 0.0;
        } else if state.fling_active {
            state.target_rate = state.fling_rate;
            state.smoothed_rate = state.fling_rate;
        } else {
            let target = state.target_rate.clamp(-MAX_RATE, MAX_RATE);
            state.smoothed_rate += (target - state.smoothed_rate) * smoothing;
        }

        // 2. snap
        if !state.fling_active
            && state.target_rate.abs() < SNAP_TARGET_RATE
            && state.smoothed_rate.abs() < SNAP_SMOOTHED_RATE
        {
            state.smoothed_rate = 0.0;
        }

        // 3. gate
        let muted = if state.holding {
            state.gate.force(true);
            true
        } else if state.fling_active {
            state.gate.force(false);
            false
        } else {
            state.gate.update(state.smoothed_rate.abs())
        };
        let gate_target = if muted { 0.0 } else { 1.0 };
        state.gate_gain += (gate_target - state.gate_gain) * gate_k;

        // 4. lookup
        if !muted {
            let gain = (state.gate_gain as Sample) * state.voice_gain.gain_at(block_start + i as u64);
            let index = state.position_samples * resample;
            for (ch, out) in output.iter_mut().enumerate() {
                out[i] = read_cubic(buffer.channel(ch), index) * gain;
            }
        }

        // 5. integrate
        if !(state.holding || (muted && !state.fling_active)) {
            state.position_samples += state.smoothed_rate;
        }

        // 6. slew
        if let Some(target) = state.slew_target {
            let delta = target - state.position_samples;
            state.position_samples += delta * slew_k;
            if delta.abs() < SLEW_DONE_SAMPLES {
                state.slew_target = None;
            }
        }
        state.position_samples = state.position_samples.clamp(0.0, max_position);

        // 7. fling decay
        if state.fling_active {
            state.fling_rate = (state.fling_rate * fling_decay).clamp(-MAX_RATE, MAX_RATE);
            if state.fling_rate.abs() < FLING_STOP_RATE {
                state.fling_active = false;
                state.fling_rate = 0.0;
                state.target_rate = 0.0;
                state.smoothed_rate = 0.0;
                fling_ended = Some(state.position_seconds());
            }
        }
    }

    let block_end = block_start + frames as u64;
    if state.voice_gain.to <= 0.0 && state.voice_gain.is_finished(block_end) {
        state.stop();
    }

    fling_ended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fling::distance;

    const SR: u32 = 48000;

    fn tone(seconds: f64, sample_rate: u32) -> AudioBuffer {
        let frames = (seconds * sample_rate as f64) as usize;
        let data = (0..frames)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        AudioBuffer::mono(data, sample_rate).unwrap()
    }

    /// Render `frames` samples in 256-frame blocks, collecting fling ends
    fn run(state: &mut RenderState, buffer: &AudioBuffer, frames: usize, frame: &mut u64) -> Vec<f64> {
        let mut ended = Vec::new();
        let mut out = vec![0.0f32; 256];
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(256);
            if let Some(pos) = render_scratch(state, Some(buffer), *frame, &mut [out.as_mut_slice()], n) {
                ended.push(pos);
            }
            *frame += n as u64;
            remaining -= n;
        }
        ended
    }

    #[test]
    fn test_constant_rate_moves_position() {
        let buffer = tone(10.0, SR);
        for &(start, rate) in &[(1.0, 0.5), (1.0, 8.0), (5.0, -2.0), (2.0, 1.0)] {
            let mut state = RenderState::new(&RenderConfig::default(), SR);
            state.start(start, rate);
            let mut frame = 0;
            run(&mut state, &buffer, 4800, &mut frame);
            let expected = start + rate * 4800.0 / SR as f64;
            assert!(
                (state.position_seconds() - expected).abs() < 1e-6,
                "rate {}: got {}, expected {}",
                rate,
                state.position_seconds(),
                expected
            );
        }
    }

    #[test]
    fn test_start_stop_is_silent() {
        let buffer = tone(4.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(2.0, 0.0);

        let mut out = vec![1.0f32; 512];
        render_scratch(&mut state, Some(&buffer), 0, &mut [out.as_mut_slice()], 512);
        assert!(out.iter().all(|&s| s == 0.0));

        state.stop();
        out.fill(1.0);
        render_scratch(&mut state, Some(&buffer), 512, &mut [out.as_mut_slice()], 512);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!((state.position_seconds() - 2.0).abs() < 1e-12);
        assert!(!state.is_active());
    }

    #[test]
    fn test_gate_hysteresis() {
        let mut gate = MuteGate::new(0.0035, 0.007);
        assert!(gate.is_muted());
        // Between thresholds: no change either way
        assert!(gate.update(0.005));
        assert!(gate.update(0.0069));
        assert!(!gate.update(0.0071));
        assert!(!gate.update(0.005));
        assert!(!gate.update(0.0036));
        assert!(gate.update(0.0034));
        assert!(gate.update(0.006));
    }

    #[test]
    fn test_rate_ramps_in_before_unmuting() {
        let buffer = tone(4.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 0.0);
        state.set_rate(1.0);

        let mut out = vec![0.0f32; 1];
        render_scratch(&mut state, Some(&buffer), 0, &mut [out.as_mut_slice()], 1);
        assert!((state.smoothed_rate() - 0.0045).abs() < 1e-12);
        assert!(state.is_muted());

        let mut frame = 1;
        run(&mut state, &buffer, 2000, &mut frame);
        assert!(!state.is_muted());
        assert!(state.smoothed_rate() > 0.99);
    }

    #[test]
    fn test_tiny_rate_snaps_to_zero() {
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 1.0);
        state.set_rate(0.004);
        assert_eq!(state.smoothed_rate(), 0.0);
        state.set_rate(f64::NAN);
        assert_eq!(state.smoothed_rate(), 0.0);
    }

    #[test]
    fn test_hold_mutes_and_freezes() {
        let buffer = tone(4.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 1.0);
        let mut frame = 0;
        run(&mut state, &buffer, 1024, &mut frame);

        state.set_hold(true);
        let before = state.position_samples();
        let mut out = vec![1.0f32; 256];
        render_scratch(&mut state, Some(&buffer), frame, &mut [out.as_mut_slice()], 256);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(state.position_samples(), before);
    }

    #[test]
    fn test_fling_decays_exponentially_and_ends_once() {
        let buffer = tone(10.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(5.0, 0.0);
        state.fling(1.0, 0.1);
        assert!(state.is_fling_active());

        let mut frame = 0;
        assert!(run(&mut state, &buffer, 4800, &mut frame).is_empty());
        let expected = (-1.0f64).exp();
        assert!((state.fling_rate() - expected).abs() < 1e-9, "Got {}", state.fling_rate());

        // tau * ln(1000) ~ 0.69s, render well past it
        let ended = run(&mut state, &buffer, 48000, &mut frame);
        assert_eq!(ended.len(), 1);
        assert!(!state.is_fling_active());
        assert_eq!(state.fling_rate(), 0.0);

        let travelled = ended[0] - 5.0;
        let t_end = 0.1 * 1000.0f64.ln();
        assert!((travelled - distance(1.0, 0.1, t_end)).abs() < 1e-3, "travelled {}", travelled);
        // Silent and still afterwards
        assert!((state.position_seconds() - ended[0]).abs() < 1e-12);
    }

    #[test]
    fn test_fling_end_to_end_at_44k() {
        let buffer = tone(10.0, 44100);
        let mut state = RenderState::new(&RenderConfig::default(), 44100);
        state.start(5.0, 0.0);
        state.fling(2.0, 0.45);

        let mut frame = 0;
        let ended = run(&mut state, &buffer, 44100 * 5, &mut frame);
        assert_eq!(ended.len(), 1);

        let t_end = 0.45 * (2.0f64 / 1e-3).ln();
        let expected = 5.0 + distance(2.0, 0.45, t_end);
        assert!((ended[0] - expected).abs() < 1e-3, "Got {}, expected {}", ended[0], expected);
    }

    #[test]
    fn test_fling_without_motion_does_not_activate() {
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.fling(1e-4, 0.3);
        assert!(state.is_active());
        assert!(!state.is_fling_active());

        state.fling(0.5, -1.0);
        assert!(state.is_fling_active());
        assert!(state.gate_gain() >= 0.12);
    }

    #[test]
    fn test_set_position_slews_and_cancels_fling() {
        let buffer = tone(4.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 0.0);
        state.fling(1.0, 0.4);
        state.set_position(1.5);
        assert!(!state.is_fling_active());

        let mut frame = 0;
        run(&mut state, &buffer, 9600, &mut frame);
        assert!((state.position_seconds() - 1.5).abs() < 1e-3, "Got {}", state.position_seconds());
    }

    #[test]
    fn test_position_clamped_to_buffer() {
        let buffer = tone(1.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(0.99, 8.0);
        let mut frame = 0;
        run(&mut state, &buffer, 4800, &mut frame);
        assert!((state.position_samples() - (SR as f64 - 1.0)).abs() < 1e-9);

        state.start(0.01, -8.0);
        run(&mut state, &buffer, 4800, &mut frame);
        assert_eq!(state.position_samples(), 0.0);
    }

    #[test]
    fn test_gain_ramp_to_zero_ends_session() {
        let buffer = tone(4.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 1.0);
        state.set_gain(GainRamp::new(0, 100, 1.0, 0.0));

        let mut out = vec![0.0f32; 128];
        render_scratch(&mut state, Some(&buffer), 0, &mut [out.as_mut_slice()], 128);
        assert!(!state.is_active());
        assert!(out[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_extra_output_channels_reuse_first() {
        let buffer = tone(2.0, SR);
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(0.5, 1.0);

        let mut left = vec![0.0f32; 512];
        let mut right = vec![0.0f32; 512];
        render_scratch(
            &mut state,
            Some(&buffer),
            0,
            &mut [left.as_mut_slice(), right.as_mut_slice()],
            512,
        );
        assert_eq!(left, right);
        assert!(left.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_no_buffer_is_silent() {
        let mut state = RenderState::new(&RenderConfig::default(), SR);
        state.start(1.0, 1.0);
        let mut out = vec![0.3f32; 64];
        assert!(render_scratch(&mut state, None, 0, &mut [out.as_mut_slice()], 64).is_none());
        assert!(out.iter().all(|&s| s == 0.0));
        assert!((state.position_seconds() - 1.0).abs() < 1e-12);
    }
}
