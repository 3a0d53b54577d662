//! Gain automation and the ordinary playback voice
//!
//! Handoffs between scratch output and normal playback are expressed as
//! [`GainRamp`]s pinned to device frames, so the control domain can schedule
//! both halves of a crossfade over the exact same window.

use crate::types::{clamp_rate, AudioBuffer, Sample};

use super::interpolation::read_cubic;

/// Linear gain automation between two device frames
///
/// Before `start_frame` the gain is `from`, after `end_frame` it is `to`,
/// and in between it moves linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    pub start_frame: u64,
    pub end_frame: u64,
    pub from: f32,
    pub to: f32,
}

impl GainRamp {
    /// Constant unity gain
    pub const UNITY: GainRamp = GainRamp::constant(1.0);

    /// A ramp that holds one gain forever
    pub const fn constant(gain: f32) -> Self {
        Self {
            start_frame: 0,
            end_frame: 0,
            from: gain,
            to: gain,
        }
    }

    /// Create a ramp from `from` to `to` over `[start_frame, end_frame]`
    ///
    /// An inverted window collapses to a step at `start_frame`.
    pub fn new(start_frame: u64, end_frame: u64, from: f32, to: f32) -> Self {
        Self {
            start_frame,
            end_frame: end_frame.max(start_frame),
            from,
            to,
        }
    }

    /// Gain at a device frame
    #[inline]
    pub fn gain_at(&self, frame: u64) -> f32 {
        if frame >= self.end_frame {
            self.to
        } else if frame <= self.start_frame {
            self.from
        } else {
            let span = (self.end_frame - self.start_frame) as f32;
            let t = (frame - self.start_frame) as f32 / span;
            self.from + (self.to - self.from) * t
        }
    }

    /// Whether the ramp has reached its final value at `frame`
    #[inline]
    pub fn is_finished(&self, frame: u64) -> bool {
        frame >= self.end_frame
    }
}

impl Default for GainRamp {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Ordinary timed playback of the loaded buffer
///
/// Started at a scheduled device frame, advances at a fixed rate and reports
/// its generation once when it runs off the end of the buffer.
#[derive(Debug, Clone)]
pub struct PlaybackVoice {
    active: bool,
    generation: u64,
    /// Position in output-rate samples
    position: f64,
    rate: f64,
    start_frame: u64,
    gain: GainRamp,
}

impl Default for PlaybackVoice {
    fn default() -> Self {
        Self {
            active: false,
            generation: 0,
            position: 0.0,
            rate: 1.0,
            start_frame: 0,
            gain: GainRamp::UNITY,
        }
    }
}

impl PlaybackVoice {
    /// Create an idle voice
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing from `position` (output-rate samples) at `start_frame`
    pub fn start(&mut self, generation: u64, position: f64, rate: f64, start_frame: u64, fade_in: GainRamp) {
        self.active = true;
        self.generation = generation;
        self.position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.rate = clamp_rate(rate);
        self.start_frame = start_frame;
        self.gain = fade_in;
    }

    /// Stop immediately
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Change the rate of a running voice
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = clamp_rate(rate);
    }

    /// Whether the voice is producing (or scheduled to produce) audio
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Generation tag of the current/last start
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current position in output-rate samples
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Mix `frames` samples into `output`
    ///
    /// `block_start` is the device frame of `output[..][0]`. Returns the
    /// generation if the voice reached the end of the buffer in this block.
    pub fn render(
        &mut self,
        buffer: &AudioBuffer,
        output_rate: u32,
        block_start: u64,
        output: &mut [&mut [Sample]],
        frames: usize,
    ) -> Option<u64> {
        if !self.active {
            return None;
        }
        let resample = buffer.sample_rate() as f64 / output_rate as f64;
        let end = buffer.frames() as f64 / resample;

        for i in 0..frames {
            let frame = block_start + i as u64;
            if frame < self.start_frame {
                continue;
            }
            if self.position >= end - 1.0 {
                self.active = false;
                return Some(self.generation);
            }

            let index = self.position * resample;
            let gain = self.gain.gain_at(frame);
            for (ch, out) in output.iter_mut().enumerate() {
                out[i] += read_cubic(buffer.channel(ch), index) * gain;
            }
            self.position += self.rate;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_shape() {
        let ramp = GainRamp::new(100, 200, 0.0, 1.0);
        assert_eq!(ramp.gain_at(0), 0.0);
        assert_eq!(ramp.gain_at(100), 0.0);
        assert!((ramp.gain_at(150) - 0.5).abs() < 1e-6);
        assert_eq!(ramp.gain_at(200), 1.0);
        assert_eq!(ramp.gain_at(10_000), 1.0);
        assert!(!ramp.is_finished(199));
        assert!(ramp.is_finished(200));
    }

    #[test]
    fn test_ramp_degenerate_window() {
        let ramp = GainRamp::new(50, 10, 1.0, 0.0);
        assert_eq!(ramp.end_frame, 50);
        assert_eq!(ramp.gain_at(49), 1.0);
        assert_eq!(ramp.gain_at(50), 0.0);
        assert_eq!(GainRamp::UNITY.gain_at(12345), 1.0);
    }

    #[test]
    fn test_voice_waits_for_start_frame() {
        let buffer = AudioBuffer::mono(vec![0.5; 1000], 48000).unwrap();
        let mut voice = PlaybackVoice::new();
        voice.start(1, 0.0, 1.0, 10, GainRamp::UNITY);

        let mut out = vec![0.0; 32];
        let ended = voice.render(&buffer, 48000, 0, &mut [out.as_mut_slice()], 32);
        assert!(ended.is_none());
        assert!(out[..10].iter().all(|&s| s == 0.0));
        assert!(out[10..].iter().all(|&s| s == 0.5));
        assert!((voice.position() - 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_voice_reports_end_once() {
        let buffer = AudioBuffer::mono(vec![0.25; 64], 48000).unwrap();
        let mut voice = PlaybackVoice::new();
        voice.start(7, 0.0, 1.0, 0, GainRamp::UNITY);

        let mut out = vec![0.0; 128];
        assert_eq!(voice.render(&buffer, 48000, 0, &mut [out.as_mut_slice()], 128), Some(7));
        assert!(!voice.is_active());
        assert_eq!(voice.render(&buffer, 48000, 128, &mut [out.as_mut_slice()], 128), None);
    }

    #[test]
    fn test_voice_resamples() {
        // 24kHz buffer played on a 48kHz device advances half a source sample per frame
        let data: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let buffer = AudioBuffer::mono(data, 24000).unwrap();
        let mut voice = PlaybackVoice::new();
        voice.start(1, 0.0, 1.0, 0, GainRamp::UNITY);

        let mut out = vec![0.0; 8];
        voice.render(&buffer, 48000, 0, &mut [out.as_mut_slice()], 8);
        assert!((out[2] - 0.01).abs() < 1e-6, "Got {}", out[2]);
        assert!((out[3] - 0.015).abs() < 1e-6, "Got {}", out[3]);
    }
}
