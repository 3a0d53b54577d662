//! Common types for Platter
//!
//! This module contains the decoded audio buffer consumed by the engine and
//! the numeric limits shared by the control and render domains.

use crate::error::{BufferError, BufferResult};

/// Default output sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Maximum playback/scratch speed magnitude (8x normal speed)
///
/// Every rate entering the render path is clamped to `[-MAX_RATE, MAX_RATE]`.
pub const MAX_RATE: f64 = 8.0;

/// Number of hot cue slots per deck (addressed 1..=8)
pub const HOT_CUE_SLOTS: usize = 8;

/// Audio sample type
pub type Sample = f32;

/// Replace NaN/infinite values with zero
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp a rate to the engine's speed bounds, treating non-finite input as zero
#[inline]
pub fn clamp_rate(rate: f64) -> f64 {
    finite_or_zero(rate).clamp(-MAX_RATE, MAX_RATE)
}

/// A decoded, immutable audio buffer
///
/// Per-channel sample arrays at a fixed sample rate. Once built it is never
/// mutated; loading a new track replaces the whole buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from separate channel arrays
    ///
    /// All channels must have the same, non-zero length.
    pub fn new(channels: Vec<Vec<Sample>>, sample_rate: u32) -> BufferResult<Self> {
        if sample_rate == 0 {
            return Err(BufferError::InvalidSampleRate(sample_rate));
        }
        let Some(first) = channels.first() else {
            return Err(BufferError::NoChannels);
        };
        let expected = first.len();
        if expected == 0 {
            return Err(BufferError::Empty);
        }
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(BufferError::ChannelLengthMismatch {
                channel,
                len: ch.len(),
                expected,
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel buffer
    pub fn mono(samples: Vec<Sample>, sample_rate: u32) -> BufferResult<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a buffer from interleaved samples [c0, c1, .., c0, c1, ..]
    pub fn from_interleaved(
        interleaved: &[Sample],
        channel_count: usize,
        sample_rate: u32,
    ) -> BufferResult<Self> {
        if channel_count == 0 {
            return Err(BufferError::NoChannels);
        }
        if interleaved.len() % channel_count != 0 {
            return Err(BufferError::InterleavedLength {
                len: interleaved.len(),
                channels: channel_count,
            });
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &sample) in channels.iter_mut().zip(frame) {
                ch.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate of the stored data
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Get a channel's samples
    ///
    /// Indices past the last channel fall back to channel 0, so a mono
    /// buffer feeds every output channel.
    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        self.channels.get(index).unwrap_or(&self.channels[0])
    }

    /// Clamp a position in seconds to `[0, duration]`
    pub fn clamp_position(&self, seconds: f64) -> f64 {
        finite_or_zero(seconds).clamp(0.0, self.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_validation() {
        assert_eq!(AudioBuffer::new(vec![], 48000), Err(BufferError::NoChannels));
        assert_eq!(AudioBuffer::new(vec![vec![]], 48000), Err(BufferError::Empty));
        assert_eq!(
            AudioBuffer::new(vec![vec![0.0; 4]], 0),
            Err(BufferError::InvalidSampleRate(0))
        );
        assert_eq!(
            AudioBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 48000),
            Err(BufferError::ChannelLengthMismatch {
                channel: 1,
                len: 3,
                expected: 4
            })
        );
    }

    #[test]
    fn test_buffer_from_interleaved() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 44100).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), &[0.1, 0.3]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4]);

        assert!(matches!(
            AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3], 2, 44100),
            Err(BufferError::InterleavedLength { .. })
        ));
    }

    #[test]
    fn test_duration_and_clamp() {
        let buffer = AudioBuffer::mono(vec![0.0; 44100 * 2], 44100).unwrap();
        assert!((buffer.duration() - 2.0).abs() < 1e-12);
        assert_eq!(buffer.clamp_position(-1.0), 0.0);
        assert_eq!(buffer.clamp_position(5.0), 2.0);
        assert_eq!(buffer.clamp_position(f64::NAN), 0.0);
        // Mono buffers feed every output channel
        assert_eq!(buffer.channel(3).len(), buffer.frames());
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(12.0), MAX_RATE);
        assert_eq!(clamp_rate(-12.0), -MAX_RATE);
        assert_eq!(clamp_rate(f64::INFINITY), 0.0);
        assert_eq!(clamp_rate(1.5), 1.5);
    }
}
