//! Error types for buffer construction
//!
//! The control API itself never fails (operations without a loaded buffer
//! are no-ops), so errors only surface where external data enters the engine.

use thiserror::Error;

/// Errors that can occur when building an [`AudioBuffer`](crate::types::AudioBuffer)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// No channel data supplied
    #[error("Audio buffer has no channels")]
    NoChannels,

    /// Channels are present but contain no frames
    #[error("Audio buffer has no frames")]
    Empty,

    /// Channels differ in length
    #[error("Channel {channel} has {len} frames, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        len: usize,
        expected: usize,
    },

    /// Sample rate of zero
    #[error("Invalid sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// Interleaved data does not divide evenly into frames
    #[error("Interleaved length {len} is not a multiple of {channels} channels")]
    InterleavedLength { len: usize, channels: usize },
}

/// Result type for buffer construction
pub type BufferResult<T> = Result<T, BufferError>;
