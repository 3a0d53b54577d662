//! Render engine - scratch voice, playback voice, real-time plumbing
//!
//! - `render`: per-sample scratch synthesis (rate smoothing, gate, slew, fling)
//! - `voice`: ordinary playback voice and gain ramps
//! - `fling`: release-velocity model and decay math
//! - `command`: control ↔ render ring buffers
//! - `renderer`: the audio-thread deck tying it together

pub mod command;
pub mod fling;
pub mod gc;
pub mod interpolation;
mod render;
mod renderer;
mod voice;

pub use command::{
    command_channel, event_channel, CommandField, CommandSender, RenderCommand, RenderEvent,
    COMMAND_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY,
};
pub use fling::{FlingLaunch, FlingModel, RecentRate, ReleaseSample};
pub use gc::{gc_handle, share_buffer};
pub use render::{render_scratch, MuteGate, RenderState, SNAP_SMOOTHED_RATE, SNAP_TARGET_RATE};
pub use renderer::{DeckRenderer, RenderAtomics};
pub use voice::{GainRamp, PlaybackVoice};
