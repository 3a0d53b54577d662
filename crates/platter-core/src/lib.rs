//! Platter Core - virtual turntable transport and scratch synthesis
//!
//! A deck is split in two halves created together by
//! [`deck_pair`](transport::deck_pair):
//!
//! - [`DeckTransport`](transport::DeckTransport) lives on the control thread
//!   and handles play/pause/seek, cues, platter gestures and fling/resume
//! - [`DeckRenderer`](engine::DeckRenderer) lives in the audio callback and
//!   renders the scratch and playback voices without locking or allocating

pub mod config;
pub mod engine;
pub mod error;
pub mod transport;
pub mod types;

pub use error::{BufferError, BufferResult};
pub use types::*;
