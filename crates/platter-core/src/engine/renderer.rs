//! Real-time side of a deck
//!
//! [`DeckRenderer`] owns both voices, drains the command ring at block start,
//! renders, reports one-shot events and publishes its state through
//! [`RenderAtomics`] for lock-free reads from the control domain.
//!
//! Everything here runs on the audio thread: no locks, no allocation, no
//! logging.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::Shared;
use rtrb::{Consumer, Producer};

use super::command::{RenderCommand, RenderEvent};
use super::render::{render_scratch, RenderState};
use super::voice::PlaybackVoice;
use crate::config::RenderConfig;
use crate::types::{finite_or_zero, AudioBuffer, Sample};

/// Render-thread state readable from any thread
///
/// Written once per block after rendering, so every value is constant
/// between two blocks.
pub struct RenderAtomics {
    sample_rate: u32,
    /// Device frames rendered so far
    frame: AtomicU64,
    /// Scratch position in seconds (f64 bits)
    scratch_position: AtomicU64,
    scratch_active: AtomicBool,
    /// Session tag of the last started scratch
    scratch_session: AtomicU64,
    fling_active: AtomicBool,
    /// Playback position in seconds (f64 bits)
    playback_position: AtomicU64,
    playback_active: AtomicBool,
}

impl RenderAtomics {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frame: AtomicU64::new(0),
            scratch_position: AtomicU64::new(0f64.to_bits()),
            scratch_active: AtomicBool::new(false),
            scratch_session: AtomicU64::new(0),
            fling_active: AtomicBool::new(false),
            playback_position: AtomicU64::new(0f64.to_bits()),
            playback_active: AtomicBool::new(false),
        }
    }

    /// Device output sample rate
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device frames rendered so far
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// Device time in seconds
    #[inline]
    pub fn device_time(&self) -> f64 {
        self.frame() as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn scratch_position(&self) -> f64 {
        f64::from_bits(self.scratch_position.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_scratch_active(&self) -> bool {
        self.scratch_active.load(Ordering::Relaxed)
    }

    /// Session tag of the scratch voice (0 before the first scratch)
    #[inline]
    pub fn scratch_session(&self) -> u64 {
        self.scratch_session.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_fling_active(&self) -> bool {
        self.fling_active.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn playback_position(&self) -> f64 {
        f64::from_bits(self.playback_position.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_playback_active(&self) -> bool {
        self.playback_active.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn advance(&self, frames: u64) {
        self.frame.fetch_add(frames, Ordering::Relaxed);
    }
}

/// One-shot events waiting for space in the event ring
///
/// Each kind is latched until a push succeeds.
struct EventOutbox {
    producer: Producer<RenderEvent>,
    playback_ended: Option<u64>,
    fling_ended: Option<f64>,
}

impl EventOutbox {
    fn flush(&mut self) {
        if let Some(generation) = self.playback_ended {
            if self.producer.push(RenderEvent::PlaybackEnded { generation }).is_ok() {
                self.playback_ended = None;
            }
        }
        if let Some(position_sec) = self.fling_ended {
            if self.producer.push(RenderEvent::FlingEnded { position_sec }).is_ok() {
                self.fling_ended = None;
            }
        }
    }
}

/// Audio-thread half of a deck
pub struct DeckRenderer {
    scratch: RenderState,
    scratch_session: u64,
    playback: PlaybackVoice,
    buffer: Option<Shared<AudioBuffer>>,
    output_rate: u32,
    frame: u64,
    commands: Consumer<RenderCommand>,
    events: EventOutbox,
    atomics: Arc<RenderAtomics>,
}

impl DeckRenderer {
    pub fn new(
        config: &RenderConfig,
        output_rate: u32,
        commands: Consumer<RenderCommand>,
        events: Producer<RenderEvent>,
    ) -> Self {
        let output_rate = output_rate.max(1);
        Self {
            scratch: RenderState::new(config, output_rate),
            scratch_session: 0,
            playback: PlaybackVoice::new(),
            buffer: None,
            output_rate,
            frame: 0,
            commands,
            events: EventOutbox {
                producer: events,
                playback_ended: None,
                fling_ended: None,
            },
            atomics: Arc::new(RenderAtomics::new(output_rate)),
        }
    }

    /// Shared state for the control domain
    pub fn atomics(&self) -> Arc<RenderAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Scratch voice state (read-only)
    pub fn scratch_state(&self) -> &RenderState {
        &self.scratch
    }

    /// Apply every queued command, in order
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::SetBuffer(buffer) => {
                // The previous buffer's memory is reclaimed by the collector thread
                self.buffer = Some(buffer);
                self.scratch.reset();
                self.playback.stop();
            }
            RenderCommand::ClearBuffer => {
                self.buffer = None;
                self.scratch.reset();
                self.playback.stop();
            }
            RenderCommand::StartScratch {
                session,
                position_sec,
                rate,
            } => {
                self.scratch_session = session;
                self.scratch.start(position_sec, rate);
            }
            RenderCommand::SetPosition { position_sec } => self.scratch.set_position(position_sec),
            RenderCommand::SetRate { rate } => self.scratch.set_rate(rate),
            RenderCommand::SetHold(hold) => self.scratch.set_hold(hold),
            RenderCommand::Fling { rate, tau } => self.scratch.fling(rate, tau),
            RenderCommand::StopScratch => self.scratch.stop(),
            RenderCommand::ScratchGain(ramp) => self.scratch.set_gain(ramp),
            RenderCommand::StartPlayback {
                generation,
                position_sec,
                rate,
                start_frame,
                fade_in,
            } => {
                let position = finite_or_zero(position_sec).max(0.0) * self.output_rate as f64;
                self.playback.start(generation, position, rate, start_frame, fade_in);
            }
            RenderCommand::SetPlaybackRate(rate) => self.playback.set_rate(rate),
            RenderCommand::StopPlayback => self.playback.stop(),
        }
    }

    /// Render one block into `output` (one slice per channel)
    ///
    /// The block length is the shortest channel slice.
    pub fn process(&mut self, output: &mut [&mut [Sample]]) {
        self.process_commands();

        let frames = output.iter().map(|ch| ch.len()).min().unwrap_or(0);
        let buffer = self.buffer.as_deref();

        if let Some(position) = render_scratch(&mut self.scratch, buffer, self.frame, output, frames) {
            self.events.fling_ended = Some(position);
        }
        if let Some(buffer) = buffer {
            if let Some(generation) = self.playback.render(buffer, self.output_rate, self.frame, output, frames) {
                self.events.playback_ended = Some(generation);
            }
        }
        self.events.flush();

        self.frame += frames as u64;
        self.publish();
    }

    fn publish(&self) {
        let sr = self.output_rate as f64;
        let a = &self.atomics;
        a.scratch_position
            .store(self.scratch.position_seconds().to_bits(), Ordering::Relaxed);
        a.scratch_active.store(self.scratch.is_active(), Ordering::Relaxed);
        a.scratch_session.store(self.scratch_session, Ordering::Relaxed);
        a.fling_active.store(self.scratch.is_fling_active(), Ordering::Relaxed);
        a.playback_position
            .store((self.playback.position() / sr).to_bits(), Ordering::Relaxed);
        a.playback_active.store(self.playback.is_active(), Ordering::Relaxed);
        a.frame.store(self.frame, Ordering::Relaxed);
    }
}
