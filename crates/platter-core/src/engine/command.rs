//! Lock-free control/render messaging
//!
//! The control domain sends [`RenderCommand`]s through an `rtrb` SPSC ring
//! buffer; the renderer drains them at the start of every block. One-shot
//! [`RenderEvent`]s flow back through a second ring buffer.
//!
//! # Backpressure
//!
//! Most commands set a value ("latest wins"), so when the ring is full the
//! [`CommandSender`] keeps at most one pending command per [`CommandField`]
//! and pushes the backlog on the next send or flush. A newer command for a
//! field replaces the older one and moves to the back of the backlog, so the
//! relative order of the surviving commands matches the order they were sent.
//!
//! ```ignore
//! let (mut tx, rx) = command_channel();
//! tx.send(RenderCommand::StartScratch { session: 1, position_sec: 1.0, rate: 0.0 });
//! // audio thread: renderer drains `rx` at block start
//! ```

use basedrop::Shared;
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use super::voice::GainRamp;
use crate::types::AudioBuffer;

/// Control → render ring capacity
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Render → control ring capacity
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Commands sent from the control domain to the render thread
///
/// Applied in order at the start of a block, before any sample is produced.
pub enum RenderCommand {
    /// Publish a new buffer; resets both voices
    SetBuffer(Shared<AudioBuffer>),
    /// Drop the current buffer; resets both voices
    ClearBuffer,

    /// Begin a scratch session at a position with an initial rate
    ///
    /// `session` is published back through the render atomics so the control
    /// domain can tell which session a scratch position belongs to.
    StartScratch { session: u64, position_sec: f64, rate: f64 },
    /// Slew the scratch voice toward a new position (cancels a fling)
    SetPosition { position_sec: f64 },
    /// New target rate (output samples per output sample)
    SetRate { rate: f64 },
    /// Platter held still: rate zero, output muted
    SetHold(bool),
    /// Continue with an exponentially decaying rate
    Fling { rate: f64, tau: f64 },
    /// End the scratch session immediately
    StopScratch,
    /// Schedule the scratch voice's gain; a ramp ending at 0 ends the session
    ScratchGain(GainRamp),

    /// Start the ordinary playback voice at a device frame
    StartPlayback {
        generation: u64,
        position_sec: f64,
        rate: f64,
        start_frame: u64,
        fade_in: GainRamp,
    },
    /// Change the playback voice rate live
    SetPlaybackRate(f64),
    /// Stop the playback voice
    StopPlayback,
}

/// Coalescing key: commands sharing a field overwrite each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    Buffer,
    ScratchSession,
    ScratchPosition,
    ScratchRate,
    ScratchHold,
    Fling,
    ScratchGain,
    Playback,
    PlaybackRate,
}

impl RenderCommand {
    /// The field this command writes
    pub fn field(&self) -> CommandField {
        match self {
            RenderCommand::SetBuffer(_) | RenderCommand::ClearBuffer => CommandField::Buffer,
            RenderCommand::StartScratch { .. } | RenderCommand::StopScratch => CommandField::ScratchSession,
            RenderCommand::SetPosition { .. } => CommandField::ScratchPosition,
            RenderCommand::SetRate { .. } => CommandField::ScratchRate,
            RenderCommand::SetHold(_) => CommandField::ScratchHold,
            RenderCommand::Fling { .. } => CommandField::Fling,
            RenderCommand::ScratchGain(_) => CommandField::ScratchGain,
            RenderCommand::StartPlayback { .. } | RenderCommand::StopPlayback => CommandField::Playback,
            RenderCommand::SetPlaybackRate(_) => CommandField::PlaybackRate,
        }
    }
}

/// One-shot notifications from the render thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderEvent {
    /// A fling decayed below the stop threshold at this scratch position
    FlingEnded { position_sec: f64 },
    /// The playback voice started with `generation` reached the end of the buffer
    PlaybackEnded { generation: u64 },
}

/// Create the control → render ring
pub fn command_channel() -> (CommandSender, Consumer<RenderCommand>) {
    let (producer, consumer) = RingBuffer::new(COMMAND_QUEUE_CAPACITY);
    (CommandSender::new(producer), consumer)
}

/// Create the render → control ring
pub fn event_channel() -> (Producer<RenderEvent>, Consumer<RenderEvent>) {
    RingBuffer::new(EVENT_QUEUE_CAPACITY)
}

/// Control-side end of the command ring with per-field coalescing
pub struct CommandSender {
    producer: Producer<RenderCommand>,
    backlog: Vec<RenderCommand>,
}

impl CommandSender {
    /// Wrap an existing producer
    pub fn new(producer: Producer<RenderCommand>) -> Self {
        Self {
            producer,
            backlog: Vec::new(),
        }
    }

    /// Send a command, coalescing it into the backlog if the ring is full
    ///
    /// Never blocks. Once anything is backlogged, new commands queue behind
    /// it so ordering across fields is kept.
    pub fn send(&mut self, command: RenderCommand) {
        self.flush();
        if !self.backlog.is_empty() {
            self.coalesce(command);
            return;
        }
        if let Err(PushError::Full(command)) = self.producer.push(command) {
            log::warn!("Render command queue full, coalescing {:?}", command.field());
            self.coalesce(command);
        }
    }

    /// Push as much of the backlog as fits; returns true when it is empty
    pub fn flush(&mut self) -> bool {
        let mut sent = 0;
        while !self.backlog.is_empty() {
            // At most one entry per field, so this stays tiny
            let command = self.backlog.remove(0);
            if let Err(PushError::Full(command)) = self.producer.push(command) {
                self.backlog.insert(0, command);
                break;
            }
            sent += 1;
        }
        if sent > 0 {
            log::debug!("Flushed {} coalesced render commands", sent);
        }
        self.backlog.is_empty()
    }

    /// Number of commands waiting for ring space
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    fn coalesce(&mut self, command: RenderCommand) {
        let field = command.field();
        self.backlog.retain(|queued| queued.field() != field);
        self.backlog.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_sender(capacity: usize) -> (CommandSender, Consumer<RenderCommand>) {
        let (producer, consumer) = RingBuffer::new(capacity);
        (CommandSender::new(producer), consumer)
    }

    #[test]
    fn test_command_channel_creation() {
        let (mut tx, mut rx) = command_channel();
        tx.send(RenderCommand::SetRate { rate: 1.5 });

        let cmd = rx.pop().unwrap();
        assert!(matches!(cmd, RenderCommand::SetRate { rate } if rate == 1.5));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_full_queue_coalesces_per_field() {
        let (mut tx, mut rx) = small_sender(1);
        tx.send(RenderCommand::SetHold(true));
        tx.send(RenderCommand::SetRate { rate: 0.5 });
        tx.send(RenderCommand::SetPosition { position_sec: 2.0 });
        tx.send(RenderCommand::SetRate { rate: 0.75 });
        // Rate replaced, and moved behind the position
        assert_eq!(tx.pending(), 2);

        assert!(matches!(rx.pop().unwrap(), RenderCommand::SetHold(true)));
        assert!(!tx.flush());
        assert!(matches!(rx.pop().unwrap(), RenderCommand::SetPosition { position_sec } if position_sec == 2.0));
        assert!(tx.flush());
        assert!(matches!(rx.pop().unwrap(), RenderCommand::SetRate { rate } if rate == 0.75));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_send_flushes_backlog_first() {
        let (mut tx, mut rx) = small_sender(2);
        tx.send(RenderCommand::StopPlayback);
        tx.send(RenderCommand::SetRate { rate: 1.0 });
        tx.send(RenderCommand::StopScratch);
        assert_eq!(tx.pending(), 1);

        rx.pop().unwrap();
        rx.pop().unwrap();
        tx.send(RenderCommand::SetHold(false));
        assert_eq!(tx.pending(), 0);
        assert!(matches!(rx.pop().unwrap(), RenderCommand::StopScratch));
        assert!(matches!(rx.pop().unwrap(), RenderCommand::SetHold(false)));
    }

    #[test]
    fn test_session_commands_share_a_field() {
        let start = RenderCommand::StartScratch {
            session: 1,
            position_sec: 0.0,
            rate: 0.0,
        };
        assert_eq!(start.field(), RenderCommand::StopScratch.field());
        assert_eq!(RenderCommand::ClearBuffer.field(), CommandField::Buffer);
        assert_ne!(
            RenderCommand::SetPlaybackRate(1.0).field(),
            RenderCommand::StopPlayback.field()
        );
    }

    #[test]
    fn test_command_size() {
        // Keep commands within one cache line
        let size = std::mem::size_of::<RenderCommand>();
        assert!(size <= 64, "RenderCommand is {} bytes, expected <= 64", size);
    }
}
