//! Notifications from a deck to UI collaborators

use super::resume::ResumePlan;

/// Something observable happened on the deck
///
/// Delivered through the crossbeam receiver returned by
/// [`DeckTransport::events`](super::DeckTransport::events).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeckEvent {
    /// A buffer was loaded
    Loaded { duration: f64 },
    Unloaded,
    Play,
    Pause,
    Seek { position: f64 },
    /// Playback ran off the end of the track
    Ended,
    Rate { rate: f64 },
    TempCueSet { position: f64 },
    TempCueStop { position: f64 },
    /// Temporary (held cue) playback returned to its cue
    CueReturn { position: f64 },
    FlingStart { rate: f64, tau: f64 },
    /// Playback starts fading in while the fling is still audible
    FlingOverlapStart { position: f64 },
    FlingEnd { position: f64 },
    /// A scratch handed back to playback through a crossfade
    Resume { plan: ResumePlan },
}
