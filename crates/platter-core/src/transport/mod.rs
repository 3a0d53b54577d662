//! Deck transport - control-domain state machines
//!
//! - `deck`: the transport controller and `deck_pair` construction
//! - `cue`: cue points and the tap/hold cue button
//! - `guard`: lock/debounce windows for user operations
//! - `resume`: scratch → playback crossfade scheduling
//! - `gesture`: platter angle tracking
//! - `clock`: time sources

mod clock;
mod cue;
mod deck;
mod events;
mod gesture;
mod guard;
mod resume;

pub use clock::{Clock, DeviceClock, LiveClock, ManualClock};
pub use cue::{CueAction, CueMachine, CuePoints, CueState};
pub use deck::{deck_pair, deck_pair_with_clock, DeckTransport};
pub use events::DeckEvent;
pub use gesture::{wrap_degrees, GestureUpdate, ScratchGesture};
pub use guard::OpGuard;
pub use resume::{release_outcome, ReleaseOutcome, ResumePlan, ResumeScheduler};
