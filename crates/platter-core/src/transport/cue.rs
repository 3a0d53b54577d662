//! Cue points and the tap/hold cue button
//!
//! The cue button is a small state machine driven by press/release calls
//! and by deadline checks from the deck's `poll()`:
//!
//! ```text
//! Idle --press--> AwaitingHoldConfirm --release before deadline--> Idle (tap)
//!                        |
//!                   deadline passed
//!                        v
//!                   TempPlaying --release--> Idle (return to cue)
//! ```

use crate::types::HOT_CUE_SLOTS;

/// Cue button state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueState {
    Idle,
    AwaitingHoldConfirm { press_position: f64, deadline: f64 },
    TempPlaying,
}

/// What the deck has to do in response to the cue button
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueAction {
    None,
    /// Tap while stopped: move to the main cue
    JumpTo(f64),
    /// Tap while playing: the main cue becomes this position
    SetMain(f64),
    /// Hold confirmed: temp cue set here, start temporary playback
    StartTemp(f64),
    /// Released after holding: stop and return here
    ReturnTo(f64),
}

/// Stored cue positions of a deck
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CuePoints {
    pub main: Option<f64>,
    pub temp: Option<f64>,
    hot: [Option<f64>; HOT_CUE_SLOTS],
}

impl CuePoints {
    /// Hot cue in slot `n` (1-based)
    pub fn hot(&self, n: usize) -> Option<f64> {
        slot(n).and_then(|i| self.hot[i])
    }

    /// Store a hot cue; false if `n` is not a valid slot
    pub fn set_hot(&mut self, n: usize, position: f64) -> bool {
        match slot(n) {
            Some(i) => {
                self.hot[i] = Some(position);
                true
            }
            None => false,
        }
    }

    /// Remove a hot cue; returns the cleared position
    pub fn clear_hot(&mut self, n: usize) -> Option<f64> {
        slot(n).and_then(|i| self.hot[i].take())
    }
}

fn slot(n: usize) -> Option<usize> {
    (1..=HOT_CUE_SLOTS).contains(&n).then(|| n - 1)
}

/// The cue button state machine plus the cue points it edits
#[derive(Debug, Clone)]
pub struct CueMachine {
    state: CueState,
    hold_threshold: f64,
    pub points: CuePoints,
}

impl CueMachine {
    pub fn new(hold_threshold: f64) -> Self {
        Self {
            state: CueState::Idle,
            hold_threshold,
            points: CuePoints::default(),
        }
    }

    pub fn state(&self) -> CueState {
        self.state
    }

    /// Forget state and points (new track)
    pub fn reset(&mut self) {
        self.state = CueState::Idle;
        self.points = CuePoints::default();
    }

    /// Button down at `position`
    pub fn press(&mut self, position: f64, now: f64) {
        if self.state != CueState::Idle {
            return;
        }
        self.state = CueState::AwaitingHoldConfirm {
            press_position: position,
            deadline: now + self.hold_threshold,
        };
    }

    /// Check the hold deadline
    pub fn poll(&mut self, now: f64) -> CueAction {
        match self.state {
            CueState::AwaitingHoldConfirm { press_position, deadline } if now >= deadline => {
                self.points.temp = Some(press_position);
                self.state = CueState::TempPlaying;
                CueAction::StartTemp(press_position)
            }
            _ => CueAction::None,
        }
    }

    /// Button up
    ///
    /// `playing` and `position` describe the deck at release time.
    pub fn release(&mut self, now: f64, playing: bool, position: f64) -> CueAction {
        match self.state {
            CueState::Idle => CueAction::None,
            CueState::AwaitingHoldConfirm { press_position, deadline } => {
                self.state = CueState::Idle;
                if now >= deadline {
                    // Held long enough but never polled: treat as a hold that ended
                    self.points.temp = Some(press_position);
                    CueAction::ReturnTo(press_position)
                } else if playing {
                    self.points.main = Some(position);
                    CueAction::SetMain(position)
                } else {
                    self.points.main.map_or(CueAction::None, CueAction::JumpTo)
                }
            }
            CueState::TempPlaying => self.finish_temp(),
        }
    }

    /// Enter temporary playback without the button (explicit API)
    pub fn begin_temp(&mut self) {
        self.state = CueState::TempPlaying;
    }

    /// Leave temporary playback; where to return to
    pub fn finish_temp(&mut self) -> CueAction {
        self.state = CueState::Idle;
        match self.points.temp.or(self.points.main) {
            Some(position) => CueAction::ReturnTo(position),
            None => CueAction::None,
        }
    }
}
