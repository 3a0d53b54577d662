//! Deck transport controller
//!
//! [`DeckTransport`] is the control-domain half of a deck. It owns the
//! transport state (position, play state, rate, cues), turns user
//! operations into [`RenderCommand`]s for the [`DeckRenderer`], reacts to
//! the renderer's one-shot events and reports [`DeckEvent`]s to the UI.
//!
//! It is single-threaded and cooperative: call [`DeckTransport::poll`]
//! regularly (every UI frame is plenty) so hold deadlines, fling overlaps and
//! render events are handled.
//!
//! ```ignore
//! let (mut deck, mut renderer) = deck_pair(DeckConfig::default(), 48000);
//! // move `renderer` into the audio callback: renderer.process(&mut channels)
//! deck.load(buffer);
//! deck.play();
//! loop {
//!     deck.poll();
//!     for event in deck.events().try_iter() { /* update UI */ }
//! }
//! ```

use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use rtrb::Consumer;

use super::clock::{Clock, DeviceClock, LiveClock};
use super::cue::{CueAction, CueMachine, CueState};
use super::events::DeckEvent;
use super::gesture::ScratchGesture;
use super::guard::OpGuard;
use super::resume::{release_outcome, ReleaseOutcome, ResumePlan, ResumeScheduler};
use crate::config::DeckConfig;
use crate::engine::fling::{time_to_rate, FLING_START_RATE};
use crate::engine::{
    command_channel, event_channel, share_buffer, CommandSender, DeckRenderer, FlingModel, GainRamp,
    RenderAtomics, RenderCommand, RenderEvent, ReleaseSample,
};
use crate::types::{clamp_rate, finite_or_zero, AudioBuffer, MAX_RATE};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScratchPhase {
    /// Hand on the platter (or released into a stopped deck)
    Scratching,
    /// Coasting; `resume` hands back to playback when it is over
    Flinging {
        resume: bool,
        fade: Option<f64>,
        resume_pos: f64,
        overlap_at: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
struct ScratchSession {
    /// Tag sent with `StartScratch`
    id: u64,
    was_playing: bool,
    /// Last position the control domain asked for (fallback for the live value)
    position: f64,
    phase: ScratchPhase,
}

/// Create a connected transport/renderer pair driven by the device clock
pub fn deck_pair(config: DeckConfig, output_rate: u32) -> (DeckTransport<DeviceClock>, DeckRenderer) {
    build_pair(config, output_rate, DeviceClock::new)
}

/// Create a connected pair with a custom time source
pub fn deck_pair_with_clock<C: Clock>(
    config: DeckConfig,
    output_rate: u32,
    clock: C,
) -> (DeckTransport<C>, DeckRenderer) {
    build_pair(config, output_rate, move |_| clock)
}

fn build_pair<C: Clock>(
    config: DeckConfig,
    output_rate: u32,
    make_clock: impl FnOnce(Arc<RenderAtomics>) -> C,
) -> (DeckTransport<C>, DeckRenderer) {
    let (commands, command_rx) = command_channel();
    let (event_tx, render_events) = event_channel();
    let renderer = DeckRenderer::new(&config.render, output_rate, command_rx, event_tx);
    let atomics = renderer.atomics();
    let clock = make_clock(Arc::clone(&atomics));
    let transport = DeckTransport::new(config, renderer.output_rate(), clock, commands, render_events, atomics);
    (transport, renderer)
}

/// Control-domain half of a deck
pub struct DeckTransport<C: Clock = DeviceClock> {
    config: DeckConfig,
    output_rate: u32,
    clock: C,
    commands: CommandSender,
    render_events: Consumer<RenderEvent>,
    atomics: Arc<RenderAtomics>,
    events_tx: Sender<DeckEvent>,
    events_rx: Receiver<DeckEvent>,

    /// `Some` while a buffer is loaded
    duration: Option<f64>,
    /// Paused-at position (seconds)
    position: f64,
    /// `Some` exactly while playing
    live: Option<LiveClock>,
    playback_rate: f64,
    /// Tag of the latest playback voice start
    generation: u64,
    /// Tag of the latest scratch session
    scratch_sessions: u64,
    /// Renderer frame count and the clock time it was first seen at
    frame_anchor: Option<(u64, f64)>,

    guard: OpGuard,
    cue: CueMachine,
    scratch: Option<ScratchSession>,
    gesture: ScratchGesture,
    fling_model: FlingModel,
    scheduler: ResumeScheduler,
}

impl<C: Clock> DeckTransport<C> {
    fn new(
        config: DeckConfig,
        output_rate: u32,
        clock: C,
        commands: CommandSender,
        render_events: Consumer<RenderEvent>,
        atomics: Arc<RenderAtomics>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            output_rate,
            clock,
            commands,
            render_events,
            atomics,
            events_tx,
            events_rx,
            duration: None,
            position: 0.0,
            live: None,
            playback_rate: 1.0,
            generation: 0,
            scratch_sessions: 0,
            frame_anchor: None,
            guard: OpGuard::new(&config.transport),
            cue: CueMachine::new(config.transport.cue_hold_threshold),
            scratch: None,
            gesture: ScratchGesture::new(config.gesture.clone()),
            fling_model: FlingModel::new(config.fling.clone(), config.gesture.sensitivity),
            scheduler: ResumeScheduler::new(config.resume.clone(), output_rate),
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    /// Receiver for deck notifications (clones share one queue)
    pub fn events(&self) -> Receiver<DeckEvent> {
        self.events_rx.clone()
    }

    /// Render-thread state published after every block
    pub fn atomics(&self) -> &Arc<RenderAtomics> {
        &self.atomics
    }

    pub fn is_loaded(&self) -> bool {
        self.duration.is_some()
    }

    /// Track length in seconds (0 when nothing is loaded)
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn is_playing(&self) -> bool {
        self.live.is_some()
    }

    pub fn is_scratching(&self) -> bool {
        self.scratch.is_some()
    }

    pub fn is_flinging(&self) -> bool {
        matches!(
            self.scratch,
            Some(ScratchSession {
                phase: ScratchPhase::Flinging { .. },
                ..
            })
        )
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn main_cue(&self) -> Option<f64> {
        self.cue.points.main
    }

    pub fn temp_cue(&self) -> Option<f64> {
        self.cue.points.temp
    }

    pub fn hot_cue(&self, n: usize) -> Option<f64> {
        self.cue.points.hot(n)
    }

    pub fn cue_state(&self) -> CueState {
        self.cue.state()
    }

    /// Current track position in seconds
    ///
    /// Live while playing, the rendered scratch position during a scratch or
    /// fling, otherwise the stored position.
    pub fn position(&self) -> f64 {
        let Some(duration) = self.duration else {
            return 0.0;
        };
        if let Some(session) = &self.scratch {
            return self.live_scratch_position(session, session.position).clamp(0.0, duration);
        }
        match &self.live {
            Some(live) => live.position(self.clock.now(), duration),
            None => self.position,
        }
    }

    /// Rendered position of `session`, or `fallback` until the renderer has
    /// started it
    fn live_scratch_position(&self, session: &ScratchSession, fallback: f64) -> f64 {
        if self.atomics.is_scratch_active() && self.atomics.scratch_session() == session.id {
            self.atomics.scratch_position()
        } else {
            fallback
        }
    }

    /// Device frame matching clock time `now`
    ///
    /// The renderer's frame counter moves once per block; clock time passed
    /// since the current count was first seen is added on top.
    fn frame_at(&mut self, now: f64) -> u64 {
        let frame = self.atomics.frame();
        let at = match self.frame_anchor {
            Some((seen, at)) if seen == frame => at,
            _ => {
                self.frame_anchor = Some((frame, now));
                now
            }
        };
        let ahead = ((now - at) * self.output_rate as f64).round().max(0.0);
        frame + ahead as u64
    }

    fn clamp_to_track(&self, seconds: f64) -> f64 {
        finite_or_zero(seconds).clamp(0.0, self.duration())
    }

    fn emit(&self, event: DeckEvent) {
        // We hold a receiver ourselves, so the channel never disconnects
        let _ = self.events_tx.send(event);
    }

    // ─────────────────────────────────────────────────────────────
    // Track management
    // ─────────────────────────────────────────────────────────────

    /// Publish a new buffer and reset transport and cues
    pub fn load(&mut self, buffer: AudioBuffer) {
        let duration = buffer.duration();
        log::info!(
            "Loading buffer: {:.2}s, {} channel(s) @ {}Hz",
            duration,
            buffer.channel_count(),
            buffer.sample_rate()
        );
        self.commands.send(RenderCommand::SetBuffer(share_buffer(buffer)));
        self.reset_transport();
        self.duration = Some(duration);
        self.emit(DeckEvent::Loaded { duration });
    }

    /// Drop the loaded buffer
    pub fn unload(&mut self) {
        if self.duration.is_none() {
            return;
        }
        log::info!("Unloading deck");
        self.commands.send(RenderCommand::ClearBuffer);
        self.reset_transport();
        self.duration = None;
        self.emit(DeckEvent::Unloaded);
    }

    fn reset_transport(&mut self) {
        self.position = 0.0;
        self.live = None;
        self.scratch = None;
        // Invalidates end-of-track reports from the previous buffer
        self.generation += 1;
        self.cue.reset();
        self.guard.reset();
    }

    // ─────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────

    fn start_playback(&mut self, position: f64) {
        let now = self.clock.now();
        let start_frame = self.frame_at(now);
        self.generation += 1;
        self.commands.send(RenderCommand::StartPlayback {
            generation: self.generation,
            position_sec: position,
            rate: self.playback_rate,
            start_frame,
            fade_in: GainRamp::UNITY,
        });
        self.live = Some(LiveClock {
            start_time: now,
            offset: position,
            rate: self.playback_rate,
        });
        self.position = position;
    }

    fn stop_playback(&mut self) {
        if let Some(live) = self.live.take() {
            self.position = live.position(self.clock.now(), self.duration());
            self.commands.send(RenderCommand::StopPlayback);
        }
    }

    /// Start playback from the stored position
    ///
    /// Dropped when nothing is loaded, already playing, or inside the
    /// lock/debounce windows. During a scratch it only marks the deck to
    /// resume on release.
    pub fn play(&mut self) -> bool {
        if self.duration.is_none() || self.is_playing() {
            return false;
        }
        if self.scratch.map_or(false, |s| s.was_playing) {
            return false;
        }
        if !self.guard.try_enter(self.clock.now(), true) {
            log::debug!("play() dropped by guard");
            return false;
        }
        match self.scratch.as_mut() {
            Some(session) => session.was_playing = true,
            None => self.start_playback(self.position),
        }
        self.emit(DeckEvent::Play);
        true
    }

    /// Freeze the position and stop playback
    pub fn pause(&mut self) -> bool {
        let scratch_playing = self.scratch.map_or(false, |s| s.was_playing);
        if !self.is_playing() && !scratch_playing {
            return false;
        }
        if !self.guard.try_enter(self.clock.now(), true) {
            log::debug!("pause() dropped by guard");
            return false;
        }
        match self.scratch.as_mut() {
            Some(session) => session.was_playing = false,
            None => self.stop_playback(),
        }
        self.emit(DeckEvent::Pause);
        true
    }

    /// Move to `seconds` (clamped to the track)
    pub fn seek(&mut self, seconds: f64) -> bool {
        if self.duration.is_none() || !seconds.is_finite() {
            return false;
        }
        if !self.guard.try_enter(self.clock.now(), false) {
            log::debug!("seek() dropped by guard");
            return false;
        }
        let target = self.clamp_to_track(seconds);
        self.jump_to(target);
        self.emit(DeckEvent::Seek { position: target });
        true
    }

    fn jump_to(&mut self, target: f64) {
        if let Some(session) = self.scratch.as_mut() {
            session.position = target;
            session.phase = ScratchPhase::Scratching;
            self.commands.send(RenderCommand::SetPosition { position_sec: target });
        } else if self.is_playing() {
            self.start_playback(target);
        } else {
            self.position = target;
        }
    }

    /// Change the playback speed; non-finite values are ignored
    pub fn set_playback_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            return;
        }
        let rate = rate.clamp(0.0, MAX_RATE);
        let now = self.clock.now();
        let duration = self.duration();
        if let Some(live) = self.live.as_mut() {
            live.rebase(now, duration, rate);
            self.commands.send(RenderCommand::SetPlaybackRate(rate));
        }
        self.playback_rate = rate;
        self.emit(DeckEvent::Rate { rate });
    }

    // ─────────────────────────────────────────────────────────────
    // Scratch
    // ─────────────────────────────────────────────────────────────

    /// Take over from playback with the scratch voice at `position_sec`
    ///
    /// `rate` is the initial scratch rate; 0 starts still and silent. A
    /// non-finite position starts at the current position.
    pub fn scratch_start(&mut self, position_sec: f64, rate: f64) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let position = if position_sec.is_finite() {
            self.clamp_to_track(position_sec)
        } else {
            self.position()
        };
        let was_playing = match &self.scratch {
            Some(session) => session.was_playing,
            None => self.is_playing(),
        };
        self.stop_playback();
        self.position = position;
        self.begin_session(position, rate, was_playing);
        log::debug!("Scratch start at {:.3}s (was playing: {})", position, was_playing);
        true
    }

    fn begin_session(&mut self, position: f64, rate: f64, was_playing: bool) -> u64 {
        self.scratch_sessions += 1;
        let id = self.scratch_sessions;
        self.commands.send(RenderCommand::StartScratch {
            session: id,
            position_sec: position,
            rate: clamp_rate(rate),
        });
        self.scratch = Some(ScratchSession {
            id,
            was_playing,
            position,
            phase: ScratchPhase::Scratching,
        });
        id
    }

    pub fn scratch_set_position(&mut self, seconds: f64) -> bool {
        if self.scratch.is_none() {
            return false;
        }
        let target = self.clamp_to_track(seconds);
        self.jump_to(target);
        true
    }

    pub fn scratch_set_rate(&mut self, rate: f64) -> bool {
        if self.scratch.is_none() {
            return false;
        }
        self.commands.send(RenderCommand::SetRate { rate: clamp_rate(rate) });
        true
    }

    pub fn scratch_set_hold(&mut self, hold: bool) -> bool {
        let Some(session) = self.scratch.as_mut() else {
            return false;
        };
        if hold {
            session.phase = ScratchPhase::Scratching;
        }
        self.commands.send(RenderCommand::SetHold(hold));
        true
    }

    /// Let the scratch voice coast with a decaying rate
    ///
    /// With `was_playing_before`, playback resumes (crossfaded over
    /// `accel_duration` when positive) once the fling ends, or earlier at the
    /// configured overlap rate. `resume_pos` is used if no rendered position
    /// is available. A rate too small to coast is treated as a plain release.
    pub fn scratch_fling(
        &mut self,
        rate: f64,
        tau: f64,
        was_playing_before: bool,
        accel_duration: f64,
        resume_pos: f64,
    ) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let resume_pos = self.clamp_to_track(resume_pos);
        let rate = clamp_rate(rate);
        if rate.abs() <= FLING_START_RATE {
            if was_playing_before {
                self.resume_at_position(resume_pos);
            } else {
                self.scratch_stop();
            }
            return false;
        }
        let tau = if tau > 0.0 && tau.is_finite() {
            tau
        } else {
            self.config.render.default_fling_tau
        };

        let now = self.clock.now();
        let overlap_at = match self.config.fling.overlap_rate {
            Some(overlap) if was_playing_before => Some(now + time_to_rate(rate, tau, overlap).unwrap_or(0.0)),
            _ => None,
        };
        let fade = (accel_duration.is_finite() && accel_duration > 0.0).then_some(accel_duration);

        self.stop_playback();
        let id = match self.scratch {
            Some(session) => session.id,
            None => self.begin_session(resume_pos, 0.0, was_playing_before),
        };
        self.scratch = Some(ScratchSession {
            id,
            was_playing: was_playing_before,
            position: resume_pos,
            phase: ScratchPhase::Flinging {
                resume: was_playing_before,
                fade,
                resume_pos,
                overlap_at,
            },
        });
        self.commands.send(RenderCommand::Fling { rate, tau });
        log::debug!("Fling: rate {:.3}, tau {:.3}s, resume {}", rate, tau, was_playing_before);
        self.emit(DeckEvent::FlingStart { rate, tau });
        true
    }

    /// End the scratch session without resuming
    pub fn scratch_stop(&mut self) -> bool {
        let Some(session) = self.scratch.take() else {
            return false;
        };
        self.position = self.clamp_to_track(self.live_scratch_position(&session, session.position));
        self.commands.send(RenderCommand::StopScratch);
        true
    }

    /// Finish a gesture: fling, resume or stop depending on the release
    pub fn scratch_release(&mut self, release: ReleaseSample) -> bool {
        let Some(session) = self.scratch else {
            return false;
        };
        let position = self.clamp_to_track(self.live_scratch_position(&session, release.position));
        let launch = self.fling_model.evaluate(&release);

        match release_outcome(session.was_playing, launch, position) {
            ReleaseOutcome::Stop => {
                self.scratch_stop();
            }
            ReleaseOutcome::Resume { position } => {
                self.resume_at_position(position);
            }
            ReleaseOutcome::Fling { launch, resume } => {
                let accel = self.config.fling.accel_duration;
                self.scratch_fling(launch.rate, launch.tau, resume, accel, position);
            }
        }
        true
    }

    /// Crossfade from the scratch voice back to playback at `position`
    pub fn resume_at_position(&mut self, position: f64) -> Option<ResumePlan> {
        self.resume_with_fade(position, None)
    }

    fn resume_with_fade(&mut self, position: f64, fade: Option<f64>) -> Option<ResumePlan> {
        self.duration?;
        let position = self.clamp_to_track(position);
        let now = self.clock.now();
        let now_frame = self.frame_at(now);
        let plan = self.scheduler.plan(now_frame, now, position, fade);

        self.generation += 1;
        self.commands.send(RenderCommand::ScratchGain(plan.fade_out));
        self.commands.send(RenderCommand::StartPlayback {
            generation: self.generation,
            position_sec: position,
            rate: self.playback_rate,
            start_frame: plan.start_frame(),
            fade_in: plan.fade_in,
        });
        self.live = Some(LiveClock {
            start_time: plan.start_time,
            offset: position,
            rate: self.playback_rate,
        });
        self.position = position;
        self.scratch = None;

        log::debug!(
            "Resume at {:.3}s, crossfade {:.3}s..{:.3}s",
            position,
            plan.start_time,
            plan.end_time
        );
        self.emit(DeckEvent::Resume { plan });
        Some(plan)
    }

    // ─────────────────────────────────────────────────────────────
    // Platter gestures
    // ─────────────────────────────────────────────────────────────

    /// Grab the platter (`angle` in degrees, `time` in seconds)
    pub fn platter_press(&mut self, angle: f64, time: f64) -> bool {
        let position = self.position();
        if !self.scratch_start(position, 0.0) {
            return false;
        }
        let duration = self.duration();
        self.gesture.press(angle, time, self.position, duration);
        true
    }

    /// Platter moved while held
    pub fn platter_move(&mut self, angle: f64, time: f64) -> bool {
        if self.scratch.is_none() {
            return false;
        }
        let Some(update) = self.gesture.update(angle, time) else {
            return false;
        };
        if update.hold_changed {
            self.commands.send(RenderCommand::SetHold(update.holding));
        }
        if !update.holding {
            self.commands.send(RenderCommand::SetRate { rate: update.rate });
        }
        if let Some(session) = self.scratch.as_mut() {
            session.position = update.position;
        }
        true
    }

    /// No pointer update arrived; drops a stale rate once the platter has
    /// been still for the configured stop time
    pub fn platter_idle(&mut self, time: f64) -> bool {
        if self.scratch.is_none() || !self.gesture.stalled(time) {
            return false;
        }
        self.commands.send(RenderCommand::SetRate { rate: 0.0 });
        true
    }

    /// Let go of the platter
    pub fn platter_release(&mut self, angle: f64, time: f64) -> bool {
        if !self.gesture.is_active() {
            return false;
        }
        let release = self.gesture.release(angle, time);
        log::debug!(
            "Platter release: smoothed {:.3}, {:.1} deg/s",
            release.smoothed_rate,
            release.release_deg_per_sec
        );
        self.scratch_release(release)
    }

    // ─────────────────────────────────────────────────────────────
    // Cues
    // ─────────────────────────────────────────────────────────────

    pub fn set_main_cue(&mut self, seconds: f64) -> bool {
        if self.duration.is_none() {
            return false;
        }
        self.cue.points.main = Some(self.clamp_to_track(seconds));
        true
    }

    pub fn set_temp_cue(&mut self, seconds: f64) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let position = self.clamp_to_track(seconds);
        self.cue.points.temp = Some(position);
        self.emit(DeckEvent::TempCueSet { position });
        true
    }

    /// Play from the temp cue until [`stop_temp_play`](Self::stop_temp_play)
    pub fn start_temp_play(&mut self) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let Some(position) = self.cue.points.temp else {
            return false;
        };
        if self.scratch.is_some() {
            self.scratch_stop();
        }
        self.cue.begin_temp();
        self.start_playback(position);
        true
    }

    /// Stop temporary playback and return to the temp cue
    pub fn stop_temp_play(&mut self) -> bool {
        if self.cue.state() != CueState::TempPlaying {
            return false;
        }
        let action = self.cue.finish_temp();
        self.stop_playback();
        if let CueAction::ReturnTo(position) = action {
            self.position = position;
        }
        self.emit(DeckEvent::TempCueStop { position: self.position });
        true
    }

    pub fn cue_press(&mut self) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let position = self.position();
        self.cue.press(position, self.clock.now());
        true
    }

    pub fn cue_release(&mut self) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let (now, playing, position) = (self.clock.now(), self.is_playing(), self.position());
        let action = self.cue.release(now, playing, position);
        self.apply_cue_action(action);
        true
    }

    fn apply_cue_action(&mut self, action: CueAction) {
        match action {
            CueAction::None => {}
            CueAction::SetMain(position) => {
                log::debug!("Main cue set to {:.3}s", position);
            }
            CueAction::JumpTo(position) => {
                self.position = position;
                self.emit(DeckEvent::Seek { position });
            }
            CueAction::StartTemp(position) => {
                self.emit(DeckEvent::TempCueSet { position });
                self.start_playback(position);
            }
            CueAction::ReturnTo(position) => {
                self.stop_playback();
                self.position = position;
                self.emit(DeckEvent::CueReturn { position });
            }
        }
    }

    /// Store hot cue `n` (1..=8)
    pub fn set_hot_cue(&mut self, n: usize, seconds: f64) -> bool {
        if self.duration.is_none() {
            return false;
        }
        let position = self.clamp_to_track(seconds);
        self.cue.points.set_hot(n, position)
    }

    /// Seek to hot cue `n` if it is set
    pub fn jump_hot_cue(&mut self, n: usize) -> bool {
        match self.cue.points.hot(n) {
            Some(position) => self.seek(position),
            None => false,
        }
    }

    pub fn clear_hot_cue(&mut self, n: usize) -> bool {
        self.cue.points.clear_hot(n).is_some()
    }

    // ─────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────

    /// Handle render events, fling overlap and cue deadlines
    pub fn poll(&mut self) {
        self.commands.flush();
        let now = self.clock.now();
        self.frame_at(now);
        while let Ok(event) = self.render_events.pop() {
            self.handle_render_event(event);
        }
        self.check_fling_overlap(now);
        let action = self.cue.poll(now);
        self.apply_cue_action(action);
    }

    fn handle_render_event(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::PlaybackEnded { generation } => {
                if generation != self.generation || self.live.is_none() {
                    log::debug!("Ignoring stale end of playback (generation {})", generation);
                    return;
                }
                self.live = None;
                self.position = self.duration();
                log::debug!("Playback reached the end of the track");
                self.emit(DeckEvent::Ended);
            }
            RenderEvent::FlingEnded { position_sec } => {
                let Some(ScratchSession {
                    phase: ScratchPhase::Flinging {
                        resume,
                        fade,
                        resume_pos,
                        ..
                    },
                    ..
                }) = self.scratch
                else {
                    return;
                };
                let position = if position_sec.is_finite() {
                    self.clamp_to_track(position_sec)
                } else {
                    resume_pos
                };
                self.emit(DeckEvent::FlingEnd { position });
                if resume {
                    self.resume_with_fade(position, fade);
                } else {
                    self.commands.send(RenderCommand::StopScratch);
                    self.scratch = None;
                    self.position = position;
                }
            }
        }
    }

    fn check_fling_overlap(&mut self, now: f64) {
        let Some(session) = self.scratch else {
            return;
        };
        let ScratchPhase::Flinging {
            resume: true,
            fade,
            resume_pos,
            overlap_at: Some(at),
        } = session.phase
        else {
            return;
        };
        if now < at {
            return;
        }
        let position = self.clamp_to_track(self.live_scratch_position(&session, resume_pos));
        self.emit(DeckEvent::FlingOverlapStart { position });
        self.resume_with_fade(position, fade);
    }
}
