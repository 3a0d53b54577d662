//! Scratch → playback handoff
//!
//! A resume starts a new playback voice a little in the future and fades it
//! in while the scratch voice fades out over exactly the same device frames,
//! so the handoff has neither a gap nor a doubled signal.

use crate::config::ResumeConfig;
use crate::engine::{FlingLaunch, GainRamp};

/// A scheduled crossfade from the scratch voice to playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePlan {
    /// Track position playback resumes from (seconds)
    pub position: f64,
    /// Control clock time the playback voice starts (seconds)
    pub start_time: f64,
    /// Control clock time both ramps finish (seconds)
    pub end_time: f64,
    /// Playback voice gain, 0 → 1
    pub fade_in: GainRamp,
    /// Scratch voice gain, 1 → 0
    pub fade_out: GainRamp,
}

impl ResumePlan {
    /// Device frame the playback voice starts
    pub fn start_frame(&self) -> u64 {
        self.fade_in.start_frame
    }
}

/// What a released gesture turns into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// Deck was stopped and no fling: end the scratch
    Stop,
    /// Deck was playing and no fling: crossfade back now
    Resume { position: f64 },
    /// Fling; if `resume`, crossfade back once it is over
    Fling { launch: FlingLaunch, resume: bool },
}

/// Decide how a release continues
pub fn release_outcome(was_playing: bool, fling: Option<FlingLaunch>, position: f64) -> ReleaseOutcome {
    match (fling, was_playing) {
        (Some(launch), resume) => ReleaseOutcome::Fling { launch, resume },
        (None, true) => ReleaseOutcome::Resume { position },
        (None, false) => ReleaseOutcome::Stop,
    }
}

/// Computes crossfade windows on the device frame grid
#[derive(Debug, Clone)]
pub struct ResumeScheduler {
    config: ResumeConfig,
    output_rate: f64,
}

impl ResumeScheduler {
    pub fn new(config: ResumeConfig, output_rate: u32) -> Self {
        Self {
            config,
            output_rate: output_rate.max(1) as f64,
        }
    }

    fn frames(&self, seconds: f64) -> u64 {
        if seconds.is_finite() && seconds > 0.0 {
            (seconds * self.output_rate).round() as u64
        } else {
            0
        }
    }

    /// Plan a resume at `position`, starting `preload_lead` after `now_frame`
    ///
    /// `now` is the control clock time matching `now_frame`. `crossfade`
    /// overrides the configured fade length when given.
    pub fn plan(&self, now_frame: u64, now: f64, position: f64, crossfade: Option<f64>) -> ResumePlan {
        let start = now_frame + self.frames(self.config.preload_lead);
        let end = start + self.frames(crossfade.unwrap_or(self.config.crossfade));

        ResumePlan {
            position,
            start_time: now + (start - now_frame) as f64 / self.output_rate,
            end_time: now + (end - now_frame) as f64 / self.output_rate,
            fade_in: GainRamp::new(start, end, 0.0, 1.0),
            fade_out: GainRamp::new(start, end, 1.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_windows_match() {
        let scheduler = ResumeScheduler::new(ResumeConfig::default(), 48000);
        let now = 96000; // 2.0s
        let plan = scheduler.plan(now, 2.0, 12.5, None);

        assert_eq!(plan.fade_in.start_frame, plan.fade_out.start_frame);
        assert_eq!(plan.fade_in.end_frame, plan.fade_out.end_frame);
        assert_eq!(plan.start_frame(), now + 768);
        assert_eq!(plan.fade_in.end_frame, now + 768 + 1920);
        assert!((plan.start_time - 2.016).abs() < 1e-9);
        assert!((plan.end_time - 2.056).abs() < 1e-9);
        assert_eq!(plan.fade_in.gain_at(plan.start_frame()), 0.0);
        assert_eq!(plan.fade_out.gain_at(plan.start_frame()), 1.0);
        assert_eq!(plan.position, 12.5);
    }

    #[test]
    fn test_plan_with_custom_fade() {
        let scheduler = ResumeScheduler::new(ResumeConfig::default(), 44100);
        let plan = scheduler.plan(0, 0.0, 1.0, Some(0.5));
        assert!((plan.end_time - plan.start_time - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_plan_times_follow_control_clock() {
        let scheduler = ResumeScheduler::new(ResumeConfig::default(), 48000);
        // Renderer at frame 480 while the control clock reads 7.0s
        let plan = scheduler.plan(480, 7.0, 1.0, None);
        assert_eq!(plan.start_frame(), 480 + 768);
        assert!((plan.start_time - 7.016).abs() < 1e-9);
        assert!((plan.end_time - 7.056).abs() < 1e-9);
    }

    #[test]
    fn test_release_outcomes() {
        let launch = FlingLaunch { rate: 1.2, tau: 0.45 };
        assert_eq!(release_outcome(false, None, 3.0), ReleaseOutcome::Stop);
        assert_eq!(release_outcome(true, None, 3.0), ReleaseOutcome::Resume { position: 3.0 });
        assert_eq!(
            release_outcome(true, Some(launch), 3.0),
            ReleaseOutcome::Fling { launch, resume: true }
        );
        assert_eq!(
            release_outcome(false, Some(launch), 3.0),
            ReleaseOutcome::Fling { launch, resume: false }
        );
    }
}
