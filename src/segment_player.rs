//! Per-kind segment execution.
//!
//! A `SegmentPlayer` runs exactly one segment to its natural end or to
//! cancellation. Natural completion is reported as `Completed` and the
//! caller advances; `Cancelled` means the session was stopped mid-segment
//! and nothing further may be scheduled. Every path through this module
//! terminates in one of the two — a bad segment never stalls the broadcast.

use crate::driver::{MusicDriver, SpeakOutcome, SpeechDriver};
use crate::fade::{FadeController, FadeOutcome};
use crate::segment::{
    self, AnnouncementConfig, Segment, SegmentKind, TrackConfig, VolumeDipConfig,
};
use crate::session::Session;
use std::sync::Arc;
use std::time::Duration;

/// How one segment's execution terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Natural end (or a degraded/error path treated as one). Advance.
    Completed,
    /// The session went inactive. Do not advance.
    Cancelled,
}

/// Timing knobs for segment execution. Defaults match live playback;
/// tests shrink them to keep suites fast.
#[derive(Debug, Clone, Copy)]
pub struct PlayerTiming {
    /// Interval between playback progress checks.
    pub poll_interval: Duration,
    /// Length of the fixed duck/dip volume transition.
    pub duck_transition: Duration,
}

impl Default for PlayerTiming {
    fn default() -> Self {
        PlayerTiming {
            poll_interval: Duration::from_millis(100),
            duck_transition: Duration::from_millis(500),
        }
    }
}

/// Executes one segment at a time against the shared drivers.
pub struct SegmentPlayer {
    music: Arc<dyn MusicDriver>,
    speech: Arc<dyn SpeechDriver>,
    fader: FadeController,
    timing: PlayerTiming,
}

impl SegmentPlayer {
    pub fn new(music: Arc<dyn MusicDriver>, speech: Arc<dyn SpeechDriver>) -> Self {
        Self::with_timing(music, speech, PlayerTiming::default())
    }

    pub fn with_timing(
        music: Arc<dyn MusicDriver>,
        speech: Arc<dyn SpeechDriver>,
        timing: PlayerTiming,
    ) -> Self {
        SegmentPlayer {
            music,
            speech,
            fader: FadeController::new(),
            timing,
        }
    }

    /// Run one segment to completion or cancellation.
    pub fn play(&self, segment: &Segment, session: &Session) -> SegmentOutcome {
        if !session.is_active() {
            return SegmentOutcome::Cancelled;
        }
        match &segment.kind {
            SegmentKind::Track(config) => self.play_track(config, session),
            SegmentKind::Announcement(config) => self.play_announcement(config, session),
            SegmentKind::VolumeDip(config) => self.play_volume_dip(config, session),
        }
    }

    // ── Track ────────────────────────────────────────────────────────────

    fn play_track(&self, config: &TrackConfig, session: &Session) -> SegmentOutcome {
        // Unresolvable source: skip the load entirely and advance rather
        // than stall the broadcast.
        let Some(source_id) = segment::extract_source_id(&config.source) else {
            return SegmentOutcome::Completed;
        };

        let start = Duration::from_secs_f32(config.start_offset.max(0.0));
        let end_offset = if config.end_offset > 0.0 {
            Some(Duration::from_secs_f32(config.end_offset))
        } else {
            None
        };
        self.music.load_and_play(&source_id, start, end_offset);

        if config.fade_in > 0.0 {
            self.music.set_volume(0.0);
            let fade_in = Duration::from_secs_f32(config.fade_in);
            if self.fade(0.0, 100.0, fade_in, session) == FadeOutcome::Cancelled {
                return SegmentOutcome::Cancelled;
            }
        } else {
            self.music.set_volume(100.0);
        }

        let fade_out = Duration::from_secs_f32(config.fade_out.max(0.0));

        loop {
            if !session.is_active() {
                return SegmentOutcome::Cancelled;
            }
            if self.music.is_ended() {
                return SegmentOutcome::Completed;
            }

            let current = self.music.current_time();
            // Effective end: the configured offset, else the driver-reported
            // duration once it is known.
            let end_at = end_offset.or_else(|| {
                let d = self.music.duration();
                if d.is_zero() { None } else { Some(d) }
            });

            if let Some(end_at) = end_at {
                if current >= end_at {
                    return SegmentOutcome::Completed;
                }
                if !fade_out.is_zero() && current + fade_out >= end_at {
                    // One fade-out per segment: the ramp blocks until done
                    // and the segment ends with it, so the trigger cannot
                    // re-fire on a later poll tick.
                    return match self.fade(100.0, 0.0, fade_out, session) {
                        FadeOutcome::Completed => SegmentOutcome::Completed,
                        FadeOutcome::Cancelled => SegmentOutcome::Cancelled,
                    };
                }
            }

            if !session.wait(self.timing.poll_interval) {
                return SegmentOutcome::Cancelled;
            }
        }
    }

    // ── Announcement ─────────────────────────────────────────────────────

    fn play_announcement(
        &self,
        config: &AnnouncementConfig,
        session: &Session,
    ) -> SegmentOutcome {
        // Missing speech capability is a defined degraded mode, not an
        // error: the broadcast moves on with no audible effect.
        if !self.speech.is_available() {
            return SegmentOutcome::Completed;
        }

        let restore = if config.duck_music && self.music.is_playing() {
            let captured = self.music.volume();
            let target = config.duck_volume.clamp(0.0, 100.0);
            if self.fade(captured, target, self.timing.duck_transition, session)
                == FadeOutcome::Cancelled
            {
                return SegmentOutcome::Cancelled;
            }
            Some((captured, target))
        } else {
            None
        };

        let outcome = self
            .speech
            .speak(&config.text, config.voice.as_deref());
        if outcome == SpeakOutcome::Cancelled || !session.is_active() {
            return SegmentOutcome::Cancelled;
        }
        // A speech-engine error is terminal for sequencing: treat as spoken.

        if let Some((captured, target)) = restore {
            if self.music.is_playing()
                && self.fade(target, captured, self.timing.duck_transition, session)
                    == FadeOutcome::Cancelled
            {
                return SegmentOutcome::Cancelled;
            }
        }

        SegmentOutcome::Completed
    }

    // ── Volume dip ───────────────────────────────────────────────────────

    fn play_volume_dip(&self, config: &VolumeDipConfig, session: &Session) -> SegmentOutcome {
        if !self.music.is_playing() {
            return SegmentOutcome::Completed;
        }

        let captured = self.music.volume();
        let target = config.volume.clamp(0.0, 100.0);

        if self.fade(captured, target, self.timing.duck_transition, session)
            == FadeOutcome::Cancelled
        {
            return SegmentOutcome::Cancelled;
        }

        let hold = Duration::from_secs_f32(config.duration.max(0.0));
        if !session.wait(hold) {
            return SegmentOutcome::Cancelled;
        }

        if self.fade(target, captured, self.timing.duck_transition, session)
            == FadeOutcome::Cancelled
        {
            return SegmentOutcome::Cancelled;
        }

        SegmentOutcome::Completed
    }

    fn fade(&self, from: f32, to: f32, duration: Duration, session: &Session) -> FadeOutcome {
        self.fader.run(self.music.as_ref(), from, to, duration, session)
    }
}
