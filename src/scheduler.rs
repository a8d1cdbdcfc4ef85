//! Playback scheduler — drives one playback session, segment by segment,
//! on a dedicated thread.
//!
//! `start()` takes a snapshot of the segment list and spawns the
//! `broadcast-runtime` thread; `stop()` flips the session flag and halts
//! both drivers unconditionally without waiting for in-flight work.
//! Segment transitions and termination are reported through an injected
//! event callback, fire-and-forget.

use crate::driver::{MusicDriver, SpeechDriver};
use crate::segment::Segment;
use crate::segment_player::{PlayerTiming, SegmentOutcome, SegmentPlayer};
use crate::session::Session;
use std::sync::{Arc, Mutex};

/// Events emitted by the session thread. Observer failures must never
/// affect playback, so callbacks get values, not references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A segment began executing. Emitted on every transition, including
    /// loop wrap-around.
    SegmentStarted {
        index: usize,
        segment_id: u32,
        kind: &'static str,
    },
    /// The sequence finished naturally with looping off.
    BroadcastEnded,
    /// Playback was cancelled by `stop()`.
    Stopped,
}

type EventSink = Arc<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Deliver one event, containing any observer panic. A misbehaving sink
/// must never unwind the session thread or wedge the active-session guard.
fn emit(on_event: &EventSink, event: PlaybackEvent) {
    let delivery = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| on_event(event)));
    if delivery.is_err() {
        eprintln!("Playback event observer panicked; playback continues");
    }
}

/// Owns the active playback session. At most one session is active at a
/// time; a second `start()` is rejected until the first stops or ends.
pub struct PlaybackScheduler {
    music: Arc<dyn MusicDriver>,
    speech: Arc<dyn SpeechDriver>,
    timing: PlayerTiming,
    on_event: EventSink,
    session: Mutex<Option<Session>>,
}

impl PlaybackScheduler {
    pub fn new<F>(music: Arc<dyn MusicDriver>, speech: Arc<dyn SpeechDriver>, on_event: F) -> Self
    where
        F: Fn(PlaybackEvent) + Send + Sync + 'static,
    {
        Self::with_timing(music, speech, PlayerTiming::default(), on_event)
    }

    pub fn with_timing<F>(
        music: Arc<dyn MusicDriver>,
        speech: Arc<dyn SpeechDriver>,
        timing: PlayerTiming,
        on_event: F,
    ) -> Self
    where
        F: Fn(PlaybackEvent) + Send + Sync + 'static,
    {
        PlaybackScheduler {
            music,
            speech,
            timing,
            on_event: Arc::new(on_event),
            session: Mutex::new(None),
        }
    }

    /// Begin playing `segments` in order. Rejects an empty list ("nothing
    /// to play") and rejects starting over an active session.
    pub fn start(&self, segments: Vec<Segment>, loop_enabled: bool) -> Result<(), String> {
        if segments.is_empty() {
            return Err("Nothing to play: the broadcast has no segments".to_string());
        }

        let mut slot = self.session.lock().unwrap();
        if slot.as_ref().is_some_and(|s| s.is_active()) {
            return Err("A broadcast is already playing; stop it first".to_string());
        }

        let session = Session::new();
        *slot = Some(session.clone());

        let music = self.music.clone();
        let speech = self.speech.clone();
        let timing = self.timing;
        let on_event = self.on_event.clone();

        let spawned = std::thread::Builder::new()
            .name("broadcast-runtime".into())
            .spawn(move || {
                run_session(segments, loop_enabled, session, music, speech, timing, on_event);
            });
        if let Err(e) = spawned {
            // Release the guard so a later start can try again
            if let Some(s) = slot.take() {
                s.deactivate();
            }
            return Err(format!("Failed to spawn broadcast-runtime thread: {}", e));
        }

        Ok(())
    }

    /// Halt playback immediately: deactivate the session, stop both
    /// drivers unconditionally, cancel any in-flight fade (the volume is
    /// left as last applied). Fire-and-forget — does not wait for the
    /// session thread to unwind. No-op when nothing is playing.
    pub fn stop(&self) {
        let slot = self.session.lock().unwrap();
        if let Some(session) = slot.as_ref() {
            if session.is_active() {
                session.deactivate();
                self.music.stop();
                self.speech.cancel_all();
            }
        }
    }

    /// Index of the segment currently executing, if a session is active.
    pub fn active_index(&self) -> Option<usize> {
        let slot = self.session.lock().unwrap();
        slot.as_ref().filter(|s| s.is_active()).map(|s| s.cursor())
    }

    /// True when the given segment index is the one currently playing.
    /// Used to highlight the active item in a displayed list.
    pub fn is_playing_index(&self, index: usize) -> bool {
        self.active_index() == Some(index)
    }
}

/// Session thread body: execute segments in order, advancing on natural
/// completion, wrapping when looping, tearing down on end or stop.
fn run_session(
    segments: Vec<Segment>,
    loop_enabled: bool,
    session: Session,
    music: Arc<dyn MusicDriver>,
    speech: Arc<dyn SpeechDriver>,
    timing: PlayerTiming,
    on_event: EventSink,
) {
    let player = SegmentPlayer::with_timing(music.clone(), speech.clone(), timing);
    let mut cursor = 0usize;

    loop {
        if !session.is_active() {
            emit(&on_event, PlaybackEvent::Stopped);
            return;
        }

        let segment = &segments[cursor];
        session.set_cursor(cursor);
        emit(
            &on_event,
            PlaybackEvent::SegmentStarted {
                index: cursor,
                segment_id: segment.id,
                kind: segment.kind.name(),
            },
        );

        match player.play(segment, &session) {
            SegmentOutcome::Cancelled => {
                emit(&on_event, PlaybackEvent::Stopped);
                return;
            }
            SegmentOutcome::Completed => {
                // Stop may land between natural completion and the
                // advance; it wins, and nothing further is scheduled.
                if !session.is_active() {
                    emit(&on_event, PlaybackEvent::Stopped);
                    return;
                }
                cursor += 1;
                if cursor >= segments.len() {
                    if loop_enabled {
                        cursor = 0;
                    } else {
                        // Natural end: same driver teardown as stop, but
                        // reported as Ended, not Stopped.
                        session.deactivate();
                        music.stop();
                        speech.cancel_all();
                        emit(&on_event, PlaybackEvent::BroadcastEnded);
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{NullMusicDriver, NullSpeechDriver};
    use crate::segment::{SegmentKind, VolumeDipConfig};
    use std::time::Duration;

    fn dip_segment(id: u32, position: u32) -> Segment {
        Segment {
            id,
            position,
            kind: SegmentKind::VolumeDip(VolumeDipConfig {
                volume: 30.0,
                duration: 0.5,
            }),
        }
    }

    fn scheduler() -> PlaybackScheduler {
        PlaybackScheduler::new(
            Arc::new(NullMusicDriver),
            Arc::new(NullSpeechDriver),
            |_| {},
        )
    }

    #[test]
    fn start_with_empty_list_is_rejected() {
        let sched = scheduler();
        let result = sched.start(Vec::new(), false);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Nothing to play"));
        assert!(sched.active_index().is_none());
    }

    #[test]
    fn second_start_while_active_is_rejected() {
        let sched = scheduler();
        // Looping over instant segments keeps the session active.
        sched
            .start(vec![dip_segment(1, 0), dip_segment(2, 1)], true)
            .unwrap();
        let second = sched.start(vec![dip_segment(3, 0)], false);
        assert!(second.is_err());
        sched.stop();
    }

    #[test]
    fn stop_without_session_is_a_noop() {
        let sched = scheduler();
        sched.stop();
        sched.stop();
        assert!(sched.active_index().is_none());
    }

    #[test]
    fn start_allowed_again_after_natural_end() {
        let sched = scheduler();
        sched.start(vec![dip_segment(1, 0)], false).unwrap();
        // Null music driver: the dip advances immediately and the session
        // ends on its own.
        std::thread::sleep(Duration::from_millis(200));
        assert!(sched.active_index().is_none());
        assert!(sched.start(vec![dip_segment(2, 0)], false).is_ok());
    }

    #[test]
    fn panicking_observer_does_not_wedge_the_session() {
        let sched = PlaybackScheduler::new(
            Arc::new(NullMusicDriver),
            Arc::new(NullSpeechDriver),
            |_| panic!("observer failure"),
        );
        sched.start(vec![dip_segment(1, 0)], false).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        // The session ended despite the sink panicking on every event
        assert!(sched.active_index().is_none());
        assert!(sched.start(vec![dip_segment(2, 0)], false).is_ok());
        std::thread::sleep(Duration::from_millis(200));
        assert!(sched.active_index().is_none());
    }

    #[test]
    fn is_playing_index_tracks_active_cursor() {
        let sched = scheduler();
        assert!(!sched.is_playing_index(0));
        sched
            .start(vec![dip_segment(1, 0), dip_segment(2, 1)], true)
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(sched.active_index().is_some());
        sched.stop();
    }
}
