//! Capability driver interfaces the scheduler depends on.
//!
//! The engine talks to exactly two playback primitives: a time-seekable
//! music driver and a one-utterance-at-a-time speech driver. Both are
//! process-wide singletons shared as `Arc<dyn ...>`. Implementations must
//! tolerate being asked to operate before a source is loaded (no-op, not
//! an error), and an absent capability is reported, never thrown.

use std::time::Duration;

/// Time-seekable media engine playing one clip at a time.
///
/// Volumes use the 0-100 domain scale. All operations are no-ops until a
/// source is loaded.
pub trait MusicDriver: Send + Sync {
    /// Load the clip for `source_id` and start playing at `start_offset`.
    /// `end_offset` of None means play to the natural end. A source that
    /// cannot be resolved leaves the driver in the ended state.
    fn load_and_play(&self, source_id: &str, start_offset: Duration, end_offset: Option<Duration>);

    /// Set playback volume, clamped to 0-100.
    fn set_volume(&self, volume: f32);

    /// Current playback volume (0-100).
    fn volume(&self) -> f32;

    /// Elapsed clip time.
    fn current_time(&self) -> Duration;

    /// Total clip duration. Zero when unknown.
    fn duration(&self) -> Duration;

    /// True once the clip has played out or failed.
    fn is_ended(&self) -> bool;

    /// True while a clip is audibly playing.
    fn is_playing(&self) -> bool;

    /// Halt playback unconditionally.
    fn stop(&self);
}

/// Terminal result of one utterance. Errors are terminal for sequencing —
/// the broadcast advances past them the same as completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    Completed,
    Error,
    Cancelled,
}

/// Text-to-speech engine speaking one utterance at a time.
pub trait SpeechDriver: Send + Sync {
    /// True when a backing speech engine exists. When false, `speak` is a
    /// no-op and segments relying on speech advance immediately.
    fn is_available(&self) -> bool;

    /// Speak `text` to completion, error, or cancellation. Blocks the
    /// calling thread; `cancel_all` from another thread unblocks it.
    fn speak(&self, text: &str, voice: Option<&str>) -> SpeakOutcome;

    /// Cancel any in-flight utterance unconditionally.
    fn cancel_all(&self);
}

/// Music driver with no backing engine. Reports nothing playing; every
/// operation is a no-op.
pub struct NullMusicDriver;

impl MusicDriver for NullMusicDriver {
    fn load_and_play(&self, _source_id: &str, _start: Duration, _end: Option<Duration>) {}
    fn set_volume(&self, _volume: f32) {}
    fn volume(&self) -> f32 {
        100.0
    }
    fn current_time(&self) -> Duration {
        Duration::ZERO
    }
    fn duration(&self) -> Duration {
        Duration::ZERO
    }
    fn is_ended(&self) -> bool {
        true
    }
    fn is_playing(&self) -> bool {
        false
    }
    fn stop(&self) {}
}

/// Speech driver with no backing engine: reports the capability absent.
pub struct NullSpeechDriver;

impl SpeechDriver for NullSpeechDriver {
    fn is_available(&self) -> bool {
        false
    }
    fn speak(&self, _text: &str, _voice: Option<&str>) -> SpeakOutcome {
        SpeakOutcome::Completed
    }
    fn cancel_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_music_reports_ended_and_not_playing() {
        let driver = NullMusicDriver;
        assert!(driver.is_ended());
        assert!(!driver.is_playing());
        assert_eq!(driver.duration(), Duration::ZERO);
        // Operating before load must not panic
        driver.set_volume(50.0);
        driver.stop();
        driver.load_and_play("abc", Duration::ZERO, None);
    }

    #[test]
    fn null_speech_is_absent_but_never_throws() {
        let driver = NullSpeechDriver;
        assert!(!driver.is_available());
        assert_eq!(driver.speak("hello", None), SpeakOutcome::Completed);
        driver.cancel_all();
    }

    #[test]
    fn drivers_are_object_safe() {
        use std::sync::Arc;
        let _music: Arc<dyn MusicDriver> = Arc::new(NullMusicDriver);
        let _speech: Arc<dyn SpeechDriver> = Arc::new(NullSpeechDriver);
    }
}
