//! Playback session state shared between the session thread and callers.
//!
//! A `Session` is created by the scheduler on `start()` and deactivated on
//! `stop()` or natural end. The active flag is the single cooperative
//! cancellation token for the whole pipeline: every suspend point (fade
//! step, progress poll, timed hold, speech wait) re-checks it before
//! taking further action.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cloneable handle to one playback session's runtime state.
#[derive(Clone)]
pub struct Session {
    active: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            active: Arc::new(AtomicBool::new(true)),
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True while the session has not been stopped or ended.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flip the session inactive. Safe to call from any thread, any number
    /// of times.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Index of the segment currently executing.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn set_cursor(&self, index: usize) {
        self.cursor.store(index, Ordering::SeqCst);
    }

    /// Sleep in short slices, re-checking the active flag between slices.
    /// Returns false if the session went inactive before the wait elapsed.
    pub fn wait(&self, duration: std::time::Duration) -> bool {
        const SLICE: std::time::Duration = std::time::Duration::from_millis(50);
        let deadline = std::time::Instant::now() + duration;
        loop {
            if !self.is_active() {
                return false;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                // Re-check on completion: a stop issued during the final
                // slice must still win.
                return self.is_active();
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
