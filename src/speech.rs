//! Speech driver backed by an external text-to-speech command.
//!
//! Runs one utterance at a time by spawning a TTS program (`espeak` on
//! Linux, `say` on macOS) and polling the child until it exits.
//! Availability is probed once at construction; a missing program makes
//! the driver report the capability absent rather than fail per call.

use crate::driver::{SpeakOutcome, SpeechDriver};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(target_os = "macos")]
const DEFAULT_TTS_PROGRAM: &str = "say";
#[cfg(not(target_os = "macos"))]
const DEFAULT_TTS_PROGRAM: &str = "espeak";

/// `SpeechDriver` that shells out to a TTS program per utterance.
pub struct CommandSpeechDriver {
    program: String,
    available: bool,
    child: Mutex<Option<Child>>,
    cancelled: AtomicBool,
}

impl CommandSpeechDriver {
    /// Probe the platform default TTS program.
    pub fn new() -> Self {
        Self::with_program(DEFAULT_TTS_PROGRAM)
    }

    /// Probe a specific TTS program. The probe runs `--version` once; a
    /// program that cannot be launched leaves the driver unavailable.
    pub fn with_program(program: &str) -> Self {
        let available = Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok();

        if !available {
            eprintln!(
                "Speech engine '{}' not found; announcements will be skipped",
                program
            );
        }

        CommandSpeechDriver {
            program: program.to_string(),
            available,
            child: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    fn build_command(&self, text: &str, voice: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(voice) = voice {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg(text);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        cmd
    }
}

impl Default for CommandSpeechDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechDriver for CommandSpeechDriver {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, text: &str, voice: Option<&str>) -> SpeakOutcome {
        if !self.available {
            return SpeakOutcome::Completed;
        }

        self.cancelled.store(false, Ordering::SeqCst);

        // Spawn and store under one lock so cancel_all cannot land between
        // the two and miss the child; a cancel that raced ahead of the
        // spawn is honored right after storing.
        {
            let mut slot = self.child.lock().unwrap();
            let child = match self.build_command(text, voice).spawn() {
                Ok(child) => child,
                Err(e) => {
                    eprintln!("Failed to launch speech engine: {}", e);
                    return SpeakOutcome::Error;
                }
            };
            *slot = Some(child);
            if self.cancelled.load(Ordering::SeqCst) {
                if let Some(mut child) = slot.take() {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                return SpeakOutcome::Cancelled;
            }
        }

        // Poll the child so cancel_all can kill it from another thread.
        loop {
            std::thread::sleep(Duration::from_millis(50));

            let mut slot = self.child.lock().unwrap();
            let Some(child) = slot.as_mut() else {
                // cancel_all took and killed it
                return SpeakOutcome::Cancelled;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    *slot = None;
                    if self.cancelled.load(Ordering::SeqCst) {
                        return SpeakOutcome::Cancelled;
                    }
                    return if status.success() {
                        SpeakOutcome::Completed
                    } else {
                        SpeakOutcome::Error
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    eprintln!("Speech engine wait failed: {}", e);
                    *slot = None;
                    return SpeakOutcome::Error;
                }
            }
        }
    }

    fn cancel_all(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut slot = self.child.lock().unwrap();
        if let Some(mut child) = slot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
