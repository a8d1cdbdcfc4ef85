//! Linear volume fades, cancellable at every step.

use crate::driver::MusicDriver;
use crate::session::Session;
use std::time::Duration;

/// Number of discrete steps a ramp is divided into.
const DEFAULT_STEPS: u32 = 20;

/// How a fade ramp terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The ramp ran to the end and the target value was applied.
    Completed,
    /// The session went inactive mid-ramp. The last applied volume is left
    /// as-is — no snap to the target.
    Cancelled,
}

/// Runs linear volume ramps against the music driver.
///
/// Ramps execute inline on the session thread, so at most one is in flight
/// at a time; cancellation rides the session's active flag.
pub struct FadeController {
    steps: u32,
}

impl FadeController {
    pub fn new() -> Self {
        FadeController {
            steps: DEFAULT_STEPS,
        }
    }

    /// Ramp the volume from `from` to `to` over `duration`, in `steps`
    /// evenly spaced increments. Applied values are clamped to [0, 100]
    /// and the final step snaps exactly to the target to avoid
    /// floating-point drift. A zero duration applies the target
    /// immediately with no intermediate steps.
    pub fn run(
        &self,
        music: &dyn MusicDriver,
        from: f32,
        to: f32,
        duration: Duration,
        session: &Session,
    ) -> FadeOutcome {
        if !session.is_active() {
            return FadeOutcome::Cancelled;
        }

        if duration.is_zero() {
            music.set_volume(to.clamp(0.0, 100.0));
            return FadeOutcome::Completed;
        }

        let delta = (to - from) / self.steps as f32;
        let step_duration = duration / self.steps;

        for step in 1..=self.steps {
            std::thread::sleep(step_duration);
            if !session.is_active() {
                return FadeOutcome::Cancelled;
            }
            let volume = if step == self.steps {
                to
            } else {
                from + delta * step as f32
            };
            music.set_volume(volume.clamp(0.0, 100.0));
        }

        FadeOutcome::Completed
    }
}

impl Default for FadeController {
    fn default() -> Self {
        Self::new()
    }
}
