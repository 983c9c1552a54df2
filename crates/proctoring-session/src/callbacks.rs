//! Host callback contract

use violation_ledger::{TerminationNotice, Violation, WarningNotice};

/// Hooks the exam page registers on a session.
///
/// Every method defaults to a no-op so hosts implement only what they render.
/// Invoked from the session's consumer task; implementations must not block.
pub trait SessionCallbacks: Send + Sync {
    /// Every ledger-accepted violation
    fn on_violation(&self, _violation: &Violation) {}

    /// Accepted violation below the limit
    fn on_warning(&self, _notice: &WarningNotice) {}

    /// Limit reached. Fires exactly once per session.
    fn on_termination(&self, _notice: &TerminationNotice) {}

    fn on_presence_detected(&self) {}

    /// Absent sample; `consecutive` is the current streak
    fn on_presence_missing(&self, _consecutive: u32) {}

    /// Every successful audio tick, normalized to [0, 1]
    fn on_audio_level(&self, _level: f32) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl SessionCallbacks for NoopCallbacks {}
