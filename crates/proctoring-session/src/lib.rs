//! Proctoring Session
//!
//! Orchestrates one exam attempt's integrity monitoring:
//! - Exclusive ownership of camera, microphone and fullscreen
//! - Presence and audio detector tasks on independent timers
//! - Browser signals routed through the event guard
//! - One consumer task owning the ledger and firing host callbacks
//! - Idempotent, scoped teardown

mod callbacks;
pub mod host;
mod session;
mod settings;
mod status;

pub use callbacks::{NoopCallbacks, SessionCallbacks};
pub use host::{ExamHost, SignalSink};
pub use session::{ProctoringSession, SessionHandle};
pub use settings::ProctoringConfig;
pub use status::{GuardState, MonitoringStatus, SessionStatus};

use media_capture::MediaKind;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Camera or microphone could not be acquired. Fatal to the session.
    #[error("Media access error ({device}): {reason}")]
    MediaAccessError { device: MediaKind, reason: String },

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio monitor error: {0}")]
    Audio(#[from] audio_monitor::AudioError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] violation_ledger::LedgerError),
}

