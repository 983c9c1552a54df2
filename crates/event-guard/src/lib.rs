//! Event Guard
//!
//! Translates browser/OS interaction signals into:
//! - Recorded candidates (tab switch, blur, fullscreen exit, shortcuts,
//!   context menu, navigation, unload)
//! - Silent blocks (clipboard and drag/drop outside the code editor,
//!   oversized pastes anywhere) that never reach the ledger
//!
//! The blocking verdict is a pure function so the host can apply it
//! synchronously; counting and candidate creation live in [`EventGuard`].

mod config;
mod guard;
mod policy;
mod signal;

pub use config::GuardConfig;
pub use guard::{BlockedAction, EventGuard, GuardCounters, GuardFlags, GuardOutcome};
pub use policy::{is_blocked_key, is_tracked, verdict, Verdict, UNLOAD_PROMPT};
pub use signal::{BrowserSignal, KeyPress, Target};

use thiserror::Error;

/// Guard error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("Empty key combination")]
    EmptyKey,

    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),
}
