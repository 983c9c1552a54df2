//! Violation Ledger
//!
//! Single source of truth for a session's strikes: cooldown gating,
//! sequence numbering, and the Active -> Warned -> Terminated escalation.

mod ledger;
pub mod report;
mod state;
mod violation;

pub use ledger::{Ledger, LedgerConfig, LedgerDecision, TerminationNotice, WarningNotice};
pub use state::LedgerState;
pub use violation::{Candidate, Metadata, Violation, ViolationKind};

use thiserror::Error;

/// Ledger error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid ledger transition {from:?} -> {to:?}")]
    InvalidTransition { from: LedgerState, to: LedgerState },

    #[error("Configuration error: {0}")]
    Config(String),
}
