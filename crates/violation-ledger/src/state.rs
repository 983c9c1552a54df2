//! Ledger escalation states

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Escalation state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerState {
    /// No violations yet
    #[default]
    Active,
    /// At least one strike, below the limit
    Warned,
    /// Limit reached. Absorbing.
    Terminated,
}

impl LedgerState {
    /// Whether `self -> next` is an allowed edge
    pub fn can_transition_to(self, next: LedgerState) -> bool {
        matches!(
            (self, next),
            (LedgerState::Active, LedgerState::Warned)
                | (LedgerState::Active, LedgerState::Terminated)
                | (LedgerState::Warned, LedgerState::Warned)
                | (LedgerState::Warned, LedgerState::Terminated)
        )
    }

    /// Validated transition
    pub fn transition(self, next: LedgerState) -> Result<LedgerState, LedgerError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LedgerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LedgerState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(
            LedgerState::Active.transition(LedgerState::Warned),
            Ok(LedgerState::Warned)
        );
        assert_eq!(
            LedgerState::Warned.transition(LedgerState::Terminated),
            Ok(LedgerState::Terminated)
        );
        // max_violations = 1 goes straight to termination
        assert!(LedgerState::Active.can_transition_to(LedgerState::Terminated));
    }

    #[test]
    fn test_terminated_is_absorbing() {
        for next in [LedgerState::Active, LedgerState::Warned, LedgerState::Terminated] {
            assert!(LedgerState::Terminated.transition(next).is_err());
        }
        assert!(LedgerState::Terminated.is_terminal());
    }

    #[test]
    fn test_no_going_back() {
        assert!(!LedgerState::Warned.can_transition_to(LedgerState::Active));
        assert!(!LedgerState::Active.can_transition_to(LedgerState::Active));
    }
}
