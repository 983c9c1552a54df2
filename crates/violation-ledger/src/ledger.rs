//! Violation Ledger Implementation

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::state::LedgerState;
use crate::violation::{Candidate, Violation, ViolationKind};
use crate::LedgerError;

/// Termination reason reported to the host
pub const MAX_VIOLATIONS_REASON: &str = "Maximum violations reached";

/// Escalation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Recorded violations that terminate the session (default: 3)
    pub max_violations: u32,
    /// Minimum gap between two accepted violations, any kind (milliseconds)
    pub cooldown_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_violations: 3,
            cooldown_ms: 3000,
        }
    }
}

impl LedgerConfig {
    /// One strike
    pub fn strict() -> Self {
        Self {
            max_violations: 1,
            ..Default::default()
        }
    }

    pub fn lenient() -> Self {
        Self {
            max_violations: 5,
            cooldown_ms: 10_000,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_violations == 0 {
            return Err(LedgerError::Config("max_violations must be at least 1".into()));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Payload for a strike below the limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningNotice {
    pub violation: Violation,
    pub remaining_warnings: u32,
    pub total_violations: u32,
}

/// Payload for the strike that reached the limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationNotice {
    pub reason: String,
    pub violations: Vec<Violation>,
    pub total_violations: u32,
}

/// Result of submitting one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerDecision {
    /// Session inactive or already terminated; nothing recorded
    Ignored,
    /// Inside the cooldown window of the previous accepted violation
    Dropped {
        kind: ViolationKind,
        remaining_cooldown: Duration,
    },
    /// Recorded, session continues
    Warning(WarningNotice),
    /// Recorded, limit reached
    Termination {
        violation: Violation,
        notice: TerminationNotice,
    },
}

impl LedgerDecision {
    /// The accepted violation, if any
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            LedgerDecision::Warning(notice) => Some(&notice.violation),
            LedgerDecision::Termination { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Append-only violation log with cooldown and escalation
pub struct Ledger {
    config: LedgerConfig,
    session_id: String,
    attempt_id: String,
    state: LedgerState,
    active: bool,
    violations: Vec<Violation>,
    /// Monotonic time of the last accepted violation (cooldown clock)
    last_accepted: Option<Instant>,
    /// Wall-clock time of the last accepted violation
    last_violation_at: Option<DateTime<Utc>>,
    dropped: u64,
}

impl Ledger {
    /// Create an active ledger for one session
    pub fn new(config: LedgerConfig, session_id: &str, attempt_id: &str) -> Self {
        info!(
            "Ledger for {} (max {} violations, cooldown {}ms)",
            session_id, config.max_violations, config.cooldown_ms
        );
        Self {
            config,
            session_id: session_id.to_string(),
            attempt_id: attempt_id.to_string(),
            state: LedgerState::Active,
            active: true,
            violations: Vec::new(),
            last_accepted: None,
            last_violation_at: None,
            dropped: 0,
        }
    }

    /// Submit a candidate using the current monotonic time
    pub fn record(&mut self, candidate: Candidate) -> Result<LedgerDecision, LedgerError> {
        self.record_at(candidate, Instant::now())
    }

    /// Submit a candidate observed at `now`
    pub fn record_at(
        &mut self,
        candidate: Candidate,
        now: Instant,
    ) -> Result<LedgerDecision, LedgerError> {
        if !self.active || self.state.is_terminal() {
            debug!("Ledger closed, ignoring {}", candidate.kind);
            return Ok(LedgerDecision::Ignored);
        }

        // Cooldown gate, regardless of kind
        if let Some(last) = self.last_accepted {
            let elapsed = now.saturating_duration_since(last);
            let cooldown = self.config.cooldown();
            if elapsed < cooldown {
                self.dropped += 1;
                debug!(
                    "Violation {} suppressed: in cooldown ({}ms left)",
                    candidate.kind,
                    (cooldown - elapsed).as_millis()
                );
                return Ok(LedgerDecision::Dropped {
                    kind: candidate.kind,
                    remaining_cooldown: cooldown - elapsed,
                });
            }
        }

        let sequence = self.violations.len() as u32 + 1;
        let total = sequence;
        let next = if total >= self.config.max_violations {
            LedgerState::Terminated
        } else {
            LedgerState::Warned
        };
        self.state = self.state.transition(next)?;

        let mut metadata = candidate.metadata;
        metadata.insert("session_id".into(), Value::from(self.session_id.clone()));
        metadata.insert("attempt_id".into(), Value::from(self.attempt_id.clone()));
        let violation = Violation::new(candidate.kind, sequence, metadata);

        self.violations.push(violation.clone());
        self.last_accepted = Some(now);
        self.last_violation_at = Some(violation.timestamp);

        warn!(
            "Violation {}/{}: {}",
            total, self.config.max_violations, violation.kind
        );

        if next.is_terminal() {
            info!("Session {} terminated after {} violations", self.session_id, total);
            Ok(LedgerDecision::Termination {
                violation,
                notice: TerminationNotice {
                    reason: MAX_VIOLATIONS_REASON.to_string(),
                    violations: self.violations.clone(),
                    total_violations: total,
                },
            })
        } else {
            Ok(LedgerDecision::Warning(WarningNotice {
                violation,
                remaining_warnings: self.config.max_violations - total,
                total_violations: total,
            }))
        }
    }

    /// Stop accepting candidates (session cleanup)
    pub fn deactivate(&mut self) {
        if self.active {
            info!("Ledger for {} deactivated", self.session_id);
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    /// Ordered, append-only log
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn violation_count(&self) -> u32 {
        self.violations.len() as u32
    }

    pub fn max_violations(&self) -> u32 {
        self.config.max_violations
    }

    pub fn remaining_warnings(&self) -> u32 {
        self.config.max_violations.saturating_sub(self.violation_count())
    }

    pub fn last_violation_at(&self) -> Option<DateTime<Utc>> {
        self.last_violation_at
    }

    /// Candidates dropped by the cooldown gate
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger() -> Ledger {
        Ledger::new(LedgerConfig::default(), "coding-exam-a1-0", "a1")
    }

    fn tab_switch() -> Candidate {
        Candidate::new(ViolationKind::TabSwitch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_cooldown_records_once() {
        let mut ledger = ledger();

        assert!(matches!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Warning(_)));
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(matches!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Dropped { .. }));
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(matches!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Dropped { .. }));

        assert_eq!(ledger.violation_count(), 1);
        assert_eq!(ledger.state(), LedgerState::Warned);
        assert_eq!(ledger.dropped_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_violations_terminate_on_third() {
        let mut ledger = ledger();

        let first = ledger.record(tab_switch()).unwrap();
        match first {
            LedgerDecision::Warning(notice) => {
                assert_eq!(notice.remaining_warnings, 2);
                assert_eq!(notice.total_violations, 1);
                assert_eq!(notice.violation.sequence_number, 1);
            }
            other => panic!("expected warning, got {:?}", other),
        }

        tokio::time::advance(Duration::from_millis(4000)).await;
        assert!(matches!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Warning(_)));

        tokio::time::advance(Duration::from_millis(4000)).await;
        match ledger.record(tab_switch()).unwrap() {
            LedgerDecision::Termination { violation, notice } => {
                assert_eq!(notice.total_violations, 3);
                assert_eq!(notice.reason, MAX_VIOLATIONS_REASON);
                assert_eq!(notice.violations.len(), 3);
                assert_eq!(violation.sequence_number, 3);
            }
            other => panic!("expected termination, got {:?}", other),
        }
        assert_eq!(ledger.state(), LedgerState::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminated_ledger_ignores_everything() {
        let mut ledger = Ledger::new(LedgerConfig::strict(), "s", "a");
        assert!(matches!(
            ledger.record(tab_switch()).unwrap(),
            LedgerDecision::Termination { .. }
        ));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Ignored);
        assert_eq!(ledger.violation_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spans_kinds() {
        let mut ledger = ledger();
        ledger.record(tab_switch()).unwrap();
        tokio::time::advance(Duration::from_millis(2999)).await;

        let decision = ledger
            .record(Candidate::new(ViolationKind::NoFaceDetected))
            .unwrap();
        assert_eq!(
            decision,
            LedgerDecision::Dropped {
                kind: ViolationKind::NoFaceDetected,
                remaining_cooldown: Duration::from_millis(1),
            }
        );

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(ledger
            .record(Candidate::new(ViolationKind::NoFaceDetected))
            .unwrap()
            .violation()
            .is_some());
    }

    #[test]
    fn test_inactive_ledger_ignores() {
        let mut ledger = ledger();
        ledger.deactivate();
        assert_eq!(ledger.record(tab_switch()).unwrap(), LedgerDecision::Ignored);
        assert_eq!(ledger.state(), LedgerState::Active);
    }

    #[test]
    fn test_metadata_carries_session_ids() {
        let mut ledger = ledger();
        let decision = ledger.record(tab_switch().with("count", 1)).unwrap();
        let violation = decision.violation().unwrap();
        assert_eq!(violation.metadata["session_id"], "coding-exam-a1-0");
        assert_eq!(violation.metadata["attempt_id"], "a1");
        assert_eq!(violation.metadata["count"], 1);
    }

    #[test]
    fn test_zero_max_is_invalid() {
        let config = LedgerConfig {
            max_violations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(LedgerConfig::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_count_matches_accepted(gaps in proptest::collection::vec(0u64..8000, 1..40)) {
            let config = LedgerConfig { max_violations: 10, cooldown_ms: 3000 };
            let mut ledger = Ledger::new(config, "s", "a");
            let mut now = Instant::now();
            let mut accepted = 0u32;
            let mut previous_count = 0u32;

            for gap in gaps {
                now += Duration::from_millis(gap);
                let decision = ledger.record_at(tab_switch(), now).unwrap();
                if let Some(v) = decision.violation() {
                    accepted += 1;
                    prop_assert_eq!(v.sequence_number, accepted);
                }
                prop_assert!(ledger.violation_count() >= previous_count);
                prop_assert!(ledger.violation_count() <= ledger.max_violations());
                previous_count = ledger.violation_count();
            }
            prop_assert_eq!(ledger.violation_count(), accepted);
        }
    }
}
