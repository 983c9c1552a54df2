//! Outbound report payloads
//!
//! Bodies for the host page's calls to the exam backend. The proctoring
//! core builds them but never sends them.

use serde::{Deserialize, Serialize};

use crate::ledger::TerminationNotice;
use crate::violation::Violation;

/// `POST {base}/attempts/{id}/violations`
pub fn violations_path(attempt_id: &str) -> String {
    format!("/attempts/{}/violations", attempt_id)
}

/// `POST {base}/attempts/{id}/terminate`
pub fn terminate_path(attempt_id: &str) -> String {
    format!("/attempts/{}/terminate", attempt_id)
}

/// Body reporting one recorded violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    pub attempt_id: String,
    pub session_id: String,
    pub violation: Violation,
}

/// Body reporting session termination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationReport {
    pub attempt_id: String,
    pub session_id: String,
    pub reason: String,
    pub violations: Vec<Violation>,
    pub total_violations: u32,
}

impl TerminationReport {
    pub fn from_notice(attempt_id: &str, session_id: &str, notice: &TerminationNotice) -> Self {
        Self {
            attempt_id: attempt_id.to_string(),
            session_id: session_id.to_string(),
            reason: notice.reason.clone(),
            violations: notice.violations.clone(),
            total_violations: notice.total_violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Candidate, Ledger, LedgerConfig, LedgerDecision, ViolationKind};

    #[test]
    fn test_paths() {
        assert_eq!(violations_path("42"), "/attempts/42/violations");
        assert_eq!(terminate_path("42"), "/attempts/42/terminate");
    }

    #[test]
    fn test_termination_report_json() {
        let mut ledger = Ledger::new(LedgerConfig::strict(), "s-1", "42");
        let decision = ledger
            .record(Candidate::new(ViolationKind::PageUnloadAttempt))
            .unwrap();
        let LedgerDecision::Termination { notice, .. } = decision else {
            panic!("strict ledger terminates on first violation");
        };

        let report = TerminationReport::from_notice("42", "s-1", &notice);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalViolations"], 1);
        assert_eq!(json["reason"], "Maximum violations reached");
        assert_eq!(json["violations"][0]["kind"], "page_unload_attempt");
    }
}
