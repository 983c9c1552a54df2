//! Read-only session snapshot

use chrono::{DateTime, Utc};
use event_guard::{GuardCounters, GuardFlags};
use serde::Serialize;
use violation_ledger::{LedgerState, Violation};

/// Which resources and timers are live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatus {
    pub camera: bool,
    pub microphone: bool,
    pub face_detection: bool,
    pub audio_monitoring: bool,
}

/// Window flags and per-kind counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardState {
    pub flags: GuardFlags,
    pub counters: GuardCounters,
    /// Current consecutive absent samples
    pub consecutive_no_face: u32,
    /// Current loud-audio streak (fractional because of decay)
    pub audio_streak: f32,
}

/// Diagnostics snapshot published after every state change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub attempt_id: String,
    pub is_active: bool,
    pub ledger_state: LedgerState,
    pub violation_count: u32,
    pub max_violations: u32,
    pub remaining_warnings: u32,
    pub violations: Vec<Violation>,
    pub last_violation_timestamp: Option<DateTime<Utc>>,
    /// Candidates suppressed by the cooldown gate
    pub dropped_candidates: u64,
    pub monitoring: MonitoringStatus,
    pub state: GuardState,
}
