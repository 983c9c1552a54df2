//! Violation records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind-specific key/value payload
pub type Metadata = serde_json::Map<String, Value>;

/// Integrity violation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Document hidden
    TabSwitch,
    /// Window lost focus
    WindowBlur,
    /// Left fullscreen
    FullscreenExit,
    /// Reserved key combination pressed
    BlockedKeyAttempt,
    ContextMenuAttempt,
    /// Back/forward navigation
    NavigationAttempt,
    /// Tried to close or reload the page
    PageUnloadAttempt,
    /// Nobody in front of the camera for too long
    NoFaceDetected,
    /// Sustained elevated loudness
    SuspiciousAudioDetected,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::WindowBlur => "window_blur",
            ViolationKind::FullscreenExit => "fullscreen_exit",
            ViolationKind::BlockedKeyAttempt => "blocked_key_attempt",
            ViolationKind::ContextMenuAttempt => "context_menu_attempt",
            ViolationKind::NavigationAttempt => "navigation_attempt",
            ViolationKind::PageUnloadAttempt => "page_unload_attempt",
            ViolationKind::NoFaceDetected => "no_face_detected",
            ViolationKind::SuspiciousAudioDetected => "suspicious_audio_detected",
        }
    }

    /// Human-readable description shown alongside warnings
    pub fn description(&self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "Switched to another tab or window",
            ViolationKind::WindowBlur => "Exam window lost focus",
            ViolationKind::FullscreenExit => "Exited fullscreen mode",
            ViolationKind::BlockedKeyAttempt => "Attempted to use blocked keyboard shortcut",
            ViolationKind::ContextMenuAttempt => "Attempted to open context menu",
            ViolationKind::NavigationAttempt => "Attempted to navigate away from exam",
            ViolationKind::PageUnloadAttempt => "Attempted to leave exam page",
            ViolationKind::NoFaceDetected => {
                "Face not detected in camera view for extended period"
            }
            ViolationKind::SuspiciousAudioDetected => {
                "Suspicious audio/speech detected during exam"
            }
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detector's raw signal before cooldown and escalation
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: ViolationKind,
    pub metadata: Metadata,
}

impl Candidate {
    pub fn new(kind: ViolationKind) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("description".into(), Value::from(kind.description()));
        Self { kind, metadata }
    }

    /// Attach one metadata entry
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Ledger-accepted violation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: Uuid,
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    /// 1-based position in the session log
    pub sequence_number: u32,
    pub metadata: Metadata,
}

impl Violation {
    pub(crate) fn new(kind: ViolationKind, sequence_number: u32, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            sequence_number,
            metadata,
        }
    }
}
