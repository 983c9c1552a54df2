//! Event guard configuration

use serde::{Deserialize, Serialize};

/// Event guard policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Pastes longer than this are blocked, even inside the editor
    pub paste_limit_chars: usize,

    /// Delay before re-requesting fullscreen after an exit (milliseconds)
    pub fullscreen_retry_delay_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            paste_limit_chars: 100,
            fullscreen_retry_delay_ms: 1000,
        }
    }
}
