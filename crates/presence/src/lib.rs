//! Presence Detection
//!
//! Lightweight, camera-free heuristics for "is someone in front of the screen":
//! - Skin-tone ratio over a central square
//! - Over/under-exposure ratios
//! - Coarse edge density as a proxy for facial features
//! - Majority vote over the four conditions
//! - Consecutive-absence tracking with a violation threshold

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod state;

pub use analysis::{FrameMetrics, PresenceConditions, PresenceVerdict};
pub use classifier::classify;
pub use config::PresenceConfig;
pub use state::{AbsenceStep, AbsenceTracker};

use thiserror::Error;

/// Presence error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresenceError {
    #[error("Malformed frame: {width}x{height} with {len} bytes")]
    MalformedFrame { width: u32, height: u32, len: usize },

    #[error("Sample region is empty")]
    EmptyRegion,
}
