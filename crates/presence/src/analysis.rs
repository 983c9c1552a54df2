//! Presence analysis results

use serde::{Deserialize, Serialize};

/// Raw measurements taken from one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// Fraction of sampled pixels matching the skin-tone rule
    pub skin_tone_ratio: f32,

    /// Fraction of sampled pixels that are near-white
    pub bright_ratio: f32,

    /// Fraction of sampled pixels that are near-black
    pub dark_ratio: f32,

    /// Sample points with a strong neighbour brightness change
    pub edge_pixels: u32,

    /// Pixels visited in the skin/exposure region
    pub sampled_pixels: u32,
}

/// The four votes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConditions {
    pub has_skin_tone: bool,
    pub not_overexposed: bool,
    pub not_underexposed: bool,
    pub has_features: bool,
}

impl PresenceConditions {
    /// Number of conditions that hold
    pub fn passed(&self) -> u32 {
        [
            self.has_skin_tone,
            self.not_overexposed,
            self.not_underexposed,
            self.has_features,
        ]
        .iter()
        .filter(|&&c| c)
        .count() as u32
    }
}

/// Classifier output for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceVerdict {
    /// Subject judged present
    pub present: bool,
    pub metrics: FrameMetrics,
    pub conditions: PresenceConditions,
}
