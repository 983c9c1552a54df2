//! Presence configuration

use serde::{Deserialize, Serialize};

/// Presence sampling and classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Sampling period (milliseconds)
    pub interval_ms: u64,

    /// Consecutive absent samples before a violation
    pub max_no_face_count: u32,

    /// Upper bound on a single frame grab (milliseconds)
    pub sample_timeout_ms: u64,

    /// Skin/exposure region is min(width, height) / this
    pub region_divisor: u32,

    /// Pixel stride inside the skin/exposure region
    pub sample_stride: u32,

    /// Edge region is min(width, height) / this
    pub edge_region_divisor: u32,

    /// Pixel stride and neighbour offset inside the edge region
    pub edge_stride: u32,

    /// Skin-tone ratio must be strictly inside (min, max)
    pub skin_ratio_min: f32,
    pub skin_ratio_max: f32,

    /// Brightness above which a pixel counts as blown out
    pub bright_level: f32,

    /// Brightness below which a pixel counts as crushed
    pub dark_level: f32,

    /// Bright ratio must stay below this
    pub max_bright_ratio: f32,

    /// Dark ratio must stay below this
    pub max_dark_ratio: f32,

    /// Neighbour brightness delta that counts as an edge
    pub edge_delta: f32,

    /// Edge count must exceed this
    pub min_edge_pixels: u32,

    /// Conditions (of 4) that must hold for presence
    pub min_conditions: u32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            max_no_face_count: 3,
            sample_timeout_ms: 2000,
            region_divisor: 3,
            sample_stride: 3,
            edge_region_divisor: 4,
            edge_stride: 5,
            skin_ratio_min: 0.03,
            skin_ratio_max: 0.5,
            bright_level: 200.0,
            dark_level: 50.0,
            max_bright_ratio: 0.7,
            max_dark_ratio: 0.8,
            edge_delta: 30.0,
            min_edge_pixels: 8,
            min_conditions: 3,
        }
    }
}

impl PresenceConfig {
    /// Every condition must hold and absence escalates sooner
    pub fn strict() -> Self {
        Self {
            max_no_face_count: 2,
            min_conditions: 4,
            ..Default::default()
        }
    }

    /// Tolerates poor lighting and longer absences
    pub fn lenient() -> Self {
        Self {
            max_no_face_count: 5,
            max_bright_ratio: 0.85,
            max_dark_ratio: 0.9,
            ..Default::default()
        }
    }
}
