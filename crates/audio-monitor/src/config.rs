//! Audio monitor configuration

use serde::{Deserialize, Serialize};

/// Audio sampling and loudness policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sampling period (milliseconds)
    pub interval_ms: u64,

    /// FFT window length; half of it is the bin count
    pub fft_size: usize,

    /// Normalized level above which a tick counts as loud
    pub threshold: f32,

    /// Streak value that produces a violation
    pub max_suspicious_count: f32,

    /// Amount subtracted from the streak on a quiet tick
    pub streak_decay: f32,

    /// Magnitude mapped to byte 0 (dB)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dB)
    pub max_decibels: f32,

    /// Blend with the previous spectrum, 0 = none
    pub smoothing: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            fft_size: 256,
            threshold: 0.3,
            max_suspicious_count: 3.0,
            streak_decay: 0.5,
            min_decibels: -100.0,
            max_decibels: -30.0,
            smoothing: 0.0,
        }
    }
}
