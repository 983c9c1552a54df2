//! Audio Level Monitoring
//!
//! Reduces a live microphone stream to one loudness scalar per tick:
//! - Windowed FFT into analyser-style byte magnitudes
//! - Mean magnitude normalized to [0, 1]
//! - Suspicious-noise streak with fractional decay

mod config;
mod monitor;
mod spectrum;
mod streak;

pub use config::AudioConfig;
pub use monitor::AudioLevelMonitor;
pub use spectrum::{normalized_level, SpectrumAnalyser};
pub use streak::{AudioStep, LoudnessStreak};

use media_capture::CaptureError;
use thiserror::Error;

/// Audio monitoring errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("FFT size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),

    #[error("Invalid decibel range [{min}, {max}]")]
    InvalidRange { min: f32, max: f32 },

    #[error("Smoothing constant {0} outside [0, 1)")]
    InvalidSmoothing(f32),

    #[error("Analyser closed")]
    Closed,

    #[error("Microphone read failed: {0}")]
    Capture(#[from] CaptureError),
}
