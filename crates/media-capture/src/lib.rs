//! Media Capture for Exam Proctoring
//!
//! Owns the camera and microphone handles used by the proctoring core.
//! Supports:
//! - Camera stream with still-frame grabbing (presence detection)
//! - Microphone stream with PCM window reads (audio level monitoring)
//! - Scoped release of both streams via [`StreamGuard`]
//! - Synthetic devices for tests and simulation

pub mod frame;
pub mod sampler;
pub mod stream;
pub mod synthetic;

pub use frame::{PixelFormat, VideoFrame};
pub use sampler::FrameSampler;
pub use stream::{AudioStream, MediaDevices, MediaTrack, StreamGuard, VideoStream};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("{0} permission denied")]
    PermissionDenied(MediaKind),

    #[error("{kind} unavailable: {reason}")]
    DeviceUnavailable { kind: MediaKind, reason: String },

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Capture timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream stopped")]
    Stopped,

    #[error("Frame decode failed: {0}")]
    Decode(String),
}

/// Kind of media device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Camera,
    Microphone,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Camera => write!(f, "camera"),
            MediaKind::Microphone => write!(f, "microphone"),
        }
    }
}

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera, pointed at the test-taker
    User,
    Environment,
}

/// Camera request constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConstraints {
    /// Preferred capture width
    pub ideal_width: u32,
    /// Preferred capture height
    pub ideal_height: u32,
    /// Camera facing
    pub facing: FacingMode,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            facing: FacingMode::User,
        }
    }
}

/// Microphone request constraints
///
/// All processing is off so the analyser sees the raw room level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicrophoneConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for MicrophoneConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}
