//! Media device and stream abstractions

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::frame::VideoFrame;
use crate::{CameraConstraints, CaptureError, MediaKind, MicrophoneConstraints};

/// Source of camera and microphone streams (permission prompts live here)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request the camera
    async fn open_camera(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn VideoStream>, CaptureError>;

    /// Request the microphone
    async fn open_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> Result<Arc<dyn AudioStream>, CaptureError>;
}

/// Common track control for any media stream
pub trait MediaTrack: Send + Sync {
    /// Device kind backing this stream
    fn kind(&self) -> MediaKind;

    /// Number of tracks still live
    fn active_tracks(&self) -> usize;

    /// Stop every track. Must be idempotent.
    fn stop(&self);
}

/// Live camera stream
#[async_trait]
pub trait VideoStream: MediaTrack {
    /// Grab a still frame from the live stream
    async fn grab_frame(&self) -> Result<VideoFrame, CaptureError>;
}

/// Live microphone stream
#[async_trait]
pub trait AudioStream: MediaTrack {
    /// Sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Read the most recent `len` PCM samples in [-1, 1]
    async fn read_window(&self, len: usize) -> Result<Vec<f32>, CaptureError>;
}

/// Owns a stream and stops its tracks when released or dropped
pub struct StreamGuard<S: MediaTrack + ?Sized> {
    stream: Option<Arc<S>>,
}

impl<S: MediaTrack + ?Sized> StreamGuard<S> {
    /// Take ownership of an opened stream
    pub fn new(stream: Arc<S>) -> Self {
        info!("{} stream acquired ({} tracks)", stream.kind(), stream.active_tracks());
        Self {
            stream: Some(stream),
        }
    }

    /// Shared handle for samplers; the guard keeps ownership of release
    pub fn stream(&self) -> Option<Arc<S>> {
        self.stream.clone()
    }

    /// Whether the stream is still held
    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    /// Live tracks, zero once released
    pub fn active_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.active_tracks())
    }

    /// Stop all tracks. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
            info!("{} stream released", stream.kind());
        } else {
            debug!("Stream already released");
        }
    }
}

impl<S: MediaTrack + ?Sized> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticDevices;

    #[tokio::test]
    async fn test_guard_release_stops_tracks() {
        let devices = SyntheticDevices::new();
        let camera = devices
            .open_camera(&CameraConstraints::default())
            .await
            .unwrap();
        let mut guard = StreamGuard::new(camera.clone());
        assert_eq!(guard.active_tracks(), 1);

        guard.release();
        guard.release();
        assert_eq!(camera.active_tracks(), 0);
        assert!(!guard.is_held());
    }

    #[tokio::test]
    async fn test_guard_drop_stops_tracks() {
        let devices = SyntheticDevices::new();
        let mic = devices
            .open_microphone(&MicrophoneConstraints::default())
            .await
            .unwrap();
        {
            let _guard = StreamGuard::new(mic.clone());
            assert_eq!(mic.active_tracks(), 1);
        }
        assert_eq!(mic.active_tracks(), 0);
    }
}
