//! Frame sampler

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::frame::VideoFrame;
use crate::stream::VideoStream;
use crate::CaptureError;

/// Grabs single stills from a camera stream, bounded by a timeout
pub struct FrameSampler {
    stream: Arc<dyn VideoStream>,
    timeout: Duration,
    grabbed: u32,
}

impl FrameSampler {
    pub fn new(stream: Arc<dyn VideoStream>, timeout: Duration) -> Self {
        Self {
            stream,
            timeout,
            grabbed: 0,
        }
    }

    /// Grab one frame. A stopped stream or a slow grab is an error, never a hang.
    pub async fn sample(&mut self) -> Result<VideoFrame, CaptureError> {
        if self.stream.active_tracks() == 0 {
            return Err(CaptureError::Stopped);
        }

        let frame = tokio::time::timeout(self.timeout, self.stream.grab_frame())
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout.as_millis() as u64))??;

        self.grabbed = self.grabbed.wrapping_add(1);
        debug!(
            "Sampled frame {}x{} (#{})",
            frame.width, frame.height, self.grabbed
        );
        Ok(frame)
    }

    /// Frames successfully grabbed so far
    pub fn grabbed(&self) -> u32 {
        self.grabbed
    }
}
