//! Synthetic media devices
//!
//! Deterministic stand-ins for camera and microphone so presence, audio,
//! and session logic can run without hardware or a browser.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::frame::VideoFrame;
use crate::stream::{AudioStream, MediaDevices, MediaTrack, VideoStream};
use crate::{CameraConstraints, CaptureError, MediaKind, MicrophoneConstraints};

const SKIN: [u8; 3] = [200, 150, 110];
const EYE: [u8; 3] = [40, 30, 30];
const BACKGROUND: [u8; 3] = [90, 90, 90];

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scene drawn into a synthetic frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePattern {
    /// Skin-toned oval with two dark eyes on a grey wall
    Face,
    /// Empty grey wall
    Blank,
    /// Covered lens
    Dark,
    /// Blown-out exposure
    Overexposed,
}

/// Render a pattern as an RGB frame
pub fn pattern_frame(pattern: FramePattern, width: u32, height: u32, sequence: u32) -> VideoFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let radius = width.min(height) as f32 / 10.0;
    let eye_radius = radius / 8.0;
    let eyes = [
        (cx - radius * 0.35, cy - radius * 0.3),
        (cx + radius * 0.35, cy - radius * 0.3),
    ];

    for y in 0..height {
        for x in 0..width {
            let px = match pattern {
                FramePattern::Blank => BACKGROUND,
                FramePattern::Dark => [10, 10, 10],
                FramePattern::Overexposed => [250, 250, 250],
                FramePattern::Face => {
                    let (fx, fy) = (x as f32, y as f32);
                    let in_eye = eyes.iter().any(|&(ex, ey)| {
                        (fx - ex).powi(2) + (fy - ey).powi(2) <= eye_radius.powi(2)
                    });
                    if in_eye {
                        EYE
                    } else if (fx - cx).powi(2) + (fy - cy).powi(2) <= radius.powi(2) {
                        SKIN
                    } else {
                        BACKGROUND
                    }
                }
            };
            data.extend_from_slice(&px);
        }
    }

    VideoFrame::new(data, width, height, 0, sequence)
}

/// One scripted grab result
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    Pattern(FramePattern),
    Fail(CaptureError),
    /// Resolve after the given delay
    Delayed(Duration, FramePattern),
}

/// Camera producing pattern frames
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    live: AtomicBool,
    pattern: Mutex<FramePattern>,
    script: Mutex<VecDeque<ScriptedFrame>>,
    grabs: AtomicU32,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            live: AtomicBool::new(true),
            pattern: Mutex::new(FramePattern::Face),
            script: Mutex::new(VecDeque::new()),
            grabs: AtomicU32::new(0),
        }
    }

    /// Pattern used once the script is exhausted
    pub fn set_pattern(&self, pattern: FramePattern) {
        *lock(&self.pattern) = pattern;
    }

    /// Queue a one-shot grab result
    pub fn push_script(&self, frame: ScriptedFrame) {
        lock(&self.script).push_back(frame);
    }

    /// Number of grab attempts
    pub fn grabs(&self) -> u32 {
        self.grabs.load(Ordering::SeqCst)
    }

    fn revive(&self) {
        self.live.store(true, Ordering::SeqCst);
    }
}

impl MediaTrack for SyntheticCamera {
    fn kind(&self) -> MediaKind {
        MediaKind::Camera
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live.load(Ordering::SeqCst))
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoStream for SyntheticCamera {
    async fn grab_frame(&self) -> Result<VideoFrame, CaptureError> {
        let seq = self.grabs.fetch_add(1, Ordering::SeqCst);
        if !self.live.load(Ordering::SeqCst) {
            return Err(CaptureError::Stopped);
        }

        let fallback = *lock(&self.pattern);
        let scripted = lock(&self.script).pop_front();
        let pattern = match scripted {
            Some(ScriptedFrame::Pattern(p)) => p,
            Some(ScriptedFrame::Fail(e)) => return Err(e),
            Some(ScriptedFrame::Delayed(delay, p)) => {
                tokio::time::sleep(delay).await;
                p
            }
            None => fallback,
        };

        Ok(pattern_frame(pattern, self.width, self.height, seq))
    }
}

/// Microphone producing deterministic noise at a chosen amplitude
pub struct SyntheticMicrophone {
    sample_rate: u32,
    live: AtomicBool,
    amplitude: Mutex<f32>,
    /// `None` entries fail the read
    script: Mutex<VecDeque<Option<f32>>>,
    seed: AtomicU32,
    reads: AtomicU32,
}

impl SyntheticMicrophone {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            live: AtomicBool::new(true),
            amplitude: Mutex::new(0.0),
            script: Mutex::new(VecDeque::new()),
            seed: AtomicU32::new(0x9E37_79B9),
            reads: AtomicU32::new(0),
        }
    }

    /// Amplitude used once the script is exhausted (0 = silence, 1 = full scale)
    pub fn set_amplitude(&self, amplitude: f32) {
        *lock(&self.amplitude) = amplitude.clamp(0.0, 1.0);
    }

    /// Queue one amplitude per upcoming read
    pub fn push_amplitudes(&self, amplitudes: impl IntoIterator<Item = f32>) {
        lock(&self.script).extend(amplitudes.into_iter().map(Some));
    }

    /// Queue one failing read
    pub fn push_failure(&self) {
        lock(&self.script).push_back(None);
    }

    /// Number of window reads
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    fn revive(&self) {
        self.live.store(true, Ordering::SeqCst);
    }

    fn next_noise(&self) -> f32 {
        // xorshift32
        let mut x = self.seed.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed.store(x, Ordering::Relaxed);
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl MediaTrack for SyntheticMicrophone {
    fn kind(&self) -> MediaKind {
        MediaKind::Microphone
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live.load(Ordering::SeqCst))
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioStream for SyntheticMicrophone {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_window(&self, len: usize) -> Result<Vec<f32>, CaptureError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.live.load(Ordering::SeqCst) {
            return Err(CaptureError::Stopped);
        }

        let amplitude = match lock(&self.script).pop_front() {
            Some(Some(amplitude)) => amplitude,
            Some(None) => return Err(CaptureError::Stream("scripted read failure".into())),
            None => *lock(&self.amplitude),
        };
        Ok((0..len).map(|_| self.next_noise() * amplitude).collect())
    }
}

/// Device set handing out one synthetic camera and microphone
pub struct SyntheticDevices {
    camera: Arc<SyntheticCamera>,
    microphone: Arc<SyntheticMicrophone>,
    deny_camera: bool,
    deny_microphone: bool,
}

impl SyntheticDevices {
    /// 320x240 camera, 48 kHz microphone, both permitted
    pub fn new() -> Self {
        Self {
            camera: Arc::new(SyntheticCamera::new(320, 240)),
            microphone: Arc::new(SyntheticMicrophone::new(48_000)),
            deny_camera: false,
            deny_microphone: false,
        }
    }

    /// Reject camera permission
    pub fn deny_camera(mut self) -> Self {
        self.deny_camera = true;
        self
    }

    /// Reject microphone permission
    pub fn deny_microphone(mut self) -> Self {
        self.deny_microphone = true;
        self
    }

    pub fn camera(&self) -> Arc<SyntheticCamera> {
        self.camera.clone()
    }

    pub fn microphone(&self) -> Arc<SyntheticMicrophone> {
        self.microphone.clone()
    }
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn open_camera(
        &self,
        _constraints: &CameraConstraints,
    ) -> Result<Arc<dyn VideoStream>, CaptureError> {
        if self.deny_camera {
            warn!("Synthetic camera permission denied");
            return Err(CaptureError::PermissionDenied(MediaKind::Camera));
        }
        self.camera.revive();
        Ok(self.camera.clone())
    }

    async fn open_microphone(
        &self,
        _constraints: &MicrophoneConstraints,
    ) -> Result<Arc<dyn AudioStream>, CaptureError> {
        if self.deny_microphone {
            warn!("Synthetic microphone permission denied");
            return Err(CaptureError::PermissionDenied(MediaKind::Microphone));
        }
        self.microphone.revive();
        Ok(self.microphone.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_pattern_has_skin_at_center() {
        let frame = pattern_frame(FramePattern::Face, 200, 100, 0);
        assert_eq!(frame.get_pixel(100, 50), Some(SKIN));
        assert_eq!(frame.get_pixel(0, 0), Some(BACKGROUND));
        assert!(frame.is_well_formed());
    }

    #[tokio::test]
    async fn test_camera_script_then_pattern() {
        let camera = SyntheticCamera::new(16, 16);
        camera.push_script(ScriptedFrame::Fail(CaptureError::Stream("glitch".into())));
        camera.set_pattern(FramePattern::Dark);

        assert!(camera.grab_frame().await.is_err());
        let frame = camera.grab_frame().await.unwrap();
        assert_eq!(frame.get_pixel(8, 8), Some([10, 10, 10]));
        assert_eq!(camera.grabs(), 2);
    }

    #[tokio::test]
    async fn test_microphone_amplitude_bounds_samples() {
        let mic = SyntheticMicrophone::new(48_000);
        mic.push_amplitudes([0.5]);

        let loud = mic.read_window(256).await.unwrap();
        assert!(loud.iter().all(|s| s.abs() <= 0.5));
        assert!(loud.iter().any(|s| s.abs() > 0.1));

        let quiet = mic.read_window(256).await.unwrap();
        assert!(quiet.iter().all(|&s| s == 0.0));
    }

    #[tokio::test]
    async fn test_microphone_scripted_failure() {
        let mic = SyntheticMicrophone::new(48_000);
        mic.push_failure();
        mic.push_amplitudes([0.5]);

        assert!(matches!(
            mic.read_window(16).await,
            Err(CaptureError::Stream(_))
        ));
        assert!(mic.read_window(16).await.is_ok());
        assert_eq!(mic.reads(), 2);
    }

    #[tokio::test]
    async fn test_denied_permissions() {
        let devices = SyntheticDevices::new().deny_microphone();
        assert!(devices.open_camera(&CameraConstraints::default()).await.is_ok());
        assert_eq!(
            devices
                .open_microphone(&MicrophoneConstraints::default())
                .await
                .err(),
            Some(CaptureError::PermissionDenied(MediaKind::Microphone))
        );
    }
}
