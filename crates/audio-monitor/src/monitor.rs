//! Audio level monitor

use std::sync::Arc;

use media_capture::AudioStream;
use tracing::{debug, info};

use crate::spectrum::{normalized_level, SpectrumAnalyser};
use crate::{AudioConfig, AudioError};

/// Reads a microphone window each tick and reduces it to a loudness scalar
pub struct AudioLevelMonitor {
    stream: Arc<dyn AudioStream>,
    analyser: SpectrumAnalyser,
    readings: u64,
}

impl AudioLevelMonitor {
    /// Create a monitor over an opened microphone stream
    pub fn new(stream: Arc<dyn AudioStream>, config: &AudioConfig) -> Result<Self, AudioError> {
        let analyser = SpectrumAnalyser::new(
            config.fft_size,
            config.min_decibels,
            config.max_decibels,
            config.smoothing,
        )?;
        info!(
            "Audio monitor ready: {} bins @ {} Hz",
            analyser.frequency_bin_count(),
            stream.sample_rate()
        );

        Ok(Self {
            stream,
            analyser,
            readings: 0,
        })
    }

    /// Current normalized level in [0, 1]
    pub async fn sample(&mut self) -> Result<f32, AudioError> {
        if self.analyser.is_closed() {
            return Err(AudioError::Closed);
        }

        let window = self.stream.read_window(self.analyser.fft_size()).await?;
        let bins = self.analyser.byte_frequency_data(&window)?;
        let level = normalized_level(&bins);

        self.readings += 1;
        debug!("Audio level {:.3} (reading #{})", level, self.readings);
        Ok(level)
    }

    /// Number of successful readings
    pub fn readings(&self) -> u64 {
        self.readings
    }

    /// Close the processing context. The stream itself is owned elsewhere.
    pub fn close(&mut self) {
        self.analyser.close();
    }

    pub fn is_closed(&self) -> bool {
        self.analyser.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_capture::synthetic::SyntheticMicrophone;
    use media_capture::{CaptureError, MediaTrack};

    #[tokio::test]
    async fn test_quiet_and_loud_levels() {
        let mic = Arc::new(SyntheticMicrophone::new(48_000));
        mic.push_amplitudes([0.0, 1.0]);
        let mut monitor = AudioLevelMonitor::new(mic, &AudioConfig::default()).unwrap();

        assert_eq!(monitor.sample().await.unwrap(), 0.0);
        assert!(monitor.sample().await.unwrap() > 0.3);
        assert_eq!(monitor.readings(), 2);
    }

    #[tokio::test]
    async fn test_stopped_stream_surfaces_capture_error() {
        let mic = Arc::new(SyntheticMicrophone::new(48_000));
        mic.stop();
        let mut monitor = AudioLevelMonitor::new(mic, &AudioConfig::default()).unwrap();

        assert_eq!(
            monitor.sample().await.unwrap_err(),
            AudioError::Capture(CaptureError::Stopped)
        );
    }

    #[tokio::test]
    async fn test_closed_monitor() {
        let mic = Arc::new(SyntheticMicrophone::new(48_000));
        let mut monitor = AudioLevelMonitor::new(mic.clone(), &AudioConfig::default()).unwrap();
        monitor.close();

        assert_eq!(monitor.sample().await.unwrap_err(), AudioError::Closed);
        assert_eq!(mic.reads(), 0);
    }
}
