//! Frequency-domain snapshot of a PCM window

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use crate::AudioError;

/// Analyser producing byte magnitudes per frequency bin
pub struct SpectrumAnalyser {
    /// Forward FFT plan, `None` once closed
    fft: Option<Arc<dyn Fft<f32>>>,
    /// Window length
    fft_size: usize,
    /// Precomputed Blackman window
    window: Vec<f32>,
    /// Smoothed magnitudes from the previous snapshot
    previous: Vec<f32>,
    min_decibels: f32,
    max_decibels: f32,
    smoothing: f32,
}

impl SpectrumAnalyser {
    /// Create an analyser
    pub fn new(
        fft_size: usize,
        min_decibels: f32,
        max_decibels: f32,
        smoothing: f32,
    ) -> Result<Self, AudioError> {
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return Err(AudioError::InvalidFftSize(fft_size));
        }
        if !(min_decibels < max_decibels) {
            return Err(AudioError::InvalidRange {
                min: min_decibels,
                max: max_decibels,
            });
        }
        if !(0.0..1.0).contains(&smoothing) {
            return Err(AudioError::InvalidSmoothing(smoothing));
        }

        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

        Ok(Self {
            fft: Some(fft),
            fft_size,
            window: Self::blackman_window(fft_size),
            previous: vec![0.0; fft_size / 2],
            min_decibels,
            max_decibels,
            smoothing,
        })
    }

    /// Blackman window to reduce spectral leakage
    fn blackman_window(n: usize) -> Vec<f32> {
        let (a0, a1, a2) = (0.42_f32, 0.5_f32, 0.08_f32);
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    /// Number of bins in a snapshot
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Window length the analyser expects
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Compute byte magnitudes for the most recent `fft_size` samples.
    ///
    /// Short input is zero-padded at the front.
    pub fn byte_frequency_data(&mut self, samples: &[f32]) -> Result<Vec<u8>, AudioError> {
        let fft = self.fft.as_ref().ok_or(AudioError::Closed)?;
        let n = self.fft_size;

        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();
        let mut buffer: Vec<Complex<f32>> = std::iter::repeat(0.0)
            .take(pad)
            .chain(tail.iter().copied())
            .zip(self.window.iter())
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();

        fft.process(&mut buffer);

        let range = self.max_decibels - self.min_decibels;
        let bytes = buffer
            .iter()
            .take(n / 2)
            .zip(self.previous.iter_mut())
            .map(|(c, prev)| {
                let magnitude = c.norm() / n as f32;
                *prev = self.smoothing * *prev + (1.0 - self.smoothing) * magnitude;
                if *prev <= 0.0 {
                    return 0;
                }
                let db = 20.0 * prev.log10();
                (255.0 / range * (db - self.min_decibels)).clamp(0.0, 255.0) as u8
            })
            .collect();

        Ok(bytes)
    }

    /// Release the FFT plan and buffers. Idempotent.
    pub fn close(&mut self) {
        if self.fft.take().is_some() {
            debug!("Spectrum analyser closed");
        }
        self.previous.clear();
        self.window.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.fft.is_none()
    }
}

/// Mean bin magnitude scaled to [0, 1]
pub fn normalized_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / bins.len() as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, amplitude: f32) -> Vec<f32> {
        let mut x: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                ((x as f32 / u32::MAX as f32) * 2.0 - 1.0) * amplitude
            })
            .collect()
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = SpectrumAnalyser::new(256, -100.0, -30.0, 0.0).unwrap();
        let bins = analyser.byte_frequency_data(&vec![0.0; 256]).unwrap();
        assert_eq!(bins.len(), 128);
        assert_eq!(normalized_level(&bins), 0.0);
    }

    #[test]
    fn test_loud_noise_exceeds_default_threshold() {
        let mut analyser = SpectrumAnalyser::new(256, -100.0, -30.0, 0.0).unwrap();
        let bins = analyser.byte_frequency_data(&noise(256, 1.0)).unwrap();
        assert!(normalized_level(&bins) > 0.6);
    }

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let mut analyser = SpectrumAnalyser::new(256, -100.0, -30.0, 0.0).unwrap();
        // Exactly bin 16
        let signal: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * 16.0 * i as f32 / 256.0).sin() * 0.001)
            .collect();
        let bins = analyser.byte_frequency_data(&signal).unwrap();
        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
    }

    #[test]
    fn test_smoothing_carries_previous_snapshot() {
        let mut analyser = SpectrumAnalyser::new(256, -100.0, -30.0, 0.5).unwrap();
        analyser.byte_frequency_data(&noise(256, 1.0)).unwrap();
        let after_silence = analyser.byte_frequency_data(&vec![0.0; 256]).unwrap();
        assert!(normalized_level(&after_silence) > 0.0);
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut analyser = SpectrumAnalyser::new(64, -100.0, -30.0, 0.0).unwrap();
        let bins = analyser.byte_frequency_data(&noise(10, 1.0)).unwrap();
        assert_eq!(bins.len(), 32);
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            SpectrumAnalyser::new(100, -100.0, -30.0, 0.0).err(),
            Some(AudioError::InvalidFftSize(100))
        );
        assert!(matches!(
            SpectrumAnalyser::new(256, -30.0, -100.0, 0.0),
            Err(AudioError::InvalidRange { .. })
        ));
        assert_eq!(
            SpectrumAnalyser::new(256, -100.0, -30.0, 1.0).err(),
            Some(AudioError::InvalidSmoothing(1.0))
        );
    }

    #[test]
    fn test_closed_analyser_rejects_reads() {
        let mut analyser = SpectrumAnalyser::new(256, -100.0, -30.0, 0.0).unwrap();
        analyser.close();
        analyser.close();
        assert!(analyser.is_closed());
        assert_eq!(
            analyser.byte_frequency_data(&[0.0; 256]).err(),
            Some(AudioError::Closed)
        );
    }

    #[test]
    fn test_normalized_level_bounds() {
        assert_eq!(normalized_level(&[]), 0.0);
        assert_eq!(normalized_level(&[255, 255]), 1.0);
        assert!((normalized_level(&[0, 255]) - 0.5).abs() < 1e-6);
    }
}
