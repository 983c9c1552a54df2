//! Frame classifier
//!
//! Pure function of the frame and config: no hidden state, no I/O.

use media_capture::VideoFrame;
use tracing::debug;

use crate::analysis::{FrameMetrics, PresenceConditions, PresenceVerdict};
use crate::{PresenceConfig, PresenceError};

/// Coordinates visited along one axis of a centred square region
fn axis(center: f32, size: f32, stride: u32) -> impl Iterator<Item = u32> {
    let start = center - size / 2.0;
    let end = center + size / 2.0;
    let stride = stride.max(1) as f32;
    std::iter::successors(Some(start), move |v| Some(v + stride))
        .take_while(move |v| *v < end)
        .filter(|v| *v >= 0.0)
        .map(|v| v.floor() as u32)
}

/// Warm-hued pixel with R > G > B and clear channel separation
fn is_skin_tone([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    r > 95 && g > 40 && b > 20 && r > g && g > b && (r - g).abs() > 15 && r - b > 15
}

/// Measure skin tone, exposure, and edge density around the frame centre
pub fn measure(frame: &VideoFrame, config: &PresenceConfig) -> Result<FrameMetrics, PresenceError> {
    if !frame.is_well_formed() {
        return Err(PresenceError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        });
    }

    let cx = frame.width as f32 / 2.0;
    let cy = frame.height as f32 / 2.0;
    let short_side = frame.width.min(frame.height) as f32;

    // Skin tone and exposure
    let region = short_side / config.region_divisor.max(1) as f32;
    let (mut total, mut skin, mut bright, mut dark) = (0u32, 0u32, 0u32, 0u32);
    for y in axis(cy, region, config.sample_stride) {
        for x in axis(cx, region, config.sample_stride) {
            let Some(px) = frame.get_pixel(x, y) else {
                continue;
            };
            total += 1;
            if is_skin_tone(px) {
                skin += 1;
            }
            let brightness = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
            if brightness > config.bright_level {
                bright += 1;
            }
            if brightness < config.dark_level {
                dark += 1;
            }
        }
    }

    if total == 0 {
        return Err(PresenceError::EmptyRegion);
    }

    // Edge density over a smaller central square
    let edge_region = short_side / config.edge_region_divisor.max(1) as f32;
    let offset = config.edge_stride.max(1);
    let mut edges = 0u32;
    for y in axis(cy, edge_region, config.edge_stride) {
        for x in axis(cx, edge_region, config.edge_stride) {
            let (Some(here), Some(right), Some(down)) = (
                frame.brightness(x, y),
                frame.brightness(x + offset, y),
                frame.brightness(x, y + offset),
            ) else {
                continue;
            };
            if (here - right).abs() > config.edge_delta || (here - down).abs() > config.edge_delta {
                edges += 1;
            }
        }
    }

    Ok(FrameMetrics {
        skin_tone_ratio: skin as f32 / total as f32,
        bright_ratio: bright as f32 / total as f32,
        dark_ratio: dark as f32 / total as f32,
        edge_pixels: edges,
        sampled_pixels: total,
    })
}

/// Decide whether a subject is plausibly in frame.
///
/// Presence is a majority vote (default 3 of 4), so a single failed
/// condition such as poor lighting does not flip the result.
pub fn classify(
    frame: &VideoFrame,
    config: &PresenceConfig,
) -> Result<PresenceVerdict, PresenceError> {
    let metrics = measure(frame, config)?;

    let conditions = PresenceConditions {
        has_skin_tone: metrics.skin_tone_ratio > config.skin_ratio_min
            && metrics.skin_tone_ratio < config.skin_ratio_max,
        not_overexposed: metrics.bright_ratio < config.max_bright_ratio,
        not_underexposed: metrics.dark_ratio < config.max_dark_ratio,
        has_features: metrics.edge_pixels > config.min_edge_pixels,
    };
    let present = conditions.passed() >= config.min_conditions;

    debug!(
        "Presence {}: skin={:.1}% bright={:.1}% dark={:.1}% edges={} ({}/4)",
        if present { "detected" } else { "missing" },
        metrics.skin_tone_ratio * 100.0,
        metrics.bright_ratio * 100.0,
        metrics.dark_ratio * 100.0,
        metrics.edge_pixels,
        conditions.passed()
    );

    Ok(PresenceVerdict {
        present,
        metrics,
        conditions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_capture::synthetic::{pattern_frame, FramePattern};
    use proptest::prelude::*;

    /// Skin disc whose brightness matches the wall, so no edges register
    fn flat_face_frame(width: u32, height: u32) -> VideoFrame {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = width.min(height) as f32 / 10.0;
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                let px = if d2 <= radius * radius {
                    [150, 100, 80]
                } else {
                    [110, 110, 110]
                };
                data.extend_from_slice(&px);
            }
        }
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_face_passes_all_conditions() {
        let frame = pattern_frame(FramePattern::Face, 640, 480, 0);
        let verdict = classify(&frame, &PresenceConfig::default()).unwrap();

        assert!(verdict.present);
        assert_eq!(verdict.conditions.passed(), 4);
        assert!(verdict.metrics.skin_tone_ratio > 0.03 && verdict.metrics.skin_tone_ratio < 0.5);
        assert!(verdict.metrics.edge_pixels > 8);
    }

    #[test]
    fn test_three_of_four_is_enough() {
        let frame = flat_face_frame(640, 480);
        let verdict = classify(&frame, &PresenceConfig::default()).unwrap();

        assert_eq!(verdict.metrics.edge_pixels, 0);
        assert!(!verdict.conditions.has_features);
        assert_eq!(verdict.conditions.passed(), 3);
        assert!(verdict.present);
    }

    #[test]
    fn test_strict_requires_unanimity() {
        let frame = flat_face_frame(640, 480);
        let verdict = classify(&frame, &PresenceConfig::strict()).unwrap();
        assert!(!verdict.present);
    }

    #[test]
    fn test_empty_scenes_are_absent() {
        let config = PresenceConfig::default();
        for pattern in [FramePattern::Blank, FramePattern::Dark, FramePattern::Overexposed] {
            let frame = pattern_frame(pattern, 320, 240, 0);
            let verdict = classify(&frame, &config).unwrap();
            assert!(!verdict.present, "{:?} should be absent", pattern);
        }
    }

    #[test]
    fn test_covered_lens_metrics() {
        let frame = pattern_frame(FramePattern::Dark, 320, 240, 0);
        let metrics = measure(&frame, &PresenceConfig::default()).unwrap();
        assert_eq!(metrics.dark_ratio, 1.0);
        assert_eq!(metrics.skin_tone_ratio, 0.0);
    }

    #[test]
    fn test_malformed_frame_is_error() {
        let frame = VideoFrame::new(vec![0; 10], 640, 480, 0, 0);
        assert!(matches!(
            classify(&frame, &PresenceConfig::default()),
            Err(PresenceError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_skin_rule() {
        assert!(is_skin_tone([200, 150, 110]));
        assert!(!is_skin_tone([90, 60, 40])); // too dark in red
        assert!(!is_skin_tone([120, 110, 100])); // r-g too small
        assert!(!is_skin_tone([110, 150, 200])); // blue-ish
    }

    proptest! {
        #[test]
        fn prop_classify_is_pure(
            width in 1u32..24,
            height in 1u32..24,
            seed in any::<u64>(),
        ) {
            let mut state = seed;
            let data: Vec<u8> = (0..width * height * 3)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                    (state >> 56) as u8
                })
                .collect();
            let frame = VideoFrame::new(data, width, height, 0, 0);
            let config = PresenceConfig::default();

            let first = classify(&frame, &config).unwrap();
            let second = classify(&frame, &config).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
