//! Suspicious-noise streak

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AudioConfig;

/// What one loudness reading means for the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AudioStep {
    /// Below threshold; streak decayed
    Quiet { streak: f32 },
    /// Above threshold, streak still short of the limit
    Loud { streak: f32 },
    /// Streak reached the limit and restarts at zero
    Violation { level: f32, streak: f32 },
}

/// Sustained-loudness counter with fractional decay
#[derive(Debug, Clone)]
pub struct LoudnessStreak {
    streak: f32,
    threshold: f32,
    limit: f32,
    decay: f32,
}

impl LoudnessStreak {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            streak: 0.0,
            threshold: config.threshold,
            limit: config.max_suspicious_count.max(1.0),
            decay: config.streak_decay.max(0.0),
        }
    }

    /// Feed one normalized level in [0, 1]
    pub fn observe(&mut self, level: f32) -> AudioStep {
        if level > self.threshold {
            self.streak += 1.0;
            if self.streak >= self.limit {
                let streak = self.streak;
                self.streak = 0.0;
                warn!("Sustained audio at level {:.2} (streak {:.1})", level, streak);
                return AudioStep::Violation { level, streak };
            }
            debug!("Loud audio {:.2} (streak {:.1}/{})", level, self.streak, self.limit);
            AudioStep::Loud {
                streak: self.streak,
            }
        } else {
            // Brief spikes fade out rather than reset abruptly
            self.streak = (self.streak - self.decay).max(0.0);
            AudioStep::Quiet {
                streak: self.streak,
            }
        }
    }

    pub fn streak(&self) -> f32 {
        self.streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_three_loud_ticks_trigger() {
        let mut streak = LoudnessStreak::new(&AudioConfig::default());
        assert_eq!(streak.observe(0.5), AudioStep::Loud { streak: 1.0 });
        assert_eq!(streak.observe(0.5), AudioStep::Loud { streak: 2.0 });
        assert_eq!(
            streak.observe(0.6),
            AudioStep::Violation {
                level: 0.6,
                streak: 3.0
            }
        );
        assert_eq!(streak.streak(), 0.0);
    }

    #[test]
    fn test_quiet_tick_decays_not_resets() {
        let mut streak = LoudnessStreak::new(&AudioConfig::default());
        streak.observe(0.9);
        streak.observe(0.9);
        assert_eq!(streak.observe(0.1), AudioStep::Quiet { streak: 1.5 });

        // Two more loud ticks are needed before the limit is crossed
        assert_eq!(streak.observe(0.9), AudioStep::Loud { streak: 2.5 });
        assert!(matches!(streak.observe(0.9), AudioStep::Violation { .. }));
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut streak = LoudnessStreak::new(&AudioConfig::default());
        streak.observe(0.9);
        streak.observe(0.0);
        streak.observe(0.0);
        streak.observe(0.0);
        assert_eq!(streak.streak(), 0.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut streak = LoudnessStreak::new(&AudioConfig::default());
        assert_eq!(streak.observe(0.3), AudioStep::Quiet { streak: 0.0 });
    }

    proptest! {
        #[test]
        fn prop_streak_stays_in_bounds(levels in proptest::collection::vec(0.0f32..=1.0, 0..64)) {
            let config = AudioConfig::default();
            let mut streak = LoudnessStreak::new(&config);
            for level in levels {
                streak.observe(level);
                prop_assert!(streak.streak() >= 0.0);
                prop_assert!(streak.streak() < config.max_suspicious_count);
            }
        }
    }
}
