//! Consecutive-absence tracking

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What one presence sample means for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsenceStep {
    /// Subject seen; streak cleared
    Present,
    /// Subject missing, below the threshold
    Missing { consecutive: u32 },
    /// Threshold reached; a violation is due and the streak restarts at zero
    Violation { consecutive: u32 },
}

impl AbsenceStep {
    /// Consecutive misses reported to the host, zero when present
    pub fn consecutive(&self) -> u32 {
        match self {
            AbsenceStep::Present => 0,
            AbsenceStep::Missing { consecutive } | AbsenceStep::Violation { consecutive } => {
                *consecutive
            }
        }
    }
}

/// Counts consecutive absent samples
#[derive(Debug, Clone)]
pub struct AbsenceTracker {
    /// Current streak of absent samples
    consecutive_misses: u32,

    /// Streak length that produces a violation
    threshold: u32,

    /// Samples observed over the session
    total_samples: u64,

    /// Absent samples observed over the session
    total_misses: u64,
}

impl AbsenceTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_misses: 0,
            threshold: threshold.max(1),
            total_samples: 0,
            total_misses: 0,
        }
    }

    /// Feed one sample. Failed grabs should be fed as `false`.
    pub fn observe(&mut self, present: bool) -> AbsenceStep {
        self.total_samples += 1;

        if present {
            if self.consecutive_misses > 0 {
                debug!("Presence restored after {} misses", self.consecutive_misses);
            }
            self.consecutive_misses = 0;
            return AbsenceStep::Present;
        }

        self.total_misses += 1;
        self.consecutive_misses += 1;
        let consecutive = self.consecutive_misses;

        if consecutive >= self.threshold {
            warn!("No presence for {} consecutive samples", consecutive);
            self.consecutive_misses = 0;
            AbsenceStep::Violation { consecutive }
        } else {
            debug!("No presence ({}/{})", consecutive, self.threshold);
            AbsenceStep::Missing { consecutive }
        }
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn total_misses(&self) -> u64 {
        self.total_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_fires_once_and_restarts() {
        let mut tracker = AbsenceTracker::new(3);

        assert_eq!(tracker.observe(false), AbsenceStep::Missing { consecutive: 1 });
        assert_eq!(tracker.observe(false), AbsenceStep::Missing { consecutive: 2 });
        assert_eq!(tracker.observe(false), AbsenceStep::Violation { consecutive: 3 });
        assert_eq!(tracker.consecutive_misses(), 0);

        // A fourth miss starts a fresh streak
        assert_eq!(tracker.observe(false), AbsenceStep::Missing { consecutive: 1 });
    }

    #[test]
    fn test_single_presence_resets_streak() {
        let mut tracker = AbsenceTracker::new(3);
        tracker.observe(false);
        tracker.observe(false);

        assert_eq!(tracker.observe(true), AbsenceStep::Present);
        assert_eq!(tracker.consecutive_misses(), 0);
        assert_eq!(tracker.observe(false), AbsenceStep::Missing { consecutive: 1 });
    }

    #[test]
    fn test_totals_survive_violation() {
        let mut tracker = AbsenceTracker::new(2);
        tracker.observe(true);
        tracker.observe(false);
        assert_eq!(tracker.total_samples(), 2);
        assert_eq!(tracker.total_misses(), 1);

        assert_eq!(tracker.observe(false), AbsenceStep::Violation { consecutive: 2 });
        assert_eq!(tracker.consecutive_misses(), 0);
        assert_eq!(tracker.total_misses(), 2);
    }

    #[test]
    fn test_step_consecutive() {
        assert_eq!(AbsenceStep::Present.consecutive(), 0);
        assert_eq!(AbsenceStep::Violation { consecutive: 3 }.consecutive(), 3);
    }
}
