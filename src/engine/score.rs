//! Session score bookkeeping.
//!
//! Counters only move on yes/no verdicts; help digressions leave every field
//! untouched. Two invariants hold after any call sequence:
//! `pass_count <= total_count` and `epoch == total_count + 1` (epoch is the
//! 1-based index of the trial about to be shown).

use serde::Serialize;

/// Tolerance ceiling and session starting point.
pub const TOLERANCE_MAX: i32 = 100;

/// Default per-verdict tolerance decay.
pub const DEFAULT_TOLERANCE_DECAY: i32 = 5;

/// Pass/total/epoch counters plus the decaying classifier tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreTracker {
    pass_count: u32,
    total_count: u32,
    epoch: u32,
    tolerance: i32,
    decay: i32,
}

impl ScoreTracker {
    pub fn new(initial_tolerance: i32, decay: i32) -> Self {
        Self {
            pass_count: 0,
            total_count: 0,
            epoch: 1,
            tolerance: initial_tolerance.clamp(0, TOLERANCE_MAX),
            decay: decay.max(0),
        }
    }

    /// Record one yes/no verdict: bump the counters and decay the tolerance,
    /// flooring it at zero. Decay happens regardless of correctness.
    pub fn record_verdict(&mut self, correct: bool) {
        if correct {
            self.pass_count += 1;
        }
        self.total_count += 1;
        self.epoch += 1;
        self.tolerance = (self.tolerance - self.decay).max(0);
    }

    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }
}

impl Default for ScoreTracker {
    fn default() -> Self {
        Self::new(TOLERANCE_MAX, DEFAULT_TOLERANCE_DECAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_epoch_one_with_full_tolerance() {
        let score = ScoreTracker::default();
        assert_eq!(score.pass_count(), 0);
        assert_eq!(score.total_count(), 0);
        assert_eq!(score.epoch(), 1);
        assert_eq!(score.tolerance(), 100);
    }

    #[test]
    fn decay_follows_max_of_zero_law() {
        let mut score = ScoreTracker::default();
        for n in 1..=30u32 {
            score.record_verdict(n % 2 == 0);
            assert_eq!(score.tolerance(), (100 - 5 * n as i32).max(0));
        }
        assert_eq!(score.tolerance(), 0);
    }

    #[test]
    fn counters_preserve_invariants() {
        let mut score = ScoreTracker::default();
        let verdicts = [true, false, true, true, false, false, true];
        for &correct in &verdicts {
            score.record_verdict(correct);
            assert!(score.pass_count() <= score.total_count());
            assert_eq!(score.epoch(), score.total_count() + 1);
        }
        assert_eq!(score.pass_count(), 4);
        assert_eq!(score.total_count(), 7);
    }

    #[test]
    fn initial_tolerance_is_clamped() {
        assert_eq!(ScoreTracker::new(250, 5).tolerance(), 100);
        assert_eq!(ScoreTracker::new(-10, 5).tolerance(), 0);
    }

    #[test]
    fn incorrect_verdicts_still_decay() {
        let mut score = ScoreTracker::default();
        score.record_verdict(false);
        assert_eq!(score.pass_count(), 0);
        assert_eq!(score.total_count(), 1);
        assert_eq!(score.tolerance(), 95);
    }
}
