//! Difficulty state and the adjustment rule derived from recent performance.

use core::time::Duration;

use super::history::PerformanceHistory;

/// Longest sequence the engine will ever generate.
pub const MAX_SEQUENCE_STEPS: usize = 16;
/// Shortest sequence the engine will ever generate.
pub const MIN_SEQUENCE_STEPS: u8 = 1;
pub const MIN_BLINK_MS: u32 = 200;
pub const MAX_BLINK_MS: u32 = 2_000;
/// Blink change applied per adjustment.
pub const BLINK_STEP_MS: u32 = 100;

const STRUGGLING_ATTEMPTS: u32 = 3;
const STRUGGLING_REACTION_MS: u64 = 5_000;
const CRUISING_ATTEMPTS: u32 = 2;
const CRUISING_REACTION_MS: u64 = 3_000;

#[allow(clippy::cast_possible_truncation)]
const MAX_STEPS: u8 = MAX_SEQUENCE_STEPS as u8;

/// Direction chosen after a round.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Adjustment {
    /// Shorter sequences, slower blinks.
    Easier,
    /// Longer sequences, faster blinks.
    Harder,
    Unchanged,
}

/// Current sequence length and LED on-time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Difficulty {
    steps: u8,
    blink_interval_ms: u32,
}

impl Difficulty {
    /// Builds a difficulty with both fields clamped to their supported ranges.
    #[must_use]
    pub fn new(steps: u8, blink_interval_ms: u32) -> Self {
        Self {
            steps: steps.clamp(MIN_SEQUENCE_STEPS, MAX_STEPS),
            blink_interval_ms: blink_interval_ms.clamp(MIN_BLINK_MS, MAX_BLINK_MS),
        }
    }

    #[must_use]
    pub const fn steps(self) -> u8 {
        self.steps
    }

    #[must_use]
    pub const fn blink_interval_ms(self) -> u32 {
        self.blink_interval_ms
    }

    #[must_use]
    pub fn blink_interval(self) -> Duration {
        Duration::from_millis(u64::from(self.blink_interval_ms))
    }

    /// Overrides the blink interval, clamped to the supported range.
    pub fn set_blink_interval_ms(&mut self, blink_interval_ms: u32) {
        self.blink_interval_ms = blink_interval_ms.clamp(MIN_BLINK_MS, MAX_BLINK_MS);
    }

    /// Applies an adjustment and returns `true` if either field moved.
    pub fn apply(&mut self, adjustment: Adjustment) -> bool {
        let before = *self;
        match adjustment {
            Adjustment::Easier => {
                self.steps = self.steps.saturating_sub(1).max(MIN_SEQUENCE_STEPS);
                self.blink_interval_ms = (self.blink_interval_ms + BLINK_STEP_MS).min(MAX_BLINK_MS);
            }
            Adjustment::Harder => {
                self.steps = self.steps.saturating_add(1).min(MAX_STEPS);
                self.blink_interval_ms = self
                    .blink_interval_ms
                    .saturating_sub(BLINK_STEP_MS)
                    .max(MIN_BLINK_MS);
            }
            Adjustment::Unchanged => {}
        }
        *self != before
    }
}

/// Picks the next adjustment from the retained history.
///
/// Struggling (mean attempts of at least 3 and mean reaction above 5 s) makes
/// the puzzle easier. Otherwise, a mean below 2 attempts or a mean reaction
/// under 3 s makes it harder. An empty history is treated as `base_steps`
/// attempts with no reaction time.
#[must_use]
pub fn assess<const N: usize>(history: &PerformanceHistory<N>, base_steps: u8) -> Adjustment {
    let (count, attempts, reaction_ms) = match history.totals() {
        Some(totals) => (totals.count, totals.attempts, totals.reaction_ms),
        None => (1, u32::from(base_steps), 0),
    };

    let struggling = attempts >= STRUGGLING_ATTEMPTS * count
        && reaction_ms > STRUGGLING_REACTION_MS * u64::from(count);
    if struggling {
        return Adjustment::Easier;
    }

    let cruising = attempts < CRUISING_ATTEMPTS * count
        || reaction_ms < CRUISING_REACTION_MS * u64::from(count);
    if cruising {
        return Adjustment::Harder;
    }

    Adjustment::Unchanged
}

#[cfg(test)]
mod tests {
    use super::super::history::PerformanceRecord;
    use super::*;

    fn history_of(records: &[(u8, u32)]) -> PerformanceHistory<5> {
        let mut history = PerformanceHistory::new();
        for &(attempts, reaction_ms) in records {
            history.push(PerformanceRecord::new(attempts, reaction_ms));
        }
        history
    }

    #[test]
    fn struggling_player_gets_easier_puzzles() {
        let history = history_of(&[(3, 6_000), (4, 5_500)]);
        assert_eq!(assess(&history, 4), Adjustment::Easier);
    }

    #[test]
    fn fast_or_accurate_player_gets_harder_puzzles() {
        assert_eq!(assess(&history_of(&[(1, 9_000)]), 4), Adjustment::Harder);
        assert_eq!(assess(&history_of(&[(5, 2_000)]), 4), Adjustment::Harder);
    }

    #[test]
    fn middling_player_keeps_difficulty() {
        // Mean of 2 attempts and exactly 5 s sits between both thresholds.
        let history = history_of(&[(2, 5_000), (2, 5_000)]);
        assert_eq!(assess(&history, 4), Adjustment::Unchanged);
    }

    #[test]
    fn thresholds_use_exact_means() {
        // Mean reaction of exactly 5.0 s is not "above 5 s".
        let history = history_of(&[(3, 5_000), (3, 5_000)]);
        assert_eq!(assess(&history, 4), Adjustment::Unchanged);
        // Mean attempts of 2.5 with mean reaction 5.0005 s is not struggling either.
        let history = history_of(&[(2, 5_001), (3, 5_000)]);
        assert_eq!(assess(&history, 4), Adjustment::Unchanged);
    }

    #[test]
    fn empty_history_uses_base_steps() {
        let history = PerformanceHistory::<5>::new();
        assert_eq!(assess(&history, 4), Adjustment::Harder);
    }

    #[test]
    fn adjustments_respect_bounds() {
        let mut difficulty = Difficulty::new(1, MAX_BLINK_MS);
        assert!(!difficulty.apply(Adjustment::Easier));
        assert_eq!(difficulty.steps(), MIN_SEQUENCE_STEPS);
        assert_eq!(difficulty.blink_interval_ms(), MAX_BLINK_MS);

        let mut difficulty = Difficulty::new(u8::MAX, 0);
        assert_eq!(difficulty.steps(), MAX_STEPS);
        assert_eq!(difficulty.blink_interval_ms(), MIN_BLINK_MS);
        assert!(!difficulty.apply(Adjustment::Harder));

        let mut difficulty = Difficulty::new(4, 1_000);
        assert!(difficulty.apply(Adjustment::Harder));
        assert_eq!((difficulty.steps(), difficulty.blink_interval_ms()), (5, 900));
        assert!(difficulty.apply(Adjustment::Easier));
        assert_eq!((difficulty.steps(), difficulty.blink_interval_ms()), (4, 1_000));
    }
}
