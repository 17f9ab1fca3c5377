//! Adaptive memory-sequence puzzle.
//!
//! [`PuzzleEngine`] owns the random source, the current [`Difficulty`], and a
//! bounded [`PerformanceHistory`]. Each solved round is recorded and the
//! difficulty for the next round is re-derived from the retained history.

pub mod difficulty;
pub mod history;

use core::time::Duration;

use heapless::Vec;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use difficulty::{
    Adjustment, BLINK_STEP_MS, Difficulty, MAX_BLINK_MS, MAX_SEQUENCE_STEPS, MIN_BLINK_MS,
    MIN_SEQUENCE_STEPS,
};
pub use history::{DEFAULT_HISTORY, PerformanceHistory, PerformanceRecord};

/// Sequence of channel indices shown to the player.
pub type Sequence = Vec<u8, MAX_SEQUENCE_STEPS>;

/// Largest channel count a [`crate::orchestrator::ChannelSet`] can address.
pub const MAX_CHANNELS: u8 = 8;

/// Static parameters of a puzzle engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PuzzleConfig {
    /// Number of distinct LEDs/buttons; sequence values fall in `0..num_channels`.
    pub num_channels: u8,
    /// Starting sequence length.
    pub base_steps: u8,
    /// Starting LED on-time in milliseconds.
    pub blink_interval_ms: u32,
}

impl PuzzleConfig {
    pub const DEFAULT: Self = Self {
        num_channels: 4,
        base_steps: 4,
        blink_interval_ms: 1_000,
    };
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sequence generator with performance-driven difficulty.
pub struct PuzzleEngine<R = ChaCha8Rng, const H: usize = DEFAULT_HISTORY> {
    rng: R,
    num_channels: u8,
    base_steps: u8,
    difficulty: Difficulty,
    history: PerformanceHistory<H>,
    sequence: Sequence,
}

impl<const H: usize> PuzzleEngine<ChaCha8Rng, H> {
    /// Builds an engine backed by a ChaCha8 generator keyed from `seed`.
    #[must_use]
    pub fn seeded(config: PuzzleConfig, seed: u64) -> Self {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R, const H: usize> PuzzleEngine<R, H>
where
    R: RngCore,
{
    /// Builds an engine; the channel count is clamped to `1..=MAX_CHANNELS`.
    pub fn new(config: PuzzleConfig, rng: R) -> Self {
        Self {
            rng,
            num_channels: config.num_channels.clamp(1, MAX_CHANNELS),
            base_steps: config.base_steps,
            difficulty: Difficulty::new(config.base_steps, config.blink_interval_ms),
            history: PerformanceHistory::new(),
            sequence: Sequence::new(),
        }
    }

    /// Replaces the live sequence with `current_steps` uniformly drawn channels.
    ///
    /// The returned slice borrows the engine's only sequence buffer; the next
    /// call overwrites it.
    pub fn generate_sequence(&mut self) -> &[u8] {
        self.sequence.clear();
        for _ in 0..self.difficulty.steps() {
            let channel = self.rng.gen_range(0..self.num_channels);
            // Steps never exceed MAX_SEQUENCE_STEPS.
            let _ = self.sequence.push(channel);
        }
        &self.sequence
    }

    /// The sequence produced by the last [`Self::generate_sequence`] call.
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Stores a solved round and re-derives the difficulty for the next one.
    pub fn record_performance(&mut self, attempts: u8, reaction_time_ms: u32) -> Adjustment {
        self.history
            .push(PerformanceRecord::new(attempts, reaction_time_ms));
        let adjustment = difficulty::assess(&self.history, self.base_steps);
        if self.difficulty.apply(adjustment) {
            adjustment
        } else {
            Adjustment::Unchanged
        }
    }

    pub fn current_steps(&self) -> u8 {
        self.difficulty.steps()
    }

    pub fn blink_interval_ms(&self) -> u32 {
        self.difficulty.blink_interval_ms()
    }

    pub fn blink_interval(&self) -> Duration {
        self.difficulty.blink_interval()
    }

    /// Manual blink override, clamped to the supported range.
    pub fn set_blink_interval(&mut self, blink_interval_ms: u32) {
        self.difficulty.set_blink_interval_ms(blink_interval_ms);
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn history(&self) -> &PerformanceHistory<H> {
        &self.history
    }

    pub fn base_steps(&self) -> u8 {
        self.base_steps
    }

    pub fn num_channels(&self) -> u8 {
        self.num_channels
    }
}

impl<R, const H: usize> PuzzleEngine<R, H>
where
    R: RngCore + SeedableRng,
{
    /// Re-keys the random source.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(seed: u64) -> PuzzleEngine {
        PuzzleEngine::seeded(PuzzleConfig::DEFAULT, seed)
    }

    #[test]
    fn sequence_matches_current_steps_and_channel_range() {
        let mut engine = engine(7);
        for _ in 0..32 {
            let steps = usize::from(engine.current_steps());
            let sequence = engine.generate_sequence();
            assert_eq!(sequence.len(), steps);
            assert!(sequence.iter().all(|&channel| channel < 4));
            engine.record_performance(1, 500);
        }
        assert_eq!(usize::from(engine.current_steps()), MAX_SEQUENCE_STEPS);
    }

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut first = engine(42);
        let mut second = engine(42);
        let a: Sequence = first.generate_sequence().iter().copied().collect();
        assert_eq!(a.as_slice(), second.generate_sequence());

        second.reseed(42);
        first.reseed(42);
        let a: Sequence = first.generate_sequence().iter().copied().collect();
        assert_eq!(a.as_slice(), second.generate_sequence());
    }

    #[test]
    fn poor_runs_step_down_to_the_floor() {
        let mut engine = engine(1);
        for _ in 0..12 {
            let steps = engine.current_steps();
            let blink = engine.blink_interval_ms();
            engine.record_performance(5, 8_000);
            assert_eq!(
                engine.current_steps(),
                steps.saturating_sub(1).max(MIN_SEQUENCE_STEPS)
            );
            assert_eq!(
                engine.blink_interval_ms(),
                (blink + BLINK_STEP_MS).min(MAX_BLINK_MS)
            );
        }
        assert_eq!(engine.current_steps(), MIN_SEQUENCE_STEPS);
        assert_eq!(engine.blink_interval_ms(), MAX_BLINK_MS);
    }

    #[test]
    fn excellent_runs_step_up_to_the_cap() {
        let mut engine = engine(1);
        let max_steps = u8::try_from(MAX_SEQUENCE_STEPS).expect("cap fits in u8");
        for _ in 0..16 {
            let steps = engine.current_steps();
            let blink = engine.blink_interval_ms();
            engine.record_performance(1, 1_000);
            assert_eq!(engine.current_steps(), (steps + 1).min(max_steps));
            assert_eq!(
                engine.blink_interval_ms(),
                blink.saturating_sub(BLINK_STEP_MS).max(MIN_BLINK_MS)
            );
        }
        assert_eq!(engine.current_steps(), max_steps);
        assert_eq!(engine.blink_interval_ms(), MIN_BLINK_MS);
    }

    #[test]
    fn recording_reports_applied_adjustment() {
        let mut engine = engine(3);
        assert_eq!(engine.record_performance(1, 1_000), Adjustment::Harder);
        assert_eq!((engine.current_steps(), engine.blink_interval_ms()), (5, 900));
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn manual_blink_override_is_clamped() {
        let mut engine = engine(3);
        engine.set_blink_interval(50);
        assert_eq!(engine.blink_interval_ms(), MIN_BLINK_MS);
        engine.set_blink_interval(1_500);
        assert_eq!(engine.blink_interval(), Duration::from_millis(1_500));
        engine.set_blink_interval(10_000);
        assert_eq!(engine.blink_interval_ms(), MAX_BLINK_MS);
    }

    #[test]
    fn zero_channels_is_treated_as_one() {
        let config = PuzzleConfig {
            num_channels: 0,
            ..PuzzleConfig::DEFAULT
        };
        let mut engine = PuzzleEngine::<_, 5>::seeded(config, 9);
        assert!(engine.generate_sequence().iter().all(|&channel| channel == 0));
    }
}
