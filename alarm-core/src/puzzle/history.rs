//! Bounded record of recent puzzle rounds.

use heapless::{HistoryBuf, OldestOrdered};

/// Number of rounds considered when adapting difficulty.
pub const DEFAULT_HISTORY: usize = 5;

/// Outcome of one solved puzzle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PerformanceRecord {
    /// Attempts needed to solve, including the successful one.
    pub attempts: u8,
    /// Time from the start of input capture to the final press.
    pub reaction_ms: u32,
}

impl PerformanceRecord {
    #[must_use]
    pub const fn new(attempts: u8, reaction_ms: u32) -> Self {
        Self {
            attempts,
            reaction_ms,
        }
    }
}

/// Aggregate of the retained records, kept in integers so thresholds compare exactly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HistoryTotals {
    pub count: u32,
    pub attempts: u32,
    pub reaction_ms: u64,
}

/// Ring buffer of the most recent [`PerformanceRecord`]s.
pub struct PerformanceHistory<const N: usize = DEFAULT_HISTORY> {
    ring: HistoryBuf<PerformanceRecord, N>,
    total_recorded: u32,
}

impl<const N: usize> PerformanceHistory<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            total_recorded: 0,
        }
    }

    /// Appends a record, evicting the oldest one once the ring is full.
    pub fn push(&mut self, record: PerformanceRecord) {
        self.ring.write(record);
        self.total_recorded = self.total_recorded.saturating_add(1);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Total rounds ever recorded, including evicted ones.
    pub const fn total_recorded(&self) -> u32 {
        self.total_recorded
    }

    pub fn latest(&self) -> Option<&PerformanceRecord> {
        self.ring.recent()
    }

    pub fn oldest_first(&self) -> OldestOrdered<'_, PerformanceRecord> {
        self.ring.oldest_ordered()
    }

    /// Sums the retained records, or `None` when the history is empty.
    pub fn totals(&self) -> Option<HistoryTotals> {
        if self.ring.is_empty() {
            return None;
        }
        let mut totals = HistoryTotals {
            count: 0,
            attempts: 0,
            reaction_ms: 0,
        };
        for record in self.ring.as_slice() {
            totals.count += 1;
            totals.attempts += u32::from(record.attempts);
            totals.reaction_ms += u64::from(record.reaction_ms);
        }
        Some(totals)
    }
}

impl<const N: usize> Default for PerformanceHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}
