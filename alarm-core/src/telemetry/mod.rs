//! Telemetry event catalog, performance reports, and the in-memory event ring.
//!
//! Event kinds encode to compact numeric codes so firmware can mirror them over
//! the diagnostics console without formatting strings on the hot path. Records
//! are kept in a fixed-size ring; the oldest entry is overwritten once full.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::schedule::ScheduleError;
use crate::time::{Instant, WallTime};

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated telemetry events emitted by the alarm controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    AlarmScheduled,
    AlarmFired,
    WarningCancelled,
    AttemptFailed,
    PuzzleSolved,
    DifficultyChanged,
    ScheduleRejected,
    ReportDropped,
    ClockUnavailable,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::AlarmScheduled => f.write_str("alarm-scheduled"),
            TelemetryEventKind::AlarmFired => f.write_str("alarm-fired"),
            TelemetryEventKind::WarningCancelled => f.write_str("warning-cancelled"),
            TelemetryEventKind::AttemptFailed => f.write_str("attempt-failed"),
            TelemetryEventKind::PuzzleSolved => f.write_str("puzzle-solved"),
            TelemetryEventKind::DifficultyChanged => f.write_str("difficulty-changed"),
            TelemetryEventKind::ScheduleRejected => f.write_str("schedule-rejected"),
            TelemetryEventKind::ReportDropped => f.write_str("report-dropped"),
            TelemetryEventKind::ClockUnavailable => f.write_str("clock-unavailable"),
        }
    }
}

impl TelemetryEventKind {
    const ALARM_SCHEDULED_CODE: u16 = 0x0001;
    const ALARM_FIRED_CODE: u16 = 0x0002;
    const WARNING_CANCELLED_CODE: u16 = 0x0003;
    const ATTEMPT_FAILED_CODE: u16 = 0x0010;
    const PUZZLE_SOLVED_CODE: u16 = 0x0011;
    const DIFFICULTY_CHANGED_CODE: u16 = 0x0012;
    const SCHEDULE_REJECTED_CODE: u16 = 0x0020;
    const REPORT_DROPPED_CODE: u16 = 0x0021;
    const CLOCK_UNAVAILABLE_CODE: u16 = 0x0022;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::AlarmScheduled => Self::ALARM_SCHEDULED_CODE,
            TelemetryEventKind::AlarmFired => Self::ALARM_FIRED_CODE,
            TelemetryEventKind::WarningCancelled => Self::WARNING_CANCELLED_CODE,
            TelemetryEventKind::AttemptFailed => Self::ATTEMPT_FAILED_CODE,
            TelemetryEventKind::PuzzleSolved => Self::PUZZLE_SOLVED_CODE,
            TelemetryEventKind::DifficultyChanged => Self::DIFFICULTY_CHANGED_CODE,
            TelemetryEventKind::ScheduleRejected => Self::SCHEDULE_REJECTED_CODE,
            TelemetryEventKind::ReportDropped => Self::REPORT_DROPPED_CODE,
            TelemetryEventKind::ClockUnavailable => Self::CLOCK_UNAVAILABLE_CODE,
        }
    }

    /// Returns `true` for events that describe a degraded collaborator.
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(
            self,
            TelemetryEventKind::ScheduleRejected
                | TelemetryEventKind::ReportDropped
                | TelemetryEventKind::ClockUnavailable
        )
    }
}

/// Result of one solved puzzle, as published to the telemetry sink.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PerformanceReport {
    pub timestamp: Instant,
    pub attempts: u8,
    pub reaction_ms: u32,
}

impl PerformanceReport {
    #[must_use]
    pub const fn new(timestamp: Instant, attempts: u8, reaction_ms: u32) -> Self {
        Self {
            timestamp,
            attempts,
            reaction_ms,
        }
    }
}

impl fmt::Display for PerformanceReport {
    /// Renders the JSON object accepted by the performance upload endpoint.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"timestamp\":{},\"attempts\":{},\"reactionTimeMs\":{}}}",
            self.timestamp.as_millis(),
            self.attempts,
            self.reaction_ms
        )
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Alarm target that was scheduled or fired.
    Target(WallTime),
    /// Attempt counter after a failed comparison.
    Attempt(u8),
    /// Report for a solved puzzle.
    Report(PerformanceReport),
    /// Difficulty that takes effect for the next round.
    Difficulty { steps: u8, blink_interval_ms: u32 },
    /// Reason a schedule update was discarded.
    Schedule(ScheduleError),
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Target(time) => write!(f, " target={time}"),
            TelemetryPayload::Attempt(attempt) => write!(f, " attempt={attempt}"),
            TelemetryPayload::Report(report) => write!(f, " {report}"),
            TelemetryPayload::Difficulty {
                steps,
                blink_interval_ms,
            } => write!(f, " steps={steps} blink={blink_interval_ms}ms"),
            TelemetryPayload::Schedule(error) => write!(f, " error=\"{error}\""),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Instant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} t={} {}{}",
            self.id, self.timestamp, self.event, self.details
        )
    }
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an event and returns a copy of the stored record.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        timestamp: Instant,
    ) -> TelemetryRecord {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        let record = TelemetryRecord {
            id,
            timestamp,
            event,
            details,
        };
        self.ring.write(record);
        record
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
