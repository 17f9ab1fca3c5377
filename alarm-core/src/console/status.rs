//! Status surface shared by the firmware console and the emulator.

use core::fmt;

use crate::alarm::TriggerState;
use crate::orchestrator::PuzzlePhase;
use crate::telemetry::PerformanceReport;
use crate::time::WallTime;

/// Point-in-time view of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub phase: PuzzlePhase,
    pub trigger: TriggerState,
    pub target: Option<WallTime>,
    pub clock: Option<WallTime>,
    pub steps: u8,
    pub blink_interval_ms: u32,
    /// Attempts spent on the puzzle currently in progress.
    pub attempts: u8,
    pub history_len: u8,
    pub rounds_solved: u32,
    pub last_report: Option<PerformanceReport>,
}

/// Renders a [`StatusSnapshot`] as console lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the alarm line (e.g. `alarm trigger=armed target=06:45 clock=06:44 phase=idle`).
    ///
    /// # Errors
    ///
    /// Propagates failures from `writer`.
    pub fn write_alarm_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "alarm trigger={}", self.snapshot.trigger.as_str())?;
        writer.write_str(" target=")?;
        write_time(writer, self.snapshot.target)?;
        writer.write_str(" clock=")?;
        write_time(writer, self.snapshot.clock)?;
        write!(writer, " phase={}", self.snapshot.phase)
    }

    /// Writes the puzzle line (e.g. `puzzle steps=4 blink=1000ms attempts=0 history=2 solved=2`).
    ///
    /// # Errors
    ///
    /// Propagates failures from `writer`.
    pub fn write_puzzle_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "puzzle steps={} blink={}ms attempts={} history={} solved={}",
            self.snapshot.steps,
            self.snapshot.blink_interval_ms,
            self.snapshot.attempts,
            self.snapshot.history_len,
            self.snapshot.rounds_solved
        )
    }

    /// Writes the last performance report, or `last none`.
    ///
    /// # Errors
    ///
    /// Propagates failures from `writer`.
    pub fn write_report_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        match self.snapshot.last_report {
            Some(report) => write!(writer, "last {report}"),
            None => writer.write_str("last none"),
        }
    }
}

impl fmt::Display for StatusFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_alarm_line(f)?;
        f.write_str("\n")?;
        self.write_puzzle_line(f)?;
        f.write_str("\n")?;
        self.write_report_line(f)
    }
}

fn write_time<W: fmt::Write>(writer: &mut W, time: Option<WallTime>) -> fmt::Result {
    match time {
        Some(time) => write!(writer, "{time}"),
        None => writer.write_str("unset"),
    }
}
