#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Queues between the console task and the alarm task.
//!
//! The console task parses lines and forwards controller commands and
//! schedule payloads; the alarm task answers through the outbound line queue.
//! Board-level requests (`press`, `clock`) never cross the queue: they go
//! straight to [`crate::status`] so they take effect while an alarm is
//! sounding.

use core::fmt::{self, Write as _};

use alarm_core::console::Command;
use alarm_core::orchestrator::TelemetrySink;
use alarm_core::schedule::{ScheduleError, ScheduleSource};
use alarm_core::telemetry::{PerformanceReport, TelemetryEventKind, TelemetryRecord};
use alarm_core::time::{Instant, WallTime};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use heapless::String;

use crate::console::{CommandDispatcher, DispatchError};
use crate::status;

#[cfg(target_os = "none")]
type LinkMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type LinkMutex = NoopRawMutex;

/// Depth of the console → alarm command queue.
pub const COMMAND_QUEUE_DEPTH: usize = 4;
/// Depth of the schedule payload queue.
pub const SCHEDULE_QUEUE_DEPTH: usize = 2;
/// Depth of the outbound line queue.
pub const OUTBOUND_QUEUE_DEPTH: usize = 16;
/// Longest line sent to the host (excluding the line terminator).
pub const LINE_CAPACITY: usize = 96;

pub type OutboundLine = String<LINE_CAPACITY>;
pub type ScheduleUpdate = Result<WallTime, ScheduleError>;

pub type CommandQueue = Channel<LinkMutex, Command, COMMAND_QUEUE_DEPTH>;
pub type CommandSender<'a> = Sender<'a, LinkMutex, Command, COMMAND_QUEUE_DEPTH>;
pub type CommandReceiver<'a> = Receiver<'a, LinkMutex, Command, COMMAND_QUEUE_DEPTH>;

pub type ScheduleQueue = Channel<LinkMutex, ScheduleUpdate, SCHEDULE_QUEUE_DEPTH>;
pub type ScheduleSender<'a> = Sender<'a, LinkMutex, ScheduleUpdate, SCHEDULE_QUEUE_DEPTH>;
pub type ScheduleReceiver<'a> = Receiver<'a, LinkMutex, ScheduleUpdate, SCHEDULE_QUEUE_DEPTH>;

pub type OutboundQueue = Channel<LinkMutex, OutboundLine, OUTBOUND_QUEUE_DEPTH>;
pub type OutboundSender<'a> = Sender<'a, LinkMutex, OutboundLine, OUTBOUND_QUEUE_DEPTH>;
pub type OutboundReceiver<'a> = Receiver<'a, LinkMutex, OutboundLine, OUTBOUND_QUEUE_DEPTH>;

/// Failure to hand a line to the USB task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkError {
    /// The outbound queue is full (host not reading).
    QueueFull,
    /// The rendered line exceeded [`LINE_CAPACITY`].
    LineOverflow,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::QueueFull => f.write_str("outbound queue full"),
            LinkError::LineOverflow => f.write_str("line too long"),
        }
    }
}

fn send_line(sender: &OutboundSender<'_>, line: OutboundLine) -> Result<(), LinkError> {
    match sender.try_send(line) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => Err(LinkError::QueueFull),
    }
}

/// Renders `value` into a single outbound line.
pub fn render_line(value: impl fmt::Display) -> Result<OutboundLine, LinkError> {
    let mut line = OutboundLine::new();
    write!(line, "{value}").map_err(|_| LinkError::LineOverflow)?;
    Ok(line)
}

/// `fmt::Write` adapter that splits controller output into outbound lines.
///
/// Lines that do not fit are truncated; lines that do not fit in the queue
/// are dropped and counted.
pub struct LineWriter<'a, 'q> {
    sender: &'a OutboundSender<'q>,
    line: OutboundLine,
    dropped: usize,
}

impl<'a, 'q> LineWriter<'a, 'q> {
    pub fn new(sender: &'a OutboundSender<'q>) -> Self {
        Self {
            sender,
            line: OutboundLine::new(),
            dropped: 0,
        }
    }

    fn flush_line(&mut self) {
        let line = core::mem::take(&mut self.line);
        if send_line(self.sender, line).is_err() {
            self.dropped += 1;
        }
    }

    /// Sends any unterminated text and returns the number of dropped lines.
    pub fn finish(mut self) -> usize {
        if !self.line.is_empty() {
            self.flush_line();
        }
        self.dropped
    }
}

impl fmt::Write for LineWriter<'_, '_> {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        for ch in text.chars() {
            if ch == '\n' {
                self.flush_line();
            } else {
                // Overlong lines are truncated rather than failing the command.
                let _ = self.line.push(ch);
            }
        }
        Ok(())
    }
}

/// Publishes reports as JSON lines on the console link.
pub struct ChannelTelemetrySink<'q> {
    sender: OutboundSender<'q>,
}

impl<'q> ChannelTelemetrySink<'q> {
    pub fn new(sender: OutboundSender<'q>) -> Self {
        Self { sender }
    }
}

impl TelemetrySink for ChannelTelemetrySink<'_> {
    type Error = LinkError;

    fn publish(&mut self, report: &PerformanceReport) -> Result<(), Self::Error> {
        send_line(&self.sender, render_line(report)?)
    }

    fn on_event(&mut self, record: &TelemetryRecord) {
        match record.event {
            TelemetryEventKind::AlarmFired => status::set_alarm_active(true),
            TelemetryEventKind::PuzzleSolved => status::set_alarm_active(false),
            _ => {}
        }
        log_record(record);
    }
}

/// Schedule source fed by JSON payloads pasted on the console.
pub struct ChannelScheduleSource<'q> {
    receiver: ScheduleReceiver<'q>,
}

impl<'q> ChannelScheduleSource<'q> {
    pub fn new(receiver: ScheduleReceiver<'q>) -> Self {
        Self { receiver }
    }
}

impl ScheduleSource for ChannelScheduleSource<'_> {
    fn poll_update(&mut self, _: Instant) -> Option<ScheduleUpdate> {
        self.receiver.try_receive().ok()
    }
}

/// Routes parsed console lines to the status cells or the alarm task.
pub struct LinkDispatcher<'q, C>
where
    C: Fn() -> u64,
{
    commands: CommandSender<'q>,
    schedule: ScheduleSender<'q>,
    outbound: OutboundSender<'q>,
    channels: u8,
    uptime_ms: C,
}

impl<'q, C> LinkDispatcher<'q, C>
where
    C: Fn() -> u64,
{
    /// Creates a dispatcher; `uptime_ms` anchors the manual clock.
    pub fn new(
        commands: CommandSender<'q>,
        schedule: ScheduleSender<'q>,
        outbound: OutboundSender<'q>,
        channels: u8,
        uptime_ms: C,
    ) -> Self {
        Self {
            commands,
            schedule,
            outbound,
            channels,
            uptime_ms,
        }
    }

    fn reply(&self, value: impl fmt::Display) {
        if let Ok(line) = render_line(value) {
            let _ = send_line(&self.outbound, line);
        }
    }

    fn forward(&self, command: Command) -> Result<(), DispatchError> {
        match self.commands.try_send(command) {
            Ok(()) => {
                if status::alarm_active() {
                    self.reply("alarm active; command queued until solved");
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DispatchError::Busy),
        }
    }
}

impl<C> CommandDispatcher for LinkDispatcher<'_, C>
where
    C: Fn() -> u64,
{
    fn dispatch(&mut self, command: Command) -> Result<(), DispatchError> {
        match command {
            Command::Press(channel) => {
                if channel >= self.channels || !status::request_press(channel) {
                    return Err(DispatchError::Unsupported);
                }
                self.reply(format_args!("press {channel}"));
                Ok(())
            }
            Command::Clock(time) => {
                status::set_clock(time, (self.uptime_ms)());
                match time {
                    Some(time) => self.reply(format_args!("clock set to {time}")),
                    None => self.reply("clock cleared"),
                }
                Ok(())
            }
            other => self.forward(other),
        }
    }

    fn schedule(&mut self, update: ScheduleUpdate) -> Result<(), DispatchError> {
        match self.schedule.try_send(update) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DispatchError::Busy),
        }
    }
}

#[cfg(target_os = "none")]
fn log_record(record: &TelemetryRecord) {
    if record.event.is_warning() {
        defmt::warn!(
            "telemetry {=u16:#06x} {}",
            record.event.to_raw(),
            defmt::Display2Format(record)
        );
    } else {
        defmt::info!(
            "telemetry {=u16:#06x} {}",
            record.event.to_raw(),
            defmt::Display2Format(record)
        );
    }
}

#[cfg(not(target_os = "none"))]
fn log_record(record: &TelemetryRecord) {
    println!("telemetry {record}");
}
