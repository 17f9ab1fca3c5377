//! Alarm controller: trigger, warning, and the puzzle retry loop.
//!
//! [`AlarmController`] is the composition root. It owns the board, the
//! debounced input bank, the alarm trigger, the puzzle engine, and the
//! telemetry ring. Platforms call [`AlarmController::service`] once per
//! service interval; when the alarm fires, `service` runs the whole wake-up
//! flow before returning:
//!
//! ```text
//! Idle ─fire─► Warning ─press─► Displaying ─► Capturing ─► Comparing ─match─► Success ─► Idle
//!                                   ▲                          │
//!                                   └───────── Retry ◄─mismatch┘
//! ```
//!
//! The only suspension points are [`Timebase::sleep`] calls between input
//! polls and around tones, so the controller runs unchanged on an Embassy
//! executor, a host thread, or a simulated clock.

mod router;

use core::{convert::Infallible, fmt, time::Duration};

use crate::alarm::{AlarmTrigger, TriggerOutcome, TriggerState};
use crate::console::{Command, StatusFormatter, StatusSnapshot, catalog};
use crate::input::{ButtonLevels, ChannelId, DebouncedInput};
use crate::puzzle::{Adjustment, PuzzleConfig, PuzzleEngine};
use crate::schedule::{NoopScheduleSource, ScheduleSource};
use crate::telemetry::{
    PerformanceReport, TelemetryEventKind, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};
use crate::time::{Instant, Timebase, WallClock, WallTime};

pub use router::{InputRouter, RouteMode};

/// Number of buttons/LEDs on the reference board.
pub const DEFAULT_CHANNELS: usize = 4;

/// Set of LEDs lit together, one bit per channel.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: Self = Self(0);

    /// A set containing only `channel`; channels beyond 7 yield an empty set.
    #[must_use]
    pub const fn single(channel: ChannelId) -> Self {
        if channel < 8 {
            Self(1 << channel)
        } else {
            Self::EMPTY
        }
    }

    #[must_use]
    pub const fn contains(self, channel: ChannelId) -> bool {
        channel < 8 && self.0 & (1 << channel) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Buzzer tone request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tone {
    pub frequency_hz: u32,
    /// Loudness on a 0-255 scale.
    pub volume: u8,
    pub duration: Duration,
}

impl Tone {
    #[must_use]
    pub const fn new(frequency_hz: u32, volume: u8, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            volume,
            duration: Duration::from_millis(duration_ms),
        }
    }
}

/// LED output collaborator.
pub trait LedDisplay {
    /// Lights exactly the LEDs in `pattern`.
    fn set_pattern(&mut self, pattern: ChannelSet);

    /// Turns every LED off.
    fn clear(&mut self);
}

/// Buzzer collaborator. The controller times the tone with [`Timebase::sleep`].
pub trait Buzzer {
    fn tone_on(&mut self, tone: Tone);

    fn tone_off(&mut self);
}

/// Everything the controller needs from a board.
pub trait AlarmBoard: Timebase + WallClock + LedDisplay + Buzzer + ButtonLevels {}

impl<T> AlarmBoard for T where T: Timebase + WallClock + LedDisplay + Buzzer + ButtonLevels {}

/// Destination for performance reports and telemetry records.
pub trait TelemetrySink {
    type Error;

    /// Publishes a solved-puzzle report.
    ///
    /// # Errors
    ///
    /// Returns the sink's error when the report could not be delivered; the
    /// controller records the drop and carries on.
    fn publish(&mut self, report: &PerformanceReport) -> Result<(), Self::Error>;

    /// Observes every telemetry record as it is written.
    fn on_event(&mut self, _record: &TelemetryRecord) {}
}

/// Telemetry sink that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    type Error = Infallible;

    fn publish(&mut self, _: &PerformanceReport) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timing, tone, and puzzle parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AlarmConfig {
    pub debounce: Duration,
    /// Spacing between input polls while waiting for presses.
    pub poll_interval: Duration,
    /// Spacing between [`AlarmController::service`] calls.
    pub service_interval: Duration,
    pub warning_tone: Tone,
    /// Silent listening window after each warning tone.
    pub warning_gap: Duration,
    /// Pause between cancelling the warning and the first sequence.
    pub cancel_pause: Duration,
    /// Dark gap after each lit LED.
    pub blink_gap: Duration,
    /// Pause after comparing an attempt.
    pub compare_pause: Duration,
    pub success_tone: Tone,
    pub success_beeps: u8,
    pub success_gap: Duration,
    pub failure_tone: Tone,
    /// Pause after a solved puzzle before returning to idle.
    pub completion_pause: Duration,
    pub puzzle: PuzzleConfig,
}

impl AlarmConfig {
    pub const DEFAULT: Self = Self {
        debounce: crate::input::DEFAULT_DEBOUNCE,
        poll_interval: Duration::from_millis(10),
        service_interval: Duration::from_millis(1_000),
        warning_tone: Tone::new(500, 200, 1_000),
        warning_gap: Duration::from_millis(1_000),
        cancel_pause: Duration::from_millis(3_000),
        blink_gap: Duration::from_millis(300),
        compare_pause: Duration::from_millis(1_000),
        success_tone: Tone::new(1_000, 200, 300),
        success_beeps: 3,
        success_gap: Duration::from_millis(300),
        failure_tone: Tone::new(300, 200, 2_000),
        completion_pause: Duration::from_millis(3_000),
        puzzle: PuzzleConfig::DEFAULT,
    };

    #[must_use]
    pub const fn with_puzzle(mut self, puzzle: PuzzleConfig) -> Self {
        self.puzzle = puzzle;
        self
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub const fn with_service_interval(mut self, service_interval: Duration) -> Self {
        self.service_interval = service_interval;
        self
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Phase of the wake-up flow.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PuzzlePhase {
    Idle,
    Warning,
    Displaying,
    Capturing,
    Comparing,
    Success,
    Retry,
}

impl PuzzlePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PuzzlePhase::Idle => "idle",
            PuzzlePhase::Warning => "warning",
            PuzzlePhase::Displaying => "displaying",
            PuzzlePhase::Capturing => "capturing",
            PuzzlePhase::Comparing => "comparing",
            PuzzlePhase::Success => "success",
            PuzzlePhase::Retry => "retry",
        }
    }
}

impl fmt::Display for PuzzlePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composition root driving one board.
pub struct AlarmController<
    B,
    S = NoopTelemetrySink,
    Q = NoopScheduleSource,
    const N: usize = DEFAULT_CHANNELS,
> {
    board: B,
    config: AlarmConfig,
    input: DebouncedInput<InputRouter, N>,
    trigger: AlarmTrigger,
    engine: PuzzleEngine,
    telemetry: TelemetryRecorder,
    sink: S,
    schedule: Q,
    phase: PuzzlePhase,
    attempts: u8,
    clock: Option<WallTime>,
    clock_available: bool,
    last_report: Option<PerformanceReport>,
}

impl<B, const N: usize> AlarmController<B, NoopTelemetrySink, NoopScheduleSource, N>
where
    B: AlarmBoard,
{
    /// Creates a controller without telemetry or remote schedule.
    pub fn new(board: B, config: AlarmConfig, seed: u64) -> Self {
        Self::with_components(board, config, seed, NoopTelemetrySink, NoopScheduleSource)
    }
}

impl<B, S, Q, const N: usize> AlarmController<B, S, Q, N>
where
    B: AlarmBoard,
    S: TelemetrySink,
    Q: ScheduleSource,
{
    /// Creates a controller with explicit telemetry sink and schedule source.
    ///
    /// The puzzle uses one channel per button, so `config.puzzle.num_channels`
    /// is replaced by `N`.
    pub fn with_components(board: B, config: AlarmConfig, seed: u64, sink: S, schedule: Q) -> Self {
        let puzzle = PuzzleConfig {
            num_channels: u8::try_from(N).unwrap_or(u8::MAX),
            ..config.puzzle
        };
        Self {
            board,
            config,
            input: DebouncedInput::new(InputRouter::new(), config.debounce),
            trigger: AlarmTrigger::new(),
            engine: PuzzleEngine::seeded(puzzle, seed),
            telemetry: TelemetryRecorder::new(),
            sink,
            schedule,
            phase: PuzzlePhase::Idle,
            attempts: 0,
            clock: None,
            clock_available: true,
            last_report: None,
        }
    }

    /// Arms the alarm for `target`.
    pub fn set_alarm(&mut self, target: WallTime) {
        self.trigger.set_alarm(target);
        self.record(
            TelemetryEventKind::AlarmScheduled,
            TelemetryPayload::Target(target),
        );
    }

    /// Manual override of the LED on-time for the next displayed sequence.
    pub fn set_blink_interval(&mut self, blink_interval_ms: u32) {
        self.engine.set_blink_interval(blink_interval_ms);
    }

    /// Re-keys the puzzle's random source.
    pub fn reseed(&mut self, seed: u64) {
        self.engine.reseed(seed);
    }

    /// Delivers a synthetic button press to the input router.
    pub fn inject_press(&mut self, channel: ChannelId) -> bool {
        self.input.inject(channel)
    }

    /// One pass of the idle loop.
    ///
    /// Applies pending schedule updates, samples the buttons, and checks the
    /// alarm. When the alarm fires this runs the full wake-up flow and returns
    /// the resulting report.
    pub async fn service(&mut self) -> Option<PerformanceReport> {
        let now = self.board.now();
        self.apply_schedule_update(now);
        self.input.poll(&mut self.board, now);

        let sample = self.board.sample_local_time();
        if sample.is_some() {
            self.clock = sample;
        }
        let outcome = self.trigger.check_alarm(sample);
        self.track_clock(outcome);
        if !outcome.fired() {
            return None;
        }

        let target = self.trigger.target().unwrap_or(WallTime::MIDNIGHT);
        self.record(
            TelemetryEventKind::AlarmFired,
            TelemetryPayload::Target(target),
        );
        Some(self.run_alarm().await)
    }

    /// Sounds the warning until a press, then loops the puzzle until solved.
    pub async fn run_alarm(&mut self) -> PerformanceReport {
        self.warn_until_cancelled().await;
        self.record(TelemetryEventKind::WarningCancelled, TelemetryPayload::None);
        self.board.sleep(self.config.cancel_pause).await;

        self.attempts = 1;
        self.engine.generate_sequence();
        let reaction_ms = loop {
            self.display_sequence().await;
            let reaction_ms = self.capture_input().await;

            self.set_phase(PuzzlePhase::Comparing);
            let solved = self.input.handler().captured() == self.engine.sequence();
            self.board.sleep(self.config.compare_pause).await;
            if solved {
                break reaction_ms;
            }

            self.set_phase(PuzzlePhase::Retry);
            self.record(
                TelemetryEventKind::AttemptFailed,
                TelemetryPayload::Attempt(self.attempts),
            );
            self.notify(self.config.failure_tone).await;
            self.attempts = self.attempts.saturating_add(1);
            self.engine.generate_sequence();
        };

        self.set_phase(PuzzlePhase::Success);
        for _ in 0..self.config.success_beeps {
            self.notify(self.config.success_tone).await;
            self.board.sleep(self.config.success_gap).await;
        }

        let report = self.finish_round(reaction_ms);
        self.board.sleep(self.config.completion_pause).await;
        self.attempts = 0;
        self.set_phase(PuzzlePhase::Idle);
        report
    }

    /// Runs a parsed console command and writes its response.
    ///
    /// `press` and `clock` are board concerns; platforms that support them
    /// handle them before calling this.
    ///
    /// # Errors
    ///
    /// Propagates failures from `out`.
    pub fn execute<W: fmt::Write>(&mut self, command: Command, out: &mut W) -> fmt::Result {
        match command {
            Command::Alarm(target) | Command::Schedule(target) => {
                self.set_alarm(target);
                writeln!(out, "alarm set for {target}")
            }
            Command::Blink(blink_interval_ms) => {
                self.set_blink_interval(blink_interval_ms);
                writeln!(out, "blink {}ms", self.engine.blink_interval_ms())
            }
            Command::Status => writeln!(out, "{}", StatusFormatter::new(&self.snapshot())),
            Command::History => {
                if self.engine.history().is_empty() {
                    return writeln!(out, "no rounds recorded");
                }
                for record in self.engine.history().oldest_first() {
                    writeln!(
                        out,
                        "attempts={} reaction={}ms",
                        record.attempts, record.reaction_ms
                    )?;
                }
                Ok(())
            }
            Command::Events => {
                for record in self.telemetry.oldest_first() {
                    writeln!(out, "{record}")?;
                }
                Ok(())
            }
            Command::Help(topic) => catalog::write_help(out, topic),
            Command::Press(_) | Command::Clock(_) => {
                writeln!(out, "not supported on this target")
            }
        }
    }

    /// Captures the controller state for status reporting.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            trigger: self.trigger.state(),
            target: self.trigger.target(),
            clock: self.clock,
            steps: self.engine.current_steps(),
            blink_interval_ms: self.engine.blink_interval_ms(),
            attempts: self.attempts,
            history_len: u8::try_from(self.engine.history().len()).unwrap_or(u8::MAX),
            rounds_solved: self.engine.history().total_recorded(),
            last_report: self.last_report,
        }
    }

    pub fn phase(&self) -> PuzzlePhase {
        self.phase
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger.state()
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    pub fn engine(&self) -> &PuzzleEngine {
        &self.engine
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn schedule_mut(&mut self) -> &mut Q {
        &mut self.schedule
    }

    async fn warn_until_cancelled(&mut self) {
        self.set_phase(PuzzlePhase::Warning);
        self.input.handler_mut().arm_cancel();
        loop {
            let tone = self.config.warning_tone;
            self.board.tone_on(tone);
            let cancelled = self.listen_for(tone.duration).await;
            self.board.tone_off();
            if cancelled || self.listen_for(self.config.warning_gap).await {
                break;
            }
        }
        self.input.handler_mut().disarm();
    }

    /// Polls input until a cancel press arrives or `window` elapses.
    async fn listen_for(&mut self, window: Duration) -> bool {
        let started = self.board.now();
        loop {
            let now = self.board.now();
            self.input.poll(&mut self.board, now);
            if self.input.handler().cancel_requested() {
                return true;
            }
            if now.saturating_duration_since(started) >= window {
                return false;
            }
            self.board.sleep(self.config.poll_interval).await;
        }
    }

    async fn display_sequence(&mut self) {
        self.set_phase(PuzzlePhase::Displaying);
        let blink = self.engine.blink_interval();
        for index in 0..self.engine.sequence().len() {
            let channel = self.engine.sequence()[index];
            self.board.set_pattern(ChannelSet::single(channel));
            self.board.sleep(blink).await;
            self.board.clear();
            self.board.sleep(self.config.blink_gap).await;
        }
    }

    /// Collects one press per sequence element and returns the elapsed milliseconds.
    async fn capture_input(&mut self) -> u32 {
        self.set_phase(PuzzlePhase::Capturing);
        let expected = self.engine.sequence().len();
        self.input.handler_mut().begin_capture(expected);

        let started = self.board.now();
        let finished = loop {
            let now = self.board.now();
            self.input.poll(&mut self.board, now);
            if self.input.handler().is_complete() {
                break now;
            }
            self.board.sleep(self.config.poll_interval).await;
        };
        self.input.handler_mut().disarm();

        let elapsed = finished.saturating_duration_since(started).as_millis();
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }

    async fn notify(&mut self, tone: Tone) {
        self.board.tone_on(tone);
        self.board.sleep(tone.duration).await;
        self.board.tone_off();
    }

    fn finish_round(&mut self, reaction_ms: u32) -> PerformanceReport {
        let adjustment = self.engine.record_performance(self.attempts, reaction_ms);
        let report = PerformanceReport::new(self.board.now(), self.attempts, reaction_ms);
        self.record(
            TelemetryEventKind::PuzzleSolved,
            TelemetryPayload::Report(report),
        );
        if adjustment != Adjustment::Unchanged {
            self.record(
                TelemetryEventKind::DifficultyChanged,
                TelemetryPayload::Difficulty {
                    steps: self.engine.current_steps(),
                    blink_interval_ms: self.engine.blink_interval_ms(),
                },
            );
        }
        if self.sink.publish(&report).is_err() {
            self.record(TelemetryEventKind::ReportDropped, TelemetryPayload::Report(report));
        }
        self.last_report = Some(report);
        report
    }

    fn apply_schedule_update(&mut self, now: Instant) {
        match self.schedule.poll_update(now) {
            // Re-applying the current target would clear the fire latch mid-minute.
            Some(Ok(target)) if self.trigger.target() == Some(target) => {}
            Some(Ok(target)) => self.set_alarm(target),
            Some(Err(error)) => self.record(
                TelemetryEventKind::ScheduleRejected,
                TelemetryPayload::Schedule(error),
            ),
            None => {}
        }
    }

    fn track_clock(&mut self, outcome: TriggerOutcome) {
        match outcome {
            TriggerOutcome::ClockUnavailable => {
                if self.clock_available {
                    self.clock_available = false;
                    self.record(TelemetryEventKind::ClockUnavailable, TelemetryPayload::None);
                }
            }
            TriggerOutcome::Unset => {}
            _ => self.clock_available = true,
        }
    }

    fn set_phase(&mut self, phase: PuzzlePhase) {
        self.phase = phase;
    }

    fn record(&mut self, event: TelemetryEventKind, details: TelemetryPayload) {
        let record = self.telemetry.record(event, details, self.board.now());
        self.sink.on_event(&record);
    }
}
