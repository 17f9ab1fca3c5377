mod board;
mod options;
mod transcript;

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant as HostInstant;

use alarm_core::console::{self, Command};
use alarm_core::orchestrator::{AlarmConfig, AlarmController, TelemetrySink};
use alarm_core::puzzle::PuzzleConfig;
use alarm_core::schedule::{PeriodicSchedule, ScheduleError, ScheduleFetcher, parse_schedule};
use alarm_core::telemetry::{PerformanceReport, TelemetryRecord};
use alarm_core::time::WallTime;
use embassy_futures::block_on;

use board::{HostBoard, Panel, SharedPanel};
use options::{Options, USAGE};
use transcript::{Output, Role};

/// Reads the schedule payload from a local file on every refresh.
struct FileFetcher {
    path: PathBuf,
}

impl ScheduleFetcher for FileFetcher {
    fn fetch(&mut self) -> Result<WallTime, ScheduleError> {
        let payload = fs::read_to_string(&self.path).map_err(|_| ScheduleError::Unavailable)?;
        parse_schedule(&payload)
    }
}

/// Prints reports and events; optionally appends reports to a JSON-lines file.
struct HostSink {
    output: Output,
    reports: Option<fs::File>,
}

impl HostSink {
    fn new(output: Output, report_file: Option<&PathBuf>) -> io::Result<Self> {
        let reports = report_file
            .map(|path| OpenOptions::new().create(true).append(true).open(path))
            .transpose()?;
        Ok(Self { output, reports })
    }
}

impl TelemetrySink for HostSink {
    type Error = io::Error;

    fn publish(&mut self, report: &PerformanceReport) -> Result<(), Self::Error> {
        self.output.emit(&format!("report {report}"));
        match &mut self.reports {
            Some(file) => writeln!(file, "{report}"),
            None => Ok(()),
        }
    }

    fn on_event(&mut self, record: &TelemetryRecord) {
        self.output.emit(&format!("telemetry {record}"));
    }
}

type HostController = AlarmController<HostBoard, HostSink, Option<PeriodicSchedule<FileFetcher>>>;

enum HostLine {
    Command(Command),
    Exit,
}

fn main() -> io::Result<()> {
    let options = Options::parse(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let output = Output::new(options.transcript.as_deref())?;
    let panel: SharedPanel = Arc::new(Mutex::new(Panel::default()));
    let mut controller = build_controller(&options, Arc::clone(&panel), output.clone())?;
    let lines = spawn_input_reader(panel, output.clone());

    output.emit("Puzzle alarm emulator ready. Type `help` for commands or `exit` to quit.");

    let interval = controller.config().service_interval;
    loop {
        loop {
            match lines.try_recv() {
                Ok(HostLine::Command(command)) => {
                    let mut reply = String::new();
                    controller
                        .execute(command, &mut reply)
                        .map_err(io::Error::other)?;
                    for line in reply.lines() {
                        output.emit(line);
                    }
                }
                Ok(HostLine::Exit) | Err(TryRecvError::Disconnected) => {
                    output.emit("Session closed.");
                    return Ok(());
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        block_on(controller.service());
        thread::sleep(interval);
    }
}

fn build_controller(
    options: &Options,
    panel: SharedPanel,
    output: Output,
) -> io::Result<HostController> {
    let mut config = AlarmConfig::DEFAULT;
    if let Some(base_steps) = options.base_steps {
        config = config.with_puzzle(PuzzleConfig {
            base_steps,
            ..config.puzzle
        });
    }

    let board = HostBoard::new(panel, options.utc_offset_minutes, output.clone());
    let sink = HostSink::new(output, options.report_file.as_ref())?;
    let schedule = options
        .schedule_file
        .clone()
        .map(|path| PeriodicSchedule::new(FileFetcher { path }));

    Ok(AlarmController::with_components(
        board,
        config,
        options.seed,
        sink,
        schedule,
    ))
}

/// Reads stdin on its own thread so presses land while an alarm is running.
///
/// Board requests (`press`, `clock`) are applied to the panel immediately;
/// everything else is queued for the controller loop.
fn spawn_input_reader(panel: SharedPanel, output: Output) -> Receiver<HostLine> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            output.record(Role::Host, trimmed);

            if should_terminate(trimmed) {
                break;
            }

            let now = HostInstant::now();
            let lock_panel = || panel.lock().unwrap_or_else(PoisonError::into_inner);
            match console::parse(trimmed) {
                Ok(Command::Press(channel)) => {
                    if lock_panel().press(channel, now) {
                        output.emit(&format!("press {channel}"));
                    } else {
                        output.emit(&format!("error: no button on channel {channel}"));
                    }
                }
                Ok(Command::Clock(time)) => {
                    lock_panel().set_clock(time, now);
                    match time {
                        Some(time) => output.emit(&format!("clock set to {time}")),
                        None => output.emit("clock follows system time"),
                    }
                }
                Ok(command) => {
                    if sender.send(HostLine::Command(command)).is_err() {
                        return;
                    }
                }
                Err(err) => output.emit(&format!("error: {err}")),
            }
        }
        let _ = sender.send(HostLine::Exit);
    });
    receiver
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
