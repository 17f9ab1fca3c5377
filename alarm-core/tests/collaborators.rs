mod support;

use core::cell::Cell;

use alarm_core::alarm::TriggerState;
use alarm_core::console::{self, Command};
use alarm_core::orchestrator::{AlarmBoard, AlarmConfig, AlarmController, TelemetrySink};
use alarm_core::schedule::{
    NoopScheduleSource, PeriodicSchedule, ScheduleError, ScheduleSource, parse_schedule,
};
use alarm_core::telemetry::{
    PerformanceReport, TelemetryEventKind, TelemetryPayload, TelemetryRecord,
};
use alarm_core::time::{Timebase, WallTime};
use embassy_futures::block_on;

use support::{Operator, SimBoard, hm};

/// Sink that fails every publish and keeps the events it observed.
#[derive(Default)]
struct FlakySink {
    published: usize,
    events: Vec<TelemetryEventKind>,
}

impl TelemetrySink for FlakySink {
    type Error = ();

    fn publish(&mut self, _: &PerformanceReport) -> Result<(), Self::Error> {
        self.published += 1;
        Err(())
    }

    fn on_event(&mut self, record: &TelemetryRecord) {
        self.events.push(record.event);
    }
}

fn tick<B, S, Q>(
    controller: &mut AlarmController<B, S, Q>,
    ticks: usize,
) -> Option<PerformanceReport>
where
    B: AlarmBoard,
    S: TelemetrySink,
    Q: ScheduleSource,
{
    block_on(async {
        for _ in 0..ticks {
            if let Some(report) = controller.service().await {
                return Some(report);
            }
            let interval = controller.config().service_interval;
            controller.board_mut().sleep(interval).await;
        }
        None
    })
}

#[test]
fn remote_schedule_arms_alarm_on_first_poll() {
    let payload = r#"{"hour": 7, "minute": 0}"#;
    let schedule = PeriodicSchedule::new(|| parse_schedule(payload));
    let board = SimBoard::new(Some(hm(6, 59)), Operator::default());
    let mut controller = AlarmController::<_, _, _>::with_components(
        board,
        AlarmConfig::DEFAULT,
        1,
        FlakySink::default(),
        schedule,
    );

    assert!(tick(&mut controller, 1).is_none());
    assert_eq!(controller.trigger_state(), TriggerState::Armed);
    assert_eq!(controller.snapshot().target, Some(hm(7, 0)));

    let report = tick(&mut controller, 120).expect("scheduled alarm fires");
    assert_eq!(report.attempts, 1);
}

#[test]
fn refetching_same_target_does_not_rearm_fired_alarm() {
    let fetches = Cell::new(0);
    let schedule = PeriodicSchedule::new(|| {
        fetches.set(fetches.get() + 1);
        Ok::<_, ScheduleError>(hm(7, 0))
    });
    let board = SimBoard::new(Some(hm(6, 59)), Operator::default());
    let mut controller = AlarmController::<_, _, _>::with_components(
        board,
        AlarmConfig::DEFAULT,
        1,
        FlakySink::default(),
        schedule,
    );

    tick(&mut controller, 120).expect("scheduled alarm fires");
    // Still inside 07:00 after a quick solve; the next refresh must not re-arm it.
    assert!(tick(&mut controller, 30).is_none());
    assert!(fetches.get() >= 2);
    assert_eq!(
        controller
            .sink()
            .events
            .iter()
            .filter(|&&event| event == TelemetryEventKind::AlarmScheduled)
            .count(),
        1
    );
}

#[test]
fn rejected_schedule_keeps_existing_alarm() {
    let schedule = PeriodicSchedule::new(|| parse_schedule(r#"{"hour": 31, "minute": 0}"#));
    let board = SimBoard::new(Some(hm(12, 0)), Operator::default());
    let mut controller = AlarmController::<_, _, _>::with_components(
        board,
        AlarmConfig::DEFAULT,
        1,
        FlakySink::default(),
        schedule,
    );
    controller.set_alarm(hm(6, 30));

    assert!(tick(&mut controller, 1).is_none());
    assert_eq!(controller.snapshot().target, Some(hm(6, 30)));
    let rejected = controller
        .telemetry()
        .latest()
        .copied()
        .expect("rejection recorded");
    assert_eq!(rejected.event, TelemetryEventKind::ScheduleRejected);
    assert_eq!(
        rejected.details,
        TelemetryPayload::Schedule(ScheduleError::OutOfRange {
            field: "hour",
            value: 31
        })
    );
}

#[test]
fn failed_publish_is_recorded_and_ignored() {
    let board = SimBoard::new(Some(hm(6, 59)), Operator::default());
    let mut controller = AlarmController::<_, _, _>::with_components(
        board,
        AlarmConfig::DEFAULT,
        1,
        FlakySink::default(),
        NoopScheduleSource,
    );
    controller.set_alarm(hm(7, 0));

    let report = tick(&mut controller, 120).expect("alarm fires");
    assert_eq!(controller.sink().published, 1);
    assert!(
        controller
            .sink()
            .events
            .contains(&TelemetryEventKind::ReportDropped)
    );
    assert_eq!(controller.snapshot().last_report, Some(report));
    assert_eq!(controller.engine().history().len(), 1);
}

#[test]
fn console_commands_drive_controller() {
    let board = SimBoard::new(Some(hm(6, 0)), Operator::default());
    let mut controller: AlarmController<SimBoard> =
        AlarmController::new(board, AlarmConfig::DEFAULT, 1);
    let mut out = String::new();

    let command = console::parse("alarm 06:45").expect("valid command");
    controller.execute(command, &mut out).expect("write");
    assert_eq!(out, "alarm set for 06:45\n");
    assert_eq!(controller.trigger_state(), TriggerState::Armed);

    out.clear();
    controller
        .execute(Command::Blink(5_000), &mut out)
        .expect("write");
    assert_eq!(out, "blink 2000ms\n");

    out.clear();
    controller.execute(Command::History, &mut out).expect("write");
    assert_eq!(out, "no rounds recorded\n");

    out.clear();
    controller.execute(Command::Status, &mut out).expect("write");
    assert!(out.starts_with("alarm trigger=armed target=06:45 clock=unset phase=idle\n"));
    assert!(out.contains("puzzle steps=4 blink=2000ms"));

    out.clear();
    controller
        .execute(console::parse(r#"{"hour":5,"minute":15}"#).expect("payload"), &mut out)
        .expect("write");
    assert_eq!(controller.snapshot().target, WallTime::new(5, 15).ok());

    out.clear();
    controller.execute(Command::Events, &mut out).expect("write");
    assert_eq!(out.lines().count(), 2);
    assert!(out.lines().all(|line| line.contains("alarm-scheduled")));

    out.clear();
    controller.execute(Command::Help(None), &mut out).expect("write");
    assert!(out.contains("press N"));

    out.clear();
    controller.execute(Command::Press(1), &mut out).expect("write");
    assert_eq!(out, "not supported on this target\n");
}
