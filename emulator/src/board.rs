//! Terminal board: LEDs and buzzer are printed, buttons are typed.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant as HostInstant, SystemTime, UNIX_EPOCH};

use alarm_core::input::{ButtonLevels, ChannelId, Level};
use alarm_core::orchestrator::{Buzzer, ChannelSet, DEFAULT_CHANNELS, LedDisplay, Tone};
use alarm_core::time::{Instant, MINUTES_PER_DAY, Timebase, WallClock, WallTime};

use crate::transcript::Output;

/// How long a typed `press N` holds the button down.
pub const PRESS_HOLD: Duration = Duration::from_millis(50);

/// State written by the input thread and sampled by the board.
#[derive(Debug, Default)]
pub struct Panel {
    pressed_until: [Option<HostInstant>; DEFAULT_CHANNELS],
    manual_clock: Option<(WallTime, HostInstant)>,
}

impl Panel {
    /// Holds `channel` down for [`PRESS_HOLD`]; returns `false` for unknown channels.
    pub fn press(&mut self, channel: ChannelId, now: HostInstant) -> bool {
        match self.pressed_until.get_mut(usize::from(channel)) {
            Some(slot) => {
                *slot = Some(now + PRESS_HOLD);
                true
            }
            None => false,
        }
    }

    pub fn is_pressed(&self, channel: ChannelId, now: HostInstant) -> bool {
        self.pressed_until
            .get(usize::from(channel))
            .copied()
            .flatten()
            .is_some_and(|until| now < until)
    }

    /// Overrides the system clock so it reads `time` at `now`; `None` restores it.
    pub fn set_clock(&mut self, time: Option<WallTime>, now: HostInstant) {
        self.manual_clock = time.map(|time| (time, now));
    }

    pub fn manual_time(&self, now: HostInstant) -> Option<WallTime> {
        self.manual_clock.map(|(time, set_at)| {
            let minutes = now.saturating_duration_since(set_at).as_secs() / 60;
            time.plus_minutes(u32::try_from(minutes % u64::from(MINUTES_PER_DAY)).unwrap_or(0))
        })
    }
}

pub type SharedPanel = Arc<Mutex<Panel>>;

/// Local wall time for a Unix timestamp shifted by `utc_offset_minutes`.
pub fn local_wall_time(unix_secs: u64, utc_offset_minutes: i32) -> WallTime {
    let day = i64::from(MINUTES_PER_DAY);
    let minutes = i64::try_from(unix_secs / 60).unwrap_or(0) + i64::from(utc_offset_minutes);
    let minute_of_day = u32::try_from(minutes.rem_euclid(day)).unwrap_or(0);
    WallTime::from_minute_of_day(minute_of_day)
}

pub struct HostBoard {
    started_at: HostInstant,
    panel: SharedPanel,
    utc_offset_minutes: i32,
    output: Output,
    lit: ChannelSet,
}

impl HostBoard {
    pub fn new(panel: SharedPanel, utc_offset_minutes: i32, output: Output) -> Self {
        Self {
            started_at: HostInstant::now(),
            panel,
            utc_offset_minutes,
            output,
            lit: ChannelSet::EMPTY,
        }
    }

    fn panel(&self) -> std::sync::MutexGuard<'_, Panel> {
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show_leds(&mut self, pattern: ChannelSet) {
        if pattern == self.lit {
            return;
        }
        self.lit = pattern;
        let mut row = String::with_capacity(DEFAULT_CHANNELS);
        for channel in (0..).take(DEFAULT_CHANNELS) {
            row.push(if pattern.contains(channel) { '#' } else { '.' });
        }
        self.output.emit(&format!("led [{row}]"));
    }
}

impl Timebase for HostBoard {
    fn now(&self) -> Instant {
        let elapsed = self.started_at.elapsed().as_millis();
        Instant::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    async fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl WallClock for HostBoard {
    fn sample_local_time(&mut self) -> Option<WallTime> {
        if let Some(time) = self.panel().manual_time(HostInstant::now()) {
            return Some(time);
        }
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        Some(local_wall_time(
            since_epoch.as_secs(),
            self.utc_offset_minutes,
        ))
    }
}

impl LedDisplay for HostBoard {
    fn set_pattern(&mut self, pattern: ChannelSet) {
        self.show_leds(pattern);
    }

    fn clear(&mut self) {
        self.show_leds(ChannelSet::EMPTY);
    }
}

impl Buzzer for HostBoard {
    fn tone_on(&mut self, tone: Tone) {
        self.output.emit(&format!(
            "buzzer on {} Hz volume={} ({} ms)",
            tone.frequency_hz,
            tone.volume,
            tone.duration.as_millis()
        ));
    }

    fn tone_off(&mut self) {
        self.output.emit("buzzer off");
    }
}

impl ButtonLevels for HostBoard {
    fn level(&mut self, channel: ChannelId) -> Level {
        Level::from_active_low(self.panel().is_pressed(channel, HostInstant::now()))
    }
}
