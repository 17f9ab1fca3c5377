#![allow(dead_code)]

//! Simulated board for end-to-end controller tests.
//!
//! Time only moves when the controller sleeps. A scripted operator watches the
//! board outputs: it presses a button during the warning tone and replays the
//! LEDs it saw once the controller starts sampling buttons again.

use core::time::Duration;

use alarm_core::input::{ButtonLevels, ChannelId, Level};
use alarm_core::orchestrator::{Buzzer, ChannelSet, LedDisplay, Tone};
use alarm_core::time::{Instant, Timebase, WallClock, WallTime};

/// How long a simulated finger holds a button.
pub const PRESS_HOLD_MS: u64 = 50;
/// Spacing between consecutive simulated presses.
pub const PRESS_SPACING_MS: u64 = 300;
/// Delay before the operator starts replaying a sequence.
pub const REPLAY_DELAY_MS: u64 = 200;

#[derive(Clone, Copy, Debug)]
struct ScheduledPress {
    channel: ChannelId,
    start: u64,
    end: u64,
}

/// Scripted user behaviour.
#[derive(Clone, Copy, Debug)]
pub struct Operator {
    /// Warning tone (1-based) during which the operator presses cancel.
    pub cancel_on_tone: usize,
    /// Delay after that tone starts before the cancel press is released.
    pub cancel_delay_ms: u64,
    /// Number of replays that deliberately get the first element wrong.
    pub wrong_replays: usize,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            cancel_on_tone: 1,
            cancel_delay_ms: 100,
            wrong_replays: 0,
        }
    }
}

pub struct SimBoard {
    now_ms: u64,
    clock_origin: Option<WallTime>,
    operator: Operator,
    presses: Vec<ScheduledPress>,
    lit: Option<ChannelId>,
    shown: Vec<ChannelId>,
    replays: usize,
    warning_tones: usize,
    pub tones: Vec<Tone>,
    pub displayed: Vec<ChannelId>,
    pub replayed: Vec<Vec<ChannelId>>,
    pub buzzing: bool,
}

impl SimBoard {
    /// Board whose wall clock reads `origin` at time zero.
    pub fn new(origin: Option<WallTime>, operator: Operator) -> Self {
        Self {
            now_ms: 0,
            clock_origin: origin,
            operator,
            presses: Vec::new(),
            lit: None,
            shown: Vec::new(),
            replays: 0,
            warning_tones: 0,
            tones: Vec::new(),
            displayed: Vec::new(),
            replayed: Vec::new(),
            buzzing: false,
        }
    }

    pub fn set_clock(&mut self, origin: Option<WallTime>) {
        self.clock_origin = origin;
    }

    pub fn tones_at(&self, frequency_hz: u32) -> usize {
        self.tones
            .iter()
            .filter(|tone| tone.frequency_hz == frequency_hz)
            .count()
    }

    fn schedule_press(&mut self, channel: ChannelId, release_at: u64) {
        self.presses.push(ScheduledPress {
            channel,
            start: release_at.saturating_sub(PRESS_HOLD_MS),
            end: release_at,
        });
    }

    fn replay_shown(&mut self) {
        let mut sequence = core::mem::take(&mut self.shown);
        if self.replays < self.operator.wrong_replays
            && let Some(first) = sequence.first_mut()
        {
            *first = (*first + 1) % 4;
        }
        self.replays += 1;

        let origin = self.now_ms + REPLAY_DELAY_MS;
        for (index, &channel) in sequence.iter().enumerate() {
            let offset = u64::try_from(index).expect("small index") * PRESS_SPACING_MS;
            self.schedule_press(channel, origin + offset + PRESS_HOLD_MS);
        }
        self.replayed.push(sequence);
    }
}

impl Timebase for SimBoard {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms)
    }

    async fn sleep(&mut self, duration: Duration) {
        self.now_ms += u64::try_from(duration.as_millis()).expect("sleep fits in u64");
    }
}

impl WallClock for SimBoard {
    fn sample_local_time(&mut self) -> Option<WallTime> {
        let minutes = u32::try_from(self.now_ms / 60_000).expect("test runs for < 8k years");
        self.clock_origin.map(|origin| origin.plus_minutes(minutes))
    }
}

impl LedDisplay for SimBoard {
    fn set_pattern(&mut self, pattern: ChannelSet) {
        self.lit = (0..8).find(|&channel| pattern.contains(channel));
    }

    fn clear(&mut self) {
        if let Some(channel) = self.lit.take() {
            self.shown.push(channel);
            self.displayed.push(channel);
        }
    }
}

impl Buzzer for SimBoard {
    fn tone_on(&mut self, tone: Tone) {
        assert!(!self.buzzing, "tone started while another was sounding");
        self.buzzing = true;
        self.tones.push(tone);

        if tone.frequency_hz == 500 {
            self.warning_tones += 1;
            if self.warning_tones == self.operator.cancel_on_tone {
                let release_at = self.now_ms + self.operator.cancel_delay_ms;
                self.schedule_press(0, release_at);
            }
        } else {
            // Puzzle tones end the warning; the next alarm counts from its first tone.
            self.warning_tones = 0;
        }
    }

    fn tone_off(&mut self) {
        self.buzzing = false;
    }
}

impl ButtonLevels for SimBoard {
    fn level(&mut self, channel: ChannelId) -> Level {
        if !self.shown.is_empty() && self.lit.is_none() {
            self.replay_shown();
        }

        let now = self.now_ms;
        let pressed = self
            .presses
            .iter()
            .any(|press| press.channel == channel && (press.start..press.end).contains(&now));
        Level::from_active_low(pressed)
    }
}

pub fn hm(hour: u8, minute: u8) -> WallTime {
    WallTime::new(hour, minute).expect("valid time")
}
