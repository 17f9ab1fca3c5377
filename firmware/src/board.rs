//! STM32G0 board: four LEDs, four buttons, and a PWM buzzer.
//!
//! | Channel | LED | Button |
//! |---------|-----|--------|
//! | 0       | PA0 | PB3    |
//! | 1       | PA1 | PB4    |
//! | 2       | PA4 | PB5    |
//! | 3       | PA5 | PB6    |
//!
//! Buttons are active-low with internal pull-ups. The buzzer is driven by
//! TIM3 CH1 on PA6.

use alarm_core::input::{ButtonLevels, ChannelId, Level};
use alarm_core::orchestrator::{Buzzer, ChannelSet, DEFAULT_CHANNELS, LedDisplay, Tone};
use alarm_core::time::{self, Timebase, WallClock, WallTime};
use embassy_stm32::gpio::{Input, Output};
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_time::{Duration, Timer};

use crate::status;

/// Largest duty cycle (50 %) reached at full volume.
const FULL_VOLUME_DENOMINATOR: u16 = 2 * 255;

pub(crate) fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

pub(crate) fn uptime_ms() -> u64 {
    embassy_time::Instant::now().as_millis()
}

pub struct PuzzleBoard<'d> {
    leds: [Output<'d>; DEFAULT_CHANNELS],
    buttons: [Input<'d>; DEFAULT_CHANNELS],
    buzzer: SimplePwm<'d, TIM3>,
}

impl<'d> PuzzleBoard<'d> {
    pub fn new(
        leds: [Output<'d>; DEFAULT_CHANNELS],
        buttons: [Input<'d>; DEFAULT_CHANNELS],
        buzzer: SimplePwm<'d, TIM3>,
    ) -> Self {
        let mut board = Self {
            leds,
            buttons,
            buzzer,
        };
        board.clear();
        board.tone_off();
        board
    }
}

impl Timebase for PuzzleBoard<'_> {
    fn now(&self) -> time::Instant {
        time::Instant::from_millis(uptime_ms())
    }

    async fn sleep(&mut self, duration: core::time::Duration) {
        Timer::after(core_duration_to_embassy(duration)).await;
    }
}

impl WallClock for PuzzleBoard<'_> {
    fn sample_local_time(&mut self) -> Option<WallTime> {
        status::wall_time(uptime_ms())
    }
}

impl LedDisplay for PuzzleBoard<'_> {
    fn set_pattern(&mut self, pattern: ChannelSet) {
        for (channel, led) in (0..).zip(self.leds.iter_mut()) {
            if pattern.contains(channel) {
                led.set_high();
            } else {
                led.set_low();
            }
        }
    }

    fn clear(&mut self) {
        for led in &mut self.leds {
            led.set_low();
        }
    }
}

impl Buzzer for PuzzleBoard<'_> {
    fn tone_on(&mut self, tone: Tone) {
        defmt::debug!(
            "buzzer: {=u32} Hz volume={=u8} for {}ms",
            tone.frequency_hz,
            tone.volume,
            tone.duration.as_millis()
        );
        self.buzzer.set_frequency(Hertz::hz(tone.frequency_hz));
        let mut channel = self.buzzer.ch1();
        channel.set_duty_cycle_fraction(u16::from(tone.volume), FULL_VOLUME_DENOMINATOR);
        channel.enable();
    }

    fn tone_off(&mut self) {
        self.buzzer.ch1().disable();
    }
}

impl ButtonLevels for PuzzleBoard<'_> {
    fn level(&mut self, channel: ChannelId) -> Level {
        let physical = self
            .buttons
            .get(usize::from(channel))
            .is_some_and(Input::is_low);
        Level::from_active_low(physical || status::take_press(channel, uptime_ms()))
    }
}
