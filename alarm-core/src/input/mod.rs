//! Debounced, release-edge button input.
//!
//! Each [`ButtonChannel`] remembers the level seen on the previous poll and the
//! timestamp of its last accepted event. A press is reported once, when the
//! button goes from pressed back to released, and only if the debounce window
//! has elapsed since the previous accepted press on that channel:
//!
//! ```text
//!   level:   Released ──► Pressed ──► Released
//!                                        │
//!                                        ▼
//!             elapsed since last event > debounce ? ──► handler(channel)
//! ```
//!
//! A pin held in either level produces no edges and therefore no events.

use core::time::Duration;

use crate::time::Instant;

/// Debounce window applied when callers do not supply their own.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Index of a button channel, matching the LED with the same index.
pub type ChannelId = u8;

/// Logical level sampled from a button pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Pressed,
    Released,
}

impl Level {
    /// Maps an active-low pin reading onto a logical level.
    #[must_use]
    pub const fn from_active_low(is_low: bool) -> Self {
        if is_low { Level::Pressed } else { Level::Released }
    }

    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, Level::Pressed)
    }
}

/// Raw digital input collaborator.
pub trait ButtonLevels {
    /// Samples the current level of `channel`.
    fn level(&mut self, channel: ChannelId) -> Level;
}

/// Receives accepted press events.
pub trait PressHandler {
    fn on_press(&mut self, channel: ChannelId);
}

impl<F> PressHandler for F
where
    F: FnMut(ChannelId),
{
    fn on_press(&mut self, channel: ChannelId) {
        self(channel);
    }
}

/// Debounce state for one physical button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonChannel {
    id: ChannelId,
    debounce: Duration,
    previous_level: Level,
    last_event_at: Option<Instant>,
}

impl ButtonChannel {
    /// Creates a channel that assumes the button starts released.
    #[must_use]
    pub const fn new(id: ChannelId, debounce: Duration) -> Self {
        Self {
            id,
            debounce,
            previous_level: Level::Released,
            last_event_at: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    #[must_use]
    pub const fn previous_level(&self) -> Level {
        self.previous_level
    }

    #[must_use]
    pub const fn last_event_at(&self) -> Option<Instant> {
        self.last_event_at
    }

    /// Feeds one sample into the channel and returns `true` when it yields a press.
    ///
    /// The stored level tracks every sample, including ones that fall inside
    /// the debounce window.
    pub fn sample(&mut self, level: Level, now: Instant) -> bool {
        let released_edge = self.previous_level.is_pressed() && !level.is_pressed();
        self.previous_level = level;

        if !released_edge {
            return false;
        }

        if let Some(last) = self.last_event_at
            && now.saturating_duration_since(last) <= self.debounce
        {
            return false;
        }

        self.last_event_at = Some(now);
        true
    }
}

/// Fixed bank of debounced buttons feeding a single press handler.
pub struct DebouncedInput<H, const N: usize> {
    channels: [ButtonChannel; N],
    handler: H,
}

impl<H, const N: usize> DebouncedInput<H, N>
where
    H: PressHandler,
{
    /// Registers `handler` for every channel, each with the same debounce window.
    pub fn new(handler: H, debounce: Duration) -> Self {
        Self {
            channels: core::array::from_fn(|index| ButtonChannel::new(channel_id(index), debounce)),
            handler,
        }
    }

    /// Samples every channel once and dispatches accepted presses.
    ///
    /// Returns the number of events delivered to the handler.
    pub fn poll<P>(&mut self, pins: &mut P, now: Instant) -> usize
    where
        P: ButtonLevels + ?Sized,
    {
        let mut delivered = 0;
        for channel in &mut self.channels {
            let level = pins.level(channel.id());
            if channel.sample(level, now) {
                self.handler.on_press(channel.id());
                delivered += 1;
            }
        }
        delivered
    }

    /// Delivers a synthetic press, bypassing level tracking and debounce.
    ///
    /// Returns `false` when `channel` is not part of this bank.
    pub fn inject(&mut self, channel: ChannelId) -> bool {
        if usize::from(channel) >= N {
            return false;
        }
        self.handler.on_press(channel);
        true
    }

    pub fn channels(&self) -> &[ButtonChannel; N] {
        &self.channels
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

fn channel_id(index: usize) -> ChannelId {
    ChannelId::try_from(index).unwrap_or(ChannelId::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pins([Level; 2]);

    impl ButtonLevels for Pins {
        fn level(&mut self, channel: ChannelId) -> Level {
            self.0[usize::from(channel)]
        }
    }

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    #[test]
    fn reports_once_on_release_edge() {
        let mut channel = ButtonChannel::new(0, DEFAULT_DEBOUNCE);

        assert!(!channel.sample(Level::Pressed, at(1_000)));
        assert!(!channel.sample(Level::Pressed, at(1_010)));
        assert!(channel.sample(Level::Released, at(1_050)));
        assert!(!channel.sample(Level::Released, at(1_060)));
        assert_eq!(channel.last_event_at(), Some(at(1_050)));
    }

    #[test]
    fn first_press_is_accepted_immediately_after_boot() {
        let mut channel = ButtonChannel::new(0, DEFAULT_DEBOUNCE);
        assert!(!channel.sample(Level::Pressed, at(0)));
        assert!(channel.sample(Level::Released, at(10)));
    }

    #[test]
    fn suppresses_bounce_inside_window_but_tracks_level() {
        let mut channel = ButtonChannel::new(1, DEFAULT_DEBOUNCE);
        channel.sample(Level::Pressed, at(0));
        assert!(channel.sample(Level::Released, at(100)));

        // Contact bounce 50 ms later: edge is seen but suppressed.
        channel.sample(Level::Pressed, at(120));
        assert!(!channel.sample(Level::Released, at(150)));
        assert_eq!(channel.previous_level(), Level::Released);

        // Exactly at the window boundary is still suppressed.
        channel.sample(Level::Pressed, at(290));
        assert!(!channel.sample(Level::Released, at(300)));

        channel.sample(Level::Pressed, at(310));
        assert!(channel.sample(Level::Released, at(301 + 100)));
    }

    #[test]
    fn stuck_pin_never_fires() {
        let mut channel = ButtonChannel::new(0, DEFAULT_DEBOUNCE);
        for tick in 0..100 {
            assert!(!channel.sample(Level::Pressed, at(tick * 10)));
        }
    }

    #[test]
    fn polling_rate_does_not_change_event_count() {
        for period in [1_u64, 5, 10, 25] {
            let mut events = 0_usize;
            let mut input = DebouncedInput::<_, 2>::new(|_| events += 1, DEFAULT_DEBOUNCE);
            let mut pins = Pins([Level::Released; 2]);

            let mut now = 0;
            while now < 1_000 {
                pins.0[0] = if (100..180).contains(&now) {
                    Level::Pressed
                } else {
                    Level::Released
                };
                input.poll(&mut pins, at(now));
                now += period;
            }
            drop(input);
            assert_eq!(events, 1, "period {period}ms");
        }
    }

    #[test]
    fn inject_bypasses_debounce_and_rejects_unknown_channels() {
        let mut seen = heapless::Vec::<ChannelId, 4>::new();
        let mut input = DebouncedInput::<_, 2>::new(
            |channel| {
                let _ = seen.push(channel);
            },
            DEFAULT_DEBOUNCE,
        );

        assert!(input.inject(1));
        assert!(input.inject(1));
        assert!(!input.inject(2));
        drop(input);
        assert_eq!(seen.as_slice(), &[1, 1]);
    }
}
