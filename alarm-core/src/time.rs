//! Monotonic and wall-clock time primitives shared by every target.

use core::{fmt, ops::Add, time::Duration};

/// Minutes in one civil day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Monotonic timestamp with millisecond resolution.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Instant(u64);

impl Instant {
    /// Start of the monotonic timeline.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the elapsed time since `earlier`, or zero when `earlier` is in the future.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Instant(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Reasons a wall-clock time could not be constructed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WallTimeError {
    HourOutOfRange(u8),
    MinuteOutOfRange(u8),
}

impl fmt::Display for WallTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WallTimeError::HourOutOfRange(hour) => write!(f, "hour {hour} outside 0-23"),
            WallTimeError::MinuteOutOfRange(minute) => {
                write!(f, "minute {minute} outside 0-59")
            }
        }
    }
}

/// Local time of day at minute granularity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WallTime {
    hour: u8,
    minute: u8,
}

impl WallTime {
    /// Midnight.
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    /// Builds a wall-clock time, rejecting hours above 23 and minutes above 59.
    ///
    /// # Errors
    ///
    /// Returns [`WallTimeError`] naming the first out-of-range component.
    pub const fn new(hour: u8, minute: u8) -> Result<Self, WallTimeError> {
        if hour > 23 {
            return Err(WallTimeError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(WallTimeError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    /// Builds a wall-clock time from minutes past midnight, wrapping at one day.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_minute_of_day(minutes: u32) -> Self {
        // Both quotients are bounded by the modulo.
        let wrapped = minutes % MINUTES_PER_DAY;
        Self {
            hour: (wrapped / 60) as u8,
            minute: (wrapped % 60) as u8,
        }
    }

    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Minutes elapsed since midnight.
    #[must_use]
    pub fn minute_of_day(self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }

    /// Advances the time by `minutes`, wrapping past midnight.
    #[must_use]
    pub fn plus_minutes(self, minutes: u32) -> Self {
        Self::from_minute_of_day(self.minute_of_day() + minutes % MINUTES_PER_DAY)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Monotonic clock plus cooperative wait used by the control task.
///
/// `sleep` is the only suspension point the orchestrator uses; implementations
/// advance virtual time in tests and await a timer on hardware.
#[allow(async_fn_in_trait)]
pub trait Timebase {
    /// Current monotonic timestamp.
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration`.
    async fn sleep(&mut self, duration: Duration);
}

/// Source of local wall-clock samples.
pub trait WallClock {
    /// Returns the current local time, or `None` when the clock is not yet known.
    fn sample_local_time(&mut self) -> Option<WallTime>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_time_rejects_out_of_range_components() {
        assert_eq!(WallTime::new(24, 0), Err(WallTimeError::HourOutOfRange(24)));
        assert_eq!(WallTime::new(7, 60), Err(WallTimeError::MinuteOutOfRange(60)));
        let time = WallTime::new(23, 59).expect("valid time");
        assert_eq!((time.hour(), time.minute()), (23, 59));
    }

    #[test]
    fn wall_time_wraps_past_midnight() {
        let late = WallTime::new(23, 58).expect("valid time");
        assert_eq!(late.plus_minutes(3), WallTime::new(0, 1).expect("valid time"));
        assert_eq!(WallTime::from_minute_of_day(1440 + 61).to_string_buf(), "01:01");
    }

    #[test]
    fn instant_saturates_when_earlier_is_later() {
        let early = Instant::from_millis(100);
        let late = early + Duration::from_millis(250);
        assert_eq!(late.saturating_duration_since(early), Duration::from_millis(250));
        assert_eq!(early.saturating_duration_since(late), Duration::ZERO);
    }

    impl WallTime {
        fn to_string_buf(self) -> heapless::String<8> {
            use core::fmt::Write;
            let mut out = heapless::String::new();
            write!(out, "{self}").expect("fits");
            out
        }
    }
}
