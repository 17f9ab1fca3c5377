#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The console task and the alarm task never share the controller. Requests
//! that must take effect while the alarm is sounding (virtual presses, the
//! manual clock) and the coarse "alarm active" flag live in atomics instead.

use alarm_core::input::ChannelId;
use alarm_core::time::WallTime;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_DAY: u64 = 24 * 60 * MS_PER_MINUTE;
const CLOCK_UNSET: u64 = 0;
const VIRTUAL_CHANNELS: usize = 8;

/// Minimum spacing between two virtual presses on one channel.
///
/// Longer than the debounce window so queued presses are not merged.
pub const VIRTUAL_PRESS_SPACING_MS: u64 = 250;

/// Milliseconds past midnight at uptime zero, stored `+1` (0 == no clock).
static CLOCK_OFFSET: AtomicU64 = AtomicU64::new(CLOCK_UNSET);
/// Console presses waiting to be sampled, per channel.
static PENDING_PRESSES: [AtomicU8; VIRTUAL_CHANNELS] =
    [const { AtomicU8::new(0) }; VIRTUAL_CHANNELS];
/// Uptime before which the next virtual press on a channel is held back.
static NEXT_PRESS_AT: [AtomicU64; VIRTUAL_CHANNELS] =
    [const { AtomicU64::new(0) }; VIRTUAL_CHANNELS];
/// Set between `alarm-fired` and `puzzle-solved`.
static ALARM_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Sets (or clears) the wall clock so that it reads `time` at `uptime_ms`.
///
/// Minutes roll over a whole minute after the moment the clock was set.
pub fn set_clock(time: Option<WallTime>, uptime_ms: u64) {
    let raw = match time {
        Some(time) => {
            let target = u64::from(time.minute_of_day()) * MS_PER_MINUTE;
            let offset = (target + MS_PER_DAY - uptime_ms % MS_PER_DAY) % MS_PER_DAY;
            offset + 1
        }
        None => CLOCK_UNSET,
    };
    CLOCK_OFFSET.store(raw, Ordering::Relaxed);
}

/// Local time at `uptime_ms`, if a clock has been set.
pub fn wall_time(uptime_ms: u64) -> Option<WallTime> {
    match CLOCK_OFFSET.load(Ordering::Relaxed) {
        CLOCK_UNSET => None,
        raw => {
            let since_midnight = (raw - 1 + uptime_ms % MS_PER_DAY) % MS_PER_DAY;
            let minute = u32::try_from(since_midnight / MS_PER_MINUTE).unwrap_or(0);
            Some(WallTime::from_minute_of_day(minute))
        }
    }
}

/// Queues a synthetic press; returns `false` for channels without a slot.
pub fn request_press(channel: ChannelId) -> bool {
    let Some(pending) = PENDING_PRESSES.get(usize::from(channel)) else {
        return false;
    };
    let _ = pending.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
        Some(count.saturating_add(1))
    });
    true
}

/// Returns `true` once per requested press, at most once per
/// [`VIRTUAL_PRESS_SPACING_MS`] on each channel.
///
/// The board reports the button held for the sample that consumes a press and
/// released on the next, which the debouncer sees as one press.
pub fn take_press(channel: ChannelId, uptime_ms: u64) -> bool {
    let index = usize::from(channel);
    let (Some(pending), Some(next_at)) = (PENDING_PRESSES.get(index), NEXT_PRESS_AT.get(index))
    else {
        return false;
    };
    if uptime_ms < next_at.load(Ordering::Relaxed) {
        return false;
    }
    let taken = pending
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| count.checked_sub(1))
        .is_ok();
    if taken {
        next_at.store(uptime_ms.saturating_add(VIRTUAL_PRESS_SPACING_MS), Ordering::Relaxed);
    }
    taken
}

pub fn set_alarm_active(active: bool) {
    ALARM_ACTIVE.store(active, Ordering::Relaxed);
}

pub fn alarm_active() -> bool {
    ALARM_ACTIVE.load(Ordering::Relaxed)
}
