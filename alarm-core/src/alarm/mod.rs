//! Once-per-minute alarm trigger.
//!
//! ```text
//!            set_alarm                 sample == target && !fired
//!   Idle ─────────────► Armed ─────────────────────────────────────► Fired
//!                         ▲                                            │
//!                         └──────────── sample != target ──────────────┘
//! ```
//!
//! `set_alarm` re-arms from any state. While the sampled minute keeps matching
//! the target the trigger stays `Fired` and further checks are no-ops, so the
//! listener runs exactly once per matching minute.

use crate::time::WallTime;

/// Lifecycle of the alarm trigger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerState {
    Idle,
    Armed,
    Fired,
}

impl TriggerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggerState::Idle => "idle",
            TriggerState::Armed => "armed",
            TriggerState::Fired => "fired",
        }
    }
}

/// Result of a single [`AlarmTrigger::check_alarm`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerOutcome {
    /// No target has been configured.
    Unset,
    /// The wall clock could not be sampled; nothing changed.
    ClockUnavailable,
    /// The sampled minute differs from the target.
    Waiting,
    /// The target minute was reached on this check.
    Fired,
    /// The target minute is still current and has already fired.
    AlreadyFired,
}

impl TriggerOutcome {
    #[must_use]
    pub const fn fired(self) -> bool {
        matches!(self, TriggerOutcome::Fired)
    }
}

/// Notified when the alarm fires.
pub trait AlarmListener {
    fn on_alarm(&mut self, target: WallTime);
}

impl<F> AlarmListener for F
where
    F: FnMut(WallTime),
{
    fn on_alarm(&mut self, target: WallTime) {
        self(target);
    }
}

/// Listener that ignores fire events; callers act on [`TriggerOutcome`] instead.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopListener;

impl AlarmListener for NoopListener {
    fn on_alarm(&mut self, _: WallTime) {}
}

/// Alarm target plus the per-minute fire latch.
pub struct AlarmTrigger<L = NoopListener> {
    target: Option<WallTime>,
    state: TriggerState,
    fired_this_minute: bool,
    listener: L,
}

impl AlarmTrigger<NoopListener> {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_listener(NoopListener)
    }
}

impl Default for AlarmTrigger<NoopListener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> AlarmTrigger<L>
where
    L: AlarmListener,
{
    /// Creates an idle trigger that reports fire events to `listener`.
    pub const fn with_listener(listener: L) -> Self {
        Self {
            target: None,
            state: TriggerState::Idle,
            fired_this_minute: false,
            listener,
        }
    }

    /// Arms the trigger for `target`, clearing any fire latch.
    pub fn set_alarm(&mut self, target: WallTime) {
        self.target = Some(target);
        self.fired_this_minute = false;
        self.state = TriggerState::Armed;
    }

    /// Compares a wall-clock sample against the target.
    pub fn check_alarm(&mut self, sample: Option<WallTime>) -> TriggerOutcome {
        let Some(target) = self.target else {
            return TriggerOutcome::Unset;
        };
        let Some(now) = sample else {
            return TriggerOutcome::ClockUnavailable;
        };

        if now != target {
            self.fired_this_minute = false;
            self.state = TriggerState::Armed;
            return TriggerOutcome::Waiting;
        }

        if self.fired_this_minute {
            return TriggerOutcome::AlreadyFired;
        }

        self.fired_this_minute = true;
        self.state = TriggerState::Fired;
        self.listener.on_alarm(target);
        TriggerOutcome::Fired
    }

    pub const fn target(&self) -> Option<WallTime> {
        self.target
    }

    pub const fn state(&self) -> TriggerState {
        self.state
    }

    pub const fn fired_this_minute(&self) -> bool {
        self.fired_this_minute
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}
