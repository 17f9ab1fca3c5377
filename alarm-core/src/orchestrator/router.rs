//! Press handler owned by the input bank.
//!
//! The router is the only writer of the cancel flag and the capture buffer.
//! The controller switches its mode and reads the results between polls.

use crate::input::{ChannelId, PressHandler};
use crate::puzzle::Sequence;

/// What a press means in the current phase.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RouteMode {
    /// Presses are ignored.
    Ignore,
    /// Any press cancels the warning.
    Cancel,
    /// Presses fill the capture buffer until it reaches the expected length.
    Capture,
}

#[derive(Clone, Debug)]
pub struct InputRouter {
    mode: RouteMode,
    cancel_requested: bool,
    captured: Sequence,
    expected: usize,
}

impl InputRouter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: RouteMode::Ignore,
            cancel_requested: false,
            captured: Sequence::new(),
            expected: 0,
        }
    }

    /// Clears the cancel flag and starts listening for a cancel press.
    pub fn arm_cancel(&mut self) {
        self.cancel_requested = false;
        self.mode = RouteMode::Cancel;
    }

    /// Resets the capture cursor and accepts up to `expected` presses.
    pub fn begin_capture(&mut self, expected: usize) {
        self.captured.clear();
        self.expected = expected.min(self.captured.capacity());
        self.mode = RouteMode::Capture;
    }

    /// Stops routing presses; flags and captured input are kept for reading.
    pub fn disarm(&mut self) {
        self.mode = RouteMode::Ignore;
    }

    pub const fn mode(&self) -> RouteMode {
        self.mode
    }

    pub const fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// Returns `true` once the capture cursor has reached the expected length.
    pub fn is_complete(&self) -> bool {
        self.captured.len() >= self.expected
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl PressHandler for InputRouter {
    fn on_press(&mut self, channel: ChannelId) {
        match self.mode {
            RouteMode::Ignore => {}
            RouteMode::Cancel => self.cancel_requested = true,
            RouteMode::Capture => {
                if self.captured.len() < self.expected {
                    let _ = self.captured.push(channel);
                }
            }
        }
    }
}
