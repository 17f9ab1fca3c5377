//! Operator console shared between firmware and emulator targets.
//!
//! The command table lives in [`catalog`], line parsing in [`grammar`], and
//! status rendering in [`status`]. Executing a parsed command against the
//! controller is handled by [`crate::orchestrator::AlarmController::execute`].

pub mod catalog;
pub mod grammar;
pub mod status;

pub use catalog::{CommandSpec, CommandTag};
pub use grammar::{Command, ConsoleError, parse};
pub use status::{StatusFormatter, StatusSnapshot};
