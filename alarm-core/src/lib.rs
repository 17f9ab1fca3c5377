#![no_std]

// Shared logic for the puzzle alarm clock.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware, clocks, and transports are reached through the
// traits in [`time`], [`input`], and [`orchestrator`] so every target reuses the
// same alarm, debounce, and puzzle state machines.

pub mod alarm;
pub mod console;
pub mod input;
pub mod orchestrator;
pub mod puzzle;
pub mod schedule;
pub mod telemetry;
pub mod time;
