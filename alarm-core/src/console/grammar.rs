//! Line parser for the operator console.
//!
//! A line is either a schedule payload (anything starting with `{`) or a
//! keyword from the [`catalog`](super::catalog) followed by its arguments.
//! Arguments are parsed with `winnow` combinators directly over the line.

use core::fmt;

use winnow::Parser;
use winnow::ascii::space1;
use winnow::combinator::{alt, opt, preceded, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::token::take_while;

use super::catalog::{self, CommandTag};
use crate::input::ChannelId;
use crate::schedule::{ScheduleError, parse_schedule};
use crate::time::{WallTime, WallTimeError};

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Structured commands produced by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Alarm(WallTime),
    /// `None` clears the manual clock.
    Clock(Option<WallTime>),
    Press(ChannelId),
    Blink(u32),
    Status,
    History,
    Events,
    Help(Option<CommandTag>),
    /// Schedule payload pasted on the console.
    Schedule(WallTime),
}

/// Errors reported for a rejected console line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    Empty,
    UnknownCommand,
    /// Arguments did not match; carries the command's usage string.
    InvalidArgument { usage: &'static str },
    InvalidTime(WallTimeError),
    UnknownTopic,
    TrailingInput,
    Schedule(ScheduleError),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Empty => f.write_str("empty command"),
            ConsoleError::UnknownCommand => f.write_str("unknown command (try `help`)"),
            ConsoleError::InvalidArgument { usage } => write!(f, "usage: {usage}"),
            ConsoleError::InvalidTime(error) => error.fmt(f),
            ConsoleError::UnknownTopic => f.write_str("no help for that topic"),
            ConsoleError::TrailingInput => f.write_str("unexpected trailing input"),
            ConsoleError::Schedule(error) => error.fmt(f),
        }
    }
}

impl From<ScheduleError> for ConsoleError {
    fn from(error: ScheduleError) -> Self {
        ConsoleError::Schedule(error)
    }
}

impl From<WallTimeError> for ConsoleError {
    fn from(error: WallTimeError) -> Self {
        ConsoleError::InvalidTime(error)
    }
}

/// Parses one console line.
///
/// # Errors
///
/// Returns [`ConsoleError`] describing why the line was rejected.
pub fn parse(line: &str) -> Result<Command, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ConsoleError::Empty);
    }
    if line.starts_with('{') {
        return Ok(Command::Schedule(parse_schedule(line)?));
    }

    let mut input = line;
    let keyword = word
        .parse_next(&mut input)
        .map_err(|_| ConsoleError::UnknownCommand)?;
    let spec = catalog::find(keyword).ok_or(ConsoleError::UnknownCommand)?;
    let usage = spec.usage;

    let command = match spec.tag {
        CommandTag::Alarm => {
            let (hour, minute) = argument(&mut input, time_of_day, usage)?;
            Command::Alarm(WallTime::new(hour, minute)?)
        }
        CommandTag::Clock => {
            let value = argument(
                &mut input,
                alt(("off".map(|_| None), time_of_day.map(Some))),
                usage,
            )?;
            match value {
                Some((hour, minute)) => Command::Clock(Some(WallTime::new(hour, minute)?)),
                None => Command::Clock(None),
            }
        }
        CommandTag::Press => Command::Press(argument(&mut input, channel, usage)?),
        CommandTag::Blink => Command::Blink(argument(&mut input, milliseconds, usage)?),
        CommandTag::Status => Command::Status,
        CommandTag::History => Command::History,
        CommandTag::Events => Command::Events,
        CommandTag::Help => {
            let topic: Option<&str> = opt(preceded(space1, word))
                .parse_next(&mut input)
                .map_err(|_: ErrMode<ContextError>| ConsoleError::InvalidArgument { usage })?;
            match topic {
                Some(name) => Command::Help(Some(
                    catalog::find(name).ok_or(ConsoleError::UnknownTopic)?.tag,
                )),
                None => Command::Help(None),
            }
        }
    };

    if !input.trim().is_empty() {
        return Err(ConsoleError::TrailingInput);
    }
    Ok(command)
}

fn argument<'a, O, P>(input: &mut &'a str, parser: P, usage: &'static str) -> Result<O, ConsoleError>
where
    P: Parser<&'a str, O, ErrMode<ContextError>>,
{
    preceded(space1, parser)
        .parse_next(input)
        .map_err(|_| ConsoleError::InvalidArgument { usage })
}

fn word<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

/// `H:MM` or `HH:MM`; leading zeros are allowed and ranges are checked by the caller.
fn time_of_day(input: &mut &str) -> PResult<(u8, u8)> {
    separated_pair(clock_field, ':', clock_field).parse_next(input)
}

fn clock_field(input: &mut &str) -> PResult<u8> {
    take_while(1..=2, |c: char| c.is_ascii_digit())
        .try_map(str::parse::<u8>)
        .parse_next(input)
}

fn channel(input: &mut &str) -> PResult<u8> {
    take_while(1..=3, |c: char| c.is_ascii_digit())
        .try_map(str::parse::<u8>)
        .parse_next(input)
}

fn milliseconds(input: &mut &str) -> PResult<u32> {
    take_while(1..=10, |c: char| c.is_ascii_digit())
        .try_map(str::parse::<u32>)
        .parse_next(input)
}
