//! Console session for the USB CDC operator link.
//!
//! Bytes from the host are assembled into lines here, parsed with the shared
//! grammar, and handed to a [`CommandDispatcher`]. Schedule payloads (lines
//! starting with `{`) are forwarded whether or not they parse so the
//! controller can record rejected pushes.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt;
use core::str;

use alarm_core::console::{self, Command, ConsoleError};
use alarm_core::schedule::ScheduleError;
use alarm_core::time::WallTime;
use heapless::Vec;

/// Maximum number of bytes accepted on a single console line (excluding terminator).
pub const MAX_LINE_LEN: usize = 96;

/// Errors returned by command dispatchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// The alarm task has not drained earlier commands yet.
    Busy,
    /// The command names a channel or feature this board lacks.
    Unsupported,
}

/// Errors surfaced by the console session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Encountered non-UTF-8 data in the assembled line buffer.
    InvalidUtf8,
    /// Input exceeded [`MAX_LINE_LEN`]; the line is discarded.
    LineOverflow,
    /// Parser rejected the submitted line.
    Parse(ConsoleError),
    /// Dispatcher refused the command.
    Dispatch(DispatchError),
}

impl From<DispatchError> for SessionError {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidUtf8 => f.write_str("line is not valid UTF-8"),
            SessionError::LineOverflow => write!(f, "line longer than {MAX_LINE_LEN} bytes"),
            SessionError::Parse(error) => error.fmt(f),
            SessionError::Dispatch(DispatchError::Busy) => f.write_str("busy, try again"),
            SessionError::Dispatch(DispatchError::Unsupported) => {
                f.write_str("not supported on this board")
            }
        }
    }
}

/// Consumer of parsed console lines.
pub trait CommandDispatcher {
    /// Executes or forwards a parsed command.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the command cannot be accepted now.
    fn dispatch(&mut self, command: Command) -> Result<(), DispatchError>;

    /// Forwards a schedule payload, accepted or rejected, to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Busy`] when the schedule queue is full.
    fn schedule(&mut self, update: Result<WallTime, ScheduleError>) -> Result<(), DispatchError>;
}

/// Line assembler for one console link.
pub struct ConsoleSession<D> {
    dispatcher: D,
    buffer: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
}

impl<D> ConsoleSession<D>
where
    D: CommandDispatcher,
{
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Drops any partial line, e.g. after the host disconnects.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Feeds a single byte into the session. Newline triggers parsing/dispatch.
    ///
    /// # Errors
    ///
    /// Returns the reason a completed line was rejected; the session is ready
    /// for the next line either way.
    pub fn ingest(&mut self, byte: u8) -> Result<(), SessionError> {
        match byte {
            b'\r' | b'\n' => {
                let result = if self.overflowed {
                    Err(SessionError::LineOverflow)
                } else {
                    self.process_line()
                };
                self.reset();
                result
            }
            0x08 | 0x7f => {
                self.buffer.pop();
                Ok(())
            }
            value => {
                if self.buffer.push(value).is_err() {
                    self.overflowed = true;
                }
                Ok(())
            }
        }
    }

    fn process_line(&mut self) -> Result<(), SessionError> {
        let line = str::from_utf8(&self.buffer).map_err(|_| SessionError::InvalidUtf8)?;
        match console::parse(line) {
            Ok(Command::Schedule(target)) => Ok(self.dispatcher.schedule(Ok(target))?),
            Ok(command) => Ok(self.dispatcher.dispatch(command)?),
            Err(ConsoleError::Empty) => Ok(()),
            Err(ConsoleError::Schedule(error)) => {
                self.dispatcher.schedule(Err(error))?;
                Err(SessionError::Parse(ConsoleError::Schedule(error)))
            }
            Err(error) => Err(SessionError::Parse(error)),
        }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        commands: std::vec::Vec<Command>,
        schedules: std::vec::Vec<Result<WallTime, ScheduleError>>,
        busy: bool,
    }

    impl CommandDispatcher for Recorder {
        fn dispatch(&mut self, command: Command) -> Result<(), DispatchError> {
            if self.busy {
                return Err(DispatchError::Busy);
            }
            self.commands.push(command);
            Ok(())
        }

        fn schedule(
            &mut self,
            update: Result<WallTime, ScheduleError>,
        ) -> Result<(), DispatchError> {
            self.schedules.push(update);
            Ok(())
        }
    }

    fn feed(session: &mut ConsoleSession<Recorder>, bytes: &[u8]) -> Result<(), SessionError> {
        let mut last = Ok(());
        for &byte in bytes {
            if let Err(error) = session.ingest(byte) {
                last = Err(error);
            }
        }
        last
    }

    #[test]
    fn session_routes_complete_lines() {
        let mut session = ConsoleSession::new(Recorder::default());
        feed(&mut session, b"stat").unwrap();
        assert!(session.dispatcher().commands.is_empty());

        feed(&mut session, b"us\r\n").unwrap();
        assert_eq!(session.dispatcher().commands, [Command::Status]);
    }

    #[test]
    fn backspace_edits_the_line() {
        let mut session = ConsoleSession::new(Recorder::default());
        feed(&mut session, b"presx\x7fs 2\n").unwrap();
        assert_eq!(session.dispatcher().commands, [Command::Press(2)]);
    }

    #[test]
    fn schedule_payloads_are_forwarded_even_when_rejected() {
        let mut session = ConsoleSession::new(Recorder::default());
        feed(&mut session, br#"{"hour":6,"minute":5}"#).unwrap();
        feed(&mut session, b"\n").unwrap();

        let result = feed(&mut session, b"{\"hour\":6}\n");
        assert_eq!(
            result,
            Err(SessionError::Parse(ConsoleError::Schedule(
                ScheduleError::MissingField("minute")
            )))
        );
        assert_eq!(
            session.dispatcher().schedules,
            [Ok(WallTime::new(6, 5).unwrap()), Err(ScheduleError::MissingField("minute"))]
        );
        assert!(session.dispatcher().commands.is_empty());
    }

    #[test]
    fn parse_errors_do_not_poison_the_next_line() {
        let mut session = ConsoleSession::new(Recorder::default());
        assert_eq!(
            feed(&mut session, b"snooze\n"),
            Err(SessionError::Parse(ConsoleError::UnknownCommand))
        );
        feed(&mut session, b"history\n").unwrap();
        assert_eq!(session.dispatcher().commands, [Command::History]);
    }

    #[test]
    fn overflow_is_reported_at_end_of_line() {
        let mut session = ConsoleSession::new(Recorder::default());
        for _ in 0..=MAX_LINE_LEN {
            session.ingest(b'a').unwrap();
        }
        assert_eq!(session.ingest(b'\n'), Err(SessionError::LineOverflow));
        feed(&mut session, b"events\n").unwrap();
        assert_eq!(session.dispatcher().commands, [Command::Events]);
    }

    #[test]
    fn busy_dispatcher_is_reported() {
        let mut session = ConsoleSession::new(Recorder {
            busy: true,
            ..Recorder::default()
        });
        assert_eq!(
            feed(&mut session, b"alarm 07:00\n"),
            Err(SessionError::Dispatch(DispatchError::Busy))
        );
    }
}
