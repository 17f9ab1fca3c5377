//! Command table shared by the parser and the `help` command.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Alarm,
    Clock,
    Press,
    Blink,
    Status,
    History,
    Events,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

static COMMANDS: [CommandSpec; 8] = [
    CommandSpec {
        name: "alarm",
        tag: CommandTag::Alarm,
        usage: "alarm HH:MM",
        summary: "arm the alarm for a local time",
    },
    CommandSpec {
        name: "clock",
        tag: CommandTag::Clock,
        usage: "clock HH:MM|off",
        summary: "set or clear the manual wall clock",
    },
    CommandSpec {
        name: "press",
        tag: CommandTag::Press,
        usage: "press N",
        summary: "simulate a press on button N",
    },
    CommandSpec {
        name: "blink",
        tag: CommandTag::Blink,
        usage: "blink MS",
        summary: "override the LED on-time (200-2000 ms)",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        usage: "status",
        summary: "show alarm and puzzle state",
    },
    CommandSpec {
        name: "history",
        tag: CommandTag::History,
        usage: "history",
        summary: "list recent puzzle results, oldest first",
    },
    CommandSpec {
        name: "events",
        tag: CommandTag::Events,
        usage: "events",
        summary: "list recent telemetry events",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "describe commands",
    },
];

/// Returns the full command catalog.
#[must_use]
pub fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::Alarm => &COMMANDS[0],
        CommandTag::Clock => &COMMANDS[1],
        CommandTag::Press => &COMMANDS[2],
        CommandTag::Blink => &COMMANDS[3],
        CommandTag::Status => &COMMANDS[4],
        CommandTag::History => &COMMANDS[5],
        CommandTag::Events => &COMMANDS[6],
        CommandTag::Help => &COMMANDS[7],
    }
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Writes help for one command, or one line per command when `topic` is `None`.
///
/// # Errors
///
/// Propagates failures from `writer`.
pub fn write_help<W: fmt::Write>(writer: &mut W, topic: Option<CommandTag>) -> fmt::Result {
    match topic {
        Some(tag) => {
            let spec = command(tag);
            writeln!(writer, "{:<16} {}", spec.usage, spec.summary)
        }
        None => {
            for spec in commands() {
                writeln!(writer, "{:<16} {}", spec.usage, spec.summary)?;
            }
            writeln!(writer, "{:<16} apply a schedule payload", "{\"hour\":H,...}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_tag_matches_table_order() {
        for spec in commands() {
            assert_eq!(command(spec.tag), spec);
            assert_eq!(find(spec.name).map(|found| found.tag), Some(spec.tag));
        }
        assert_eq!(find("STATUS").map(|spec| spec.tag), Some(CommandTag::Status));
        assert!(find("reboot").is_none());
    }
}
