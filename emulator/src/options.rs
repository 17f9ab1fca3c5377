use std::path::PathBuf;

pub const USAGE: &str = "Usage: alarm-emulator [--utc-offset <minutes>] [--seed <u64>] \
[--steps <n>] [--schedule-file <path>] [--report-file <path>] [--transcript <path>]";

/// Command-line configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub utc_offset_minutes: i32,
    pub seed: u64,
    /// Overrides the puzzle's base sequence length.
    pub base_steps: Option<u8>,
    pub schedule_file: Option<PathBuf>,
    /// Solved-puzzle reports are appended here as JSON lines.
    pub report_file: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            seed: 0x5EED,
            base_steps: None,
            schedule_file: None,
            report_file: None,
            transcript: None,
        }
    }
}

impl Options {
    /// Parses `--flag value` and `--flag=value` forms.
    ///
    /// # Errors
    ///
    /// Returns a message naming the unknown flag, missing value, or bad number.
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            let mut value = || {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .ok_or_else(|| format!("Expected value after {flag}"))
            };

            match flag.as_str() {
                "--utc-offset" => options.utc_offset_minutes = number(&flag, &value()?)?,
                "--seed" => options.seed = number(&flag, &value()?)?,
                "--steps" => options.base_steps = Some(number(&flag, &value()?)?),
                "--schedule-file" => options.schedule_file = Some(value()?.into()),
                "--report-file" => options.report_file = Some(value()?.into()),
                "--transcript" => options.transcript = Some(value()?.into()),
                _ => return Err(format!("Unknown argument `{flag}`")),
            }
        }
        Ok(options)
    }
}

fn number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, String> {
        Options::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse(&[]), Ok(Options::default()));
    }

    #[test]
    fn accepts_both_flag_forms() {
        let options = parse(&[
            "--utc-offset=-300",
            "--seed",
            "42",
            "--schedule-file",
            "schedule.json",
            "--steps=6",
        ])
        .expect("valid arguments");
        assert_eq!(options.utc_offset_minutes, -300);
        assert_eq!(options.seed, 42);
        assert_eq!(options.base_steps, Some(6));
        assert_eq!(options.schedule_file, Some(PathBuf::from("schedule.json")));
    }

    #[test]
    fn reports_bad_arguments() {
        assert_eq!(
            parse(&["--seed"]),
            Err("Expected value after --seed".to_string())
        );
        assert_eq!(
            parse(&["--seed", "many"]),
            Err("Invalid value `many` for --seed".to_string())
        );
        assert_eq!(
            parse(&["--verbose"]),
            Err("Unknown argument `--verbose`".to_string())
        );
    }
}
