use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant as HostInstant};

/// Who produced a transcript line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Host,
    Emulator,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Host => "HOST>",
            Role::Emulator => "EMU <",
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# Puzzle alarm emulator transcript")?;
        writeln!(
            logger.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: Role, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

/// Terminal output shared by the board, the sink, and the input thread.
///
/// Emulator lines go to stdout; every line is also appended to the
/// transcript file when one was requested.
#[derive(Clone)]
pub struct Output {
    started_at: HostInstant,
    transcript: Option<Arc<Mutex<TranscriptLogger>>>,
}

impl Output {
    /// # Errors
    ///
    /// Fails when the transcript file cannot be created.
    pub fn new(transcript: Option<&Path>) -> io::Result<Self> {
        let transcript = transcript
            .map(TranscriptLogger::create)
            .transpose()?
            .map(|logger| Arc::new(Mutex::new(logger)));
        Ok(Self {
            started_at: HostInstant::now(),
            transcript,
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Prints an emulator line and records it.
    pub fn emit(&self, line: &str) {
        println!("{line}");
        self.record(Role::Emulator, line);
    }

    /// Records a line without printing it (host input is already on screen).
    pub fn record(&self, role: Role, line: &str) {
        let Some(transcript) = &self.transcript else {
            return;
        };
        let mut logger = transcript.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = logger.append_line(self.elapsed(), role, line) {
            eprintln!("transcript write failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_tags_roles_and_timestamps() {
        let path = std::env::temp_dir().join(format!(
            "alarm-emulator-transcript-{}.log",
            std::process::id()
        ));
        let output = Output::new(Some(&path)).expect("create transcript");
        output.record(Role::Host, "alarm 07:00");
        output.emit("alarm set for 07:00");

        let text = fs::read_to_string(&path).expect("read transcript");
        fs::remove_file(&path).ok();
        let lines: Vec<&str> = text.lines().filter(|line| line.starts_with('[')).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("HOST> alarm 07:00"));
        assert!(lines[1].ends_with("EMU < alarm set for 07:00"));
    }
}
