use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::LogDestination;

impl LogDestination {
    /// Delivers one audit record.
    ///
    /// File destinations are opened, appended to and closed on every call.
    /// The record and its newline go out in a single write so concurrent
    /// dispatchers appending to the same file never split each other's lines.
    pub fn write(&self, record: &str) -> Result<()> {
        self.write_with_stdout(record, io::stdout().lock())
    }

    /// Same as [`write`](Self::write), with `stdout` standing in for the
    /// process's standard output.
    pub fn write_with_stdout<W: Write>(&self, record: &str, mut stdout: W) -> Result<()> {
        match self {
            LogDestination::Discard => Ok(()),
            LogDestination::Stdout => {
                // Failures writing to stdout are ignored.
                let _ = writeln!(stdout, "{}", record);
                Ok(())
            }
            LogDestination::File(path) => append_line(path, record).map_err(|source| Error::Sink {
                path: path.clone(),
                source,
            }),
        }
    }
}

fn append_line(path: &Path, record: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;

    let mut line = String::with_capacity(record.len() + 1);
    line.push_str(record);
    line.push('\n');
    file.write_all(line.as_bytes())
}
