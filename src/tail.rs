//! Follows a growing file and yields each appended line.
//!
//! Reading starts at the beginning of the file. At end of file the follower
//! sleeps and polls again; it rewinds when the file is truncated, and reopens
//! when the path is rotated to a new file or removed and recreated. An
//! unterminated line left over from the old file is dropped when that happens.

use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An ordered stream of lines appended to one file.
#[async_trait]
pub trait LineSource: Send {
    /// Path the lines come from, as configured.
    fn name(&self) -> &str;

    /// Waits for the next complete line, without its trailing `\n`.
    /// `Ok(None)` means the stream has ended.
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Identifies the file currently behind a path, to notice rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    fn of(metadata: &std::fs::Metadata) -> Option<FileId> {
        use std::os::unix::fs::MetadataExt;
        Some(FileId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_metadata: &std::fs::Metadata) -> Option<FileId> {
        None
    }
}

pub struct FileTail {
    name: String,
    path: PathBuf,
    reader: Option<BufReader<File>>,
    id: Option<FileId>,
    offset: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl FileTail {
    /// Opens `path` for following. The file must exist.
    pub async fn open(path: &str) -> io::Result<Self> {
        let mut tail = Self {
            name: path.to_string(),
            path: PathBuf::from(path),
            reader: None,
            id: None,
            offset: 0,
            pending: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        tail.reopen().await?;
        Ok(tail)
    }

    #[cfg(test)]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn reopen(&mut self) -> io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;
        self.id = FileId::of(&metadata);
        self.reader = Some(BufReader::new(file));
        self.offset = 0;
        self.discard_pending();
        Ok(())
    }

    fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!(
                path = %self.path.display(),
                bytes = self.pending.len(),
                "Dropping unterminated line"
            );
            self.pending.clear();
        }
    }

    /// Called at end of file: decides whether the current handle is still
    /// the right one to keep reading from.
    async fn check_rotation(&mut self) -> io::Result<()> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.reader.take().is_some() {
                    info!(path = %self.path.display(), "File removed, waiting for it to reappear");
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if FileId::of(&metadata) != self.id {
            info!(path = %self.path.display(), "File rotated, reopening");
            return self.reopen().await;
        }

        if metadata.len() < self.offset {
            info!(
                path = %self.path.display(),
                previous_offset = self.offset,
                current_len = metadata.len(),
                "File truncated, reading from the beginning"
            );
            if let Some(reader) = self.reader.as_mut() {
                reader.seek(SeekFrom::Start(0)).await?;
            }
            self.offset = 0;
            self.discard_pending();
        }
        Ok(())
    }

    fn take_line(&mut self) -> String {
        self.pending.pop();
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[async_trait]
impl LineSource for FileTail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                match self.reopen().await {
                    Ok(()) => {
                        debug!(path = %self.path.display(), "File reopened");
                        continue;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tokio::time::sleep(self.poll_interval).await;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };

            let read = reader.read_until(b'\n', &mut self.pending).await?;
            self.offset += read as u64;

            if self.pending.last() == Some(&b'\n') {
                return Ok(Some(self.take_line()));
            }

            self.check_rotation().await?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
