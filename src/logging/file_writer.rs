//! Session-scoped log file
//!
//! A [`FileSession`] opens its target lazily in append mode, frames the
//! session with a start header and an end footer, and flushes after every
//! entry. All operations go through one mutex so a close never interleaves
//! with a partially written entry.

use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

use super::entry::LogEntry;
use super::error::SinkError;
use crate::config::{BuildProfile, SinkSet};

const SESSION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ENTRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Lines written below the session start marker
///
/// Built by the caller; the file session writes them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    lines: Vec<String>,
}

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metadata line
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Standard platform/product/version/build/capabilities block
    pub fn describe(
        product: &str,
        version: &str,
        profile: BuildProfile,
        capabilities: SinkSet,
    ) -> Self {
        Self::new()
            .line(format!(
                "Platform: {} ({})",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))
            .line(format!("Product: {}", product))
            .line(format!("Version: {}", version))
            .line(format!("Build: {}", profile))
            .line(format!("Capabilities: {}", capabilities))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Format the session start header
pub fn format_header(started_at: DateTime<Local>, metadata: &SessionMetadata) -> String {
    let mut out = format!(
        "=== Log Session Started: {} ===\n",
        started_at.format(SESSION_TIME_FORMAT)
    );
    for line in metadata.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Format the session end footer
pub fn format_footer(ended_at: DateTime<Local>) -> String {
    format!(
        "\n=== Log Session Ended: {} ===\n",
        ended_at.format(SESSION_TIME_FORMAT)
    )
}

/// Format one entry, including its error block if present
pub fn format_entry(entry: &LogEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] [{}] {}",
        entry.created_at().format(ENTRY_TIME_FORMAT),
        entry.severity(),
        entry.message()
    );
    if let Some(error) = entry.error() {
        let _ = writeln!(out, "Exception: {}", error.summary);
        if !error.stack_trace.is_empty() {
            out.push_str(&error.stack_trace);
            out.push('\n');
        }
    }
    out
}

/// Observable state of a file session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSessionState {
    /// Not opened yet
    Closed,
    /// Header written, accepting entries
    Open,
    /// Footer written; stays closed until re-initialized
    Ended,
    /// Opening or writing failed; disabled until re-initialized
    Disabled,
}

enum Handle {
    Closed,
    Open(File),
    Ended,
    Disabled,
}

struct Inner {
    path: PathBuf,
    metadata: SessionMetadata,
    handle: Handle,
}

impl Inner {
    fn state(&self) -> FileSessionState {
        match self.handle {
            Handle::Closed => FileSessionState::Closed,
            Handle::Open(_) => FileSessionState::Open,
            Handle::Ended => FileSessionState::Ended,
            Handle::Disabled => FileSessionState::Disabled,
        }
    }

    fn ensure_open(&mut self) -> Result<&mut File, SinkError> {
        if matches!(self.handle, Handle::Closed) {
            match open_session(&self.path, &self.metadata) {
                Ok(file) => {
                    tracing::debug!(path = %self.path.display(), "Log session opened");
                    self.handle = Handle::Open(file);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "File logging disabled");
                    self.handle = Handle::Disabled;
                    return Err(e);
                }
            }
        }

        match &mut self.handle {
            Handle::Open(file) => Ok(file),
            _ => Err(SinkError::Unavailable("file")),
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let mut file = match std::mem::replace(&mut self.handle, Handle::Ended) {
            Handle::Open(file) => file,
            other => {
                self.handle = other;
                return Ok(());
            }
        };
        let result = file
            .write_all(format_footer(Local::now()).as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| SinkError::io("Failed to write session footer", &self.path, e));
        tracing::debug!(path = %self.path.display(), "Log session closed");
        result
    }
}

fn open_session(path: &Path, metadata: &SessionMetadata) -> Result<File, SinkError> {
    if path.as_os_str().is_empty() {
        return Err(SinkError::InvalidConfiguration(
            "log file path is empty".to_string(),
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| SinkError::io("Failed to create logs directory", parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SinkError::io("Failed to open log file", path, e))?;

    file.write_all(format_header(Local::now(), metadata).as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| SinkError::io("Failed to write session header", path, e))?;

    Ok(file)
}

/// Append-mode log file for one logging session
pub struct FileSession {
    inner: Mutex<Inner>,
}

impl FileSession {
    /// Create a session for `path`; nothing touches the disk until first use
    pub fn new(path: impl Into<PathBuf>, metadata: SessionMetadata) -> Self {
        Self {
            inner: Mutex::new(Inner {
                path: path.into(),
                metadata,
                handle: Handle::Closed,
            }),
        }
    }

    /// Target path of the current session, or of the next one if none is open
    pub fn path(&self) -> PathBuf {
        self.inner
            .lock()
            .map(|i| i.path.clone())
            .unwrap_or_default()
    }

    /// Where the session is in its open/ended/disabled lifecycle
    ///
    /// A poisoned lock reads as [`FileSessionState::Disabled`].
    pub fn state(&self) -> FileSessionState {
        self.inner
            .lock()
            .map(|i| i.state())
            .unwrap_or(FileSessionState::Disabled)
    }

    /// Change the header metadata used by the next open
    pub fn set_metadata(&self, metadata: SessionMetadata) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.metadata = metadata;
        }
    }

    /// Retarget a session that has not been opened yet
    ///
    /// Returns `false` if the session is already open, ended or disabled; use
    /// [`reinit`](Self::reinit) for those.
    pub fn set_path(&self, path: impl Into<PathBuf>) -> bool {
        match self.inner.lock() {
            Ok(mut inner) if matches!(inner.handle, Handle::Closed) => {
                inner.path = path.into();
                true
            }
            _ => false,
        }
    }

    /// Open the file and write the header if not done yet
    ///
    /// After a failed open the session stays disabled and this returns
    /// [`SinkError::Unavailable`] without touching the filesystem again.
    pub fn ensure_open(&self) -> Result<(), SinkError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SinkError::Unavailable("file"))?;
        inner.ensure_open().map(|_| ())
    }

    /// Append one formatted entry and flush it
    ///
    /// The entry and its error block go out in a single write; nothing is
    /// buffered in process, so a failed write leaves no bytes behind to be
    /// flushed later. A write failure disables the session.
    pub fn write_line(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SinkError::Unavailable("file"))?;
        let line = format_entry(entry);
        let file = inner.ensure_open()?;
        let result = file.write_all(line.as_bytes()).and_then(|_| file.flush());

        if let Err(e) = result {
            let err = SinkError::io("Failed to write log entry", &inner.path, e);
            tracing::warn!(error = %err, "File logging disabled");
            inner.handle = Handle::Disabled;
            return Err(err);
        }
        Ok(())
    }

    /// Flush an open session to disk
    pub fn flush(&self) -> Result<(), SinkError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SinkError::Unavailable("file"))?;
        let path = inner.path.clone();
        match &mut inner.handle {
            Handle::Open(file) => file
                .sync_data()
                .map_err(|e| SinkError::io("Failed to flush log file", path, e)),
            _ => Ok(()),
        }
    }

    /// Write the footer and release the handle
    ///
    /// Calling this on a session that is not open does nothing.
    pub fn close(&self) -> Result<(), SinkError> {
        match self.inner.lock() {
            Ok(mut inner) => inner.close(),
            Err(poisoned) => poisoned.into_inner().close(),
        }
    }

    /// Close the current session and start over, optionally at a new path
    ///
    /// This is the only way out of the ended and disabled states.
    pub fn reinit(&self, path: Option<PathBuf>) -> Result<(), SinkError> {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let closed = inner.close();
        if let Some(path) = path {
            inner.path = path;
        }
        inner.handle = Handle::Closed;
        closed
    }
}

impl std::fmt::Debug for FileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSession")
            .field("path", &self.path())
            .field("state", &self.state())
            .finish()
    }
}
