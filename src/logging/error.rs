//! Sink failure taxonomy

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use thiserror::Error;

/// Failure raised by an individual sink
///
/// These never escape the dispatcher; they are handled at the sink boundary.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink has no target yet (no display surface, no open file) or has been torn down
    #[error("{0} sink is unavailable")]
    Unavailable(&'static str),

    /// Creating, writing or flushing the log file failed
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration cannot be used, e.g. an empty log file path
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The sink or one of its callbacks panicked; the panic was caught at the sink boundary
    #[error("{0} sink panicked")]
    Panicked(&'static str),
}

impl SinkError {
    /// Run one sink call, turning a panic into [`SinkError::Panicked`]
    pub(crate) fn catch_panic<T>(
        sink: &'static str,
        f: impl FnOnce() -> Result<T, SinkError>,
    ) -> Result<T, SinkError> {
        std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(Err(SinkError::Panicked(sink)))
    }

    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Check whether this failure should permanently disable the sink
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SinkError::Unavailable(_))
    }

    /// Short description suitable for reporting through the remaining sinks
    pub fn user_message(&self) -> String {
        match self {
            SinkError::Io {
                context, source, ..
            } => match categorize_io_error(source) {
                DiskErrorKind::Other => format!("{}: {}", context, source),
                kind => format!("{}: {}", context, kind.user_message()),
            },
            other => other.to_string(),
        }
    }
}

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O error",
        }
    }
}

/// Categorize an IO error
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 (Linux) / 69 (macOS)
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}
