//! Log entry value type
//!
//! A single immutable record routed to every sink.

use std::fmt;

use chrono::{DateTime, Duration, Local};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Assertion,
    Exception,
}

impl Severity {
    /// Get the display name for this severity, as written to the session file
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Assertion => "Assertion",
            Severity::Exception => "Exception",
        }
    }

    /// Check if this severity reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Severity::Error | Severity::Assertion | Severity::Exception
        )
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error details carried alongside an entry
///
/// Callers translate their own error types into this form before logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    /// One-line description of the error
    pub summary: String,
    /// Captured stack trace or error chain, free text
    pub stack_trace: String,
}

impl ErrorPayload {
    pub fn new(summary: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Build a payload from any error, using its source chain as the trace
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        Self::new(err.to_string(), trace.join("\n"))
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    message: String,
    severity: Severity,
    error: Option<ErrorPayload>,
    created_at: DateTime<Local>,
    expires_at: DateTime<Local>,
}

impl LogEntry {
    /// Create a new entry stamped with the current local time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self::at(severity, message, Local::now())
    }

    /// Create a new entry with an explicit capture time
    pub fn at(severity: Severity, message: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            message: message.into(),
            severity,
            error: None,
            created_at,
            expires_at: created_at,
        }
    }

    /// Create an `Exception` entry, which always carries its payload
    pub fn exception(message: impl Into<String>, payload: ErrorPayload) -> Self {
        Self::new(Severity::Exception, message).with_error(payload)
    }

    /// Attach error details to this entry
    pub fn with_error(mut self, payload: ErrorPayload) -> Self {
        self.error = Some(payload);
        self
    }

    /// Set the expiry to `created_at + duration`
    ///
    /// Negative durations are treated as zero so `expires_at >= created_at` holds.
    pub fn expiring_after(mut self, duration: Duration) -> Self {
        let duration = duration.max(Duration::zero());
        self.expires_at = self
            .created_at
            .checked_add_signed(duration)
            .unwrap_or(self.created_at);
        self
    }

    /// The text that was logged
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Severity the entry was logged with
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Error details, if any were attached
    pub fn error(&self) -> Option<&ErrorPayload> {
        self.error.as_ref()
    }

    /// Capture time; also the timestamp written to the session file
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Last instant at which the display sink still renders this entry
    ///
    /// Equal to [`created_at`](Self::created_at) until
    /// [`expiring_after`](Self::expiring_after) is applied.
    pub fn expires_at(&self) -> DateTime<Local> {
        self.expires_at
    }

    /// Check whether the entry is still visible at `now`
    pub fn is_visible_at(&self, now: DateTime<Local>) -> bool {
        now <= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Info.as_str(), "Info");
        assert_eq!(Severity::Warning.to_string(), "Warning");
        assert_eq!(Severity::Exception.to_string(), "Exception");
    }

    #[test]
    fn test_severity_is_failure() {
        assert!(!Severity::Info.is_failure());
        assert!(!Severity::Warning.is_failure());
        assert!(Severity::Error.is_failure());
        assert!(Severity::Assertion.is_failure());
        assert!(Severity::Exception.is_failure());
    }

    #[test]
    fn test_expiry_defaults_to_creation_time() {
        let entry = LogEntry::new(Severity::Info, "hello");
        assert_eq!(entry.expires_at(), entry.created_at());
        assert!(entry.error().is_none());
    }

    #[test]
    fn test_expiring_after() {
        let entry = LogEntry::new(Severity::Info, "hello").expiring_after(Duration::seconds(5));
        assert_eq!(entry.expires_at() - entry.created_at(), Duration::seconds(5));
    }

    #[test]
    fn test_negative_duration_clamped() {
        let entry = LogEntry::new(Severity::Info, "hello").expiring_after(Duration::seconds(-3));
        assert_eq!(entry.expires_at(), entry.created_at());
    }

    #[test]
    fn test_exception_carries_payload() {
        let entry = LogEntry::exception("failed", ErrorPayload::new("boom", "at main"));
        assert_eq!(entry.severity(), Severity::Exception);
        assert_eq!(entry.error().unwrap().summary, "boom");
    }

    #[test]
    fn test_payload_from_error_chain() {
        #[derive(Debug, thiserror::Error)]
        enum LoadError {
            #[error("failed to load settings")]
            Read {
                #[source]
                source: std::io::Error,
            },
        }

        let err = LoadError::Read {
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"),
        };
        let payload = ErrorPayload::from_error(&err);
        assert_eq!(payload.summary, "failed to load settings");
        assert_eq!(payload.stack_trace, "caused by: missing file");
    }

    #[test]
    fn test_visibility_boundary() {
        let t0 = Local::now();
        let entry = LogEntry::at(Severity::Info, "x", t0).expiring_after(Duration::seconds(5));
        assert!(entry.is_visible_at(t0 + Duration::seconds(5)));
        assert!(!entry.is_visible_at(t0 + Duration::seconds(6)));
    }
}
