//! Persistent console sink
//!
//! The console is whatever subscriber the host installed for `tracing`; each
//! entry becomes one tracing event.

use super::entry::{LogEntry, Severity};

/// Destination for console output
pub trait ConsoleWriter: Send + Sync {
    fn emit(&self, entry: &LogEntry);
}

/// Emits entries as `tracing` events under the `sinkroute::console` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleWriter for TracingConsole {
    fn emit(&self, entry: &LogEntry) {
        let severity = entry.severity().as_str();
        let message = entry.message();
        match (entry.severity(), entry.error()) {
            (Severity::Info, _) => {
                tracing::info!(target: "sinkroute::console", severity, "{}", message)
            }
            (Severity::Warning, None) => {
                tracing::warn!(target: "sinkroute::console", severity, "{}", message)
            }
            (Severity::Warning, Some(err)) => tracing::warn!(
                target: "sinkroute::console",
                severity,
                error.summary = %err.summary,
                error.trace = %err.stack_trace,
                "{}",
                message
            ),
            (_, None) => {
                tracing::error!(target: "sinkroute::console", severity, "{}", message)
            }
            (_, Some(err)) => tracing::error!(
                target: "sinkroute::console",
                severity,
                error.summary = %err.summary,
                error.trace = %err.stack_trace,
                "{}",
                message
            ),
        }
    }
}
