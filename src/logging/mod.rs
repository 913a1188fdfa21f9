//! Logging system for sinkroute
//!
//! Routes each entry to a console sink (tracing events), a session log file
//! and an in-memory ring buffer for on-screen display.

mod buffer;
mod console;
mod dispatcher;
mod display;
mod entry;
mod error;
mod file_writer;
pub mod global;
mod lifecycle;

pub use buffer::{RingBuffer, DEFAULT_MAX_ENTRIES};
pub use console::{ConsoleWriter, TracingConsole};
pub use dispatcher::Logger;
pub use display::{DisplaySink, DisplayState, DisplaySurface};
pub use entry::{ErrorPayload, LogEntry, Severity};
pub use error::{categorize_io_error, DiskErrorKind, SinkError};
pub use file_writer::{
    format_entry, format_footer, format_header, FileSession, FileSessionState, SessionMetadata,
};
pub use lifecycle::{Lifecycle, LifecycleState};
