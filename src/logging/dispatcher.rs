//! Log dispatcher
//!
//! [`Logger`] is the single entry point: it applies the verbosity gate,
//! initializes the lifecycle on first use and fans each entry out to the
//! console, file and display sinks. A failing or panicking sink never affects
//! the others and never surfaces to the caller.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Local};

use super::console::{ConsoleWriter, TracingConsole};
use super::display::DisplaySurface;
use super::entry::{ErrorPayload, LogEntry, Severity};
use super::error::SinkError;
use super::file_writer::{FileSessionState, SessionMetadata};
use super::lifecycle::{Lifecycle, LifecycleState};
use crate::config::{SinkConfig, SinkKind, SinkSet};

/// Values read from the config once per dispatch
struct Snapshot {
    enabled: SinkSet,
    max_screen_lines: usize,
    display_for: Duration,
}

/// Routes log entries to every enabled sink
pub struct Logger {
    config: RwLock<SinkConfig>,
    console: Box<dyn ConsoleWriter>,
    lifecycle: Lifecycle,
    console_failure_reported: AtomicBool,
    file_failure_reported: AtomicBool,
    display_failure_reported: AtomicBool,
}

impl Logger {
    /// Create a logger that writes console output through `tracing`
    pub fn new(config: SinkConfig, metadata: SessionMetadata) -> Self {
        Self::with_console(config, metadata, Box::new(TracingConsole))
    }

    /// Create a logger with a custom console destination
    pub fn with_console(
        config: SinkConfig,
        metadata: SessionMetadata,
        console: Box<dyn ConsoleWriter>,
    ) -> Self {
        let lifecycle = Lifecycle::with_defaults(
            config.log_file_path.clone(),
            metadata,
            config.effective_max_screen_lines(),
        );
        Self {
            config: RwLock::new(config),
            console,
            lifecycle,
            console_failure_reported: AtomicBool::new(false),
            file_failure_reported: AtomicBool::new(false),
            display_failure_reported: AtomicBool::new(false),
        }
    }

    /// Log `message` to every enabled sink
    ///
    /// Does nothing when `verbose` is false.
    pub fn log(
        &self,
        message: impl Into<String>,
        verbose: bool,
        severity: Severity,
        error: Option<ErrorPayload>,
    ) {
        if !verbose {
            return;
        }
        self.lifecycle.initialize();
        let entry = build_entry(message, severity, error);
        self.dispatch(&entry, SinkSet::ALL);
    }

    /// Shorthand for a verbose [`Severity::Info`] entry
    pub fn info(&self, message: impl Into<String>) {
        self.log(message, true, Severity::Info, None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(message, true, Severity::Warning, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(message, true, Severity::Error, None);
    }

    pub fn assertion(&self, message: impl Into<String>) {
        self.log(message, true, Severity::Assertion, None);
    }

    /// Log an exception; the payload's summary and trace go to the file
    pub fn exception(&self, message: impl Into<String>, payload: ErrorPayload) {
        self.log(message, true, Severity::Exception, Some(payload));
    }

    /// Log to the console sink only, bypassing the verbosity gate
    pub fn log_to_console(
        &self,
        message: impl Into<String>,
        severity: Severity,
        error: Option<ErrorPayload>,
    ) {
        self.log_direct(message, severity, error, SinkSet::only(SinkKind::Console));
    }

    /// Log to the file sink only, bypassing the verbosity gate
    pub fn log_to_file(
        &self,
        message: impl Into<String>,
        severity: Severity,
        error: Option<ErrorPayload>,
    ) {
        self.log_direct(message, severity, error, SinkSet::only(SinkKind::File));
    }

    /// Log to the display sink only, bypassing the verbosity gate
    pub fn log_to_display(
        &self,
        message: impl Into<String>,
        severity: Severity,
        error: Option<ErrorPayload>,
    ) {
        self.log_direct(message, severity, error, SinkSet::only(SinkKind::Display));
    }

    fn log_direct(
        &self,
        message: impl Into<String>,
        severity: Severity,
        error: Option<ErrorPayload>,
        targets: SinkSet,
    ) {
        self.lifecycle.initialize();
        let entry = build_entry(message, severity, error);
        self.dispatch(&entry, targets);
    }

    fn snapshot(&self) -> Snapshot {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            enabled: config.enabled_sinks(),
            max_screen_lines: config.effective_max_screen_lines(),
            display_for: config.display_duration(),
        }
    }

    fn dispatch(&self, entry: &LogEntry, targets: SinkSet) {
        let snapshot = self.snapshot();
        let active = SinkSet::compiled()
            .intersect(snapshot.enabled)
            .intersect(targets);

        if SinkSet::compiled().console && active.console {
            if let Err(e) = self.emit_console(entry) {
                self.report_failure(SinkKind::Console, &e, &snapshot);
            }
        }

        if SinkSet::compiled().file && active.file {
            if let Err(e) = self.write_file(entry) {
                self.report_failure(SinkKind::File, &e, &snapshot);
            }
        }

        if SinkSet::compiled().display && active.display {
            if let Err(e) = self.append_display(entry.clone(), &snapshot) {
                self.report_failure(SinkKind::Display, &e, &snapshot);
            }
        }
    }

    fn emit_console(&self, entry: &LogEntry) -> Result<(), SinkError> {
        SinkError::catch_panic("console", || {
            self.console.emit(entry);
            Ok(())
        })
    }

    fn write_file(&self, entry: &LogEntry) -> Result<(), SinkError> {
        if !self.lifecycle.accepts_writes() {
            return Err(SinkError::Unavailable("file"));
        }
        SinkError::catch_panic("file", || self.lifecycle.file().write_line(entry))
    }

    fn append_display(&self, entry: LogEntry, snapshot: &Snapshot) -> Result<(), SinkError> {
        // Torn down after shutdown; not reported
        if !self.lifecycle.accepts_writes() {
            return Err(SinkError::Unavailable("display"));
        }
        SinkError::catch_panic("display", || {
            self.lifecycle.display().append(
                entry,
                snapshot.max_screen_lines,
                snapshot.display_for,
            )
        })
    }

    fn failure_reported(&self, kind: SinkKind) -> &AtomicBool {
        match kind {
            SinkKind::Console => &self.console_failure_reported,
            SinkKind::File => &self.file_failure_reported,
            SinkKind::Display => &self.display_failure_reported,
        }
    }

    /// Report the first fatal failure of a sink once through the other sinks
    ///
    /// Errors raised while delivering the notice are dropped.
    fn report_failure(&self, failed: SinkKind, error: &SinkError, snapshot: &Snapshot) {
        if !error.is_fatal() || self.failure_reported(failed).swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(sink = %failed, error = %error, "Reporting sink failure");

        let notice = LogEntry::new(
            Severity::Warning,
            format!("{} logging disabled: {}", failed.label(), error.user_message()),
        );
        let remaining = SinkSet::compiled().intersect(snapshot.enabled);
        if remaining.console && failed != SinkKind::Console {
            let _ = self.emit_console(&notice);
        }
        if remaining.file && failed != SinkKind::File {
            let _ = self.write_file(&notice);
        }
        if remaining.display && failed != SinkKind::Display {
            let _ = self.append_display(notice, snapshot);
        }
    }

    /// Sinks that are both compiled in and switched on
    pub fn capabilities(&self) -> SinkSet {
        SinkSet::compiled().intersect(self.snapshot().enabled)
    }

    /// Current configuration
    pub fn config(&self) -> SinkConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the configuration; takes effect on the next log call
    ///
    /// A new log file path only retargets a session that has not been opened
    /// yet. Use [`reinit_file_session`](Self::reinit_file_session) to move an
    /// open session.
    pub fn update_config(&self, update: impl FnOnce(&mut SinkConfig)) {
        let path = {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            let before = config.log_file_path.clone();
            update(&mut *config);
            (config.log_file_path != before).then(|| config.log_file_path.clone())
        };

        if let Some(path) = path {
            self.lifecycle.file().set_path(path);
        }
    }

    /// Close the current file session and start a fresh one at the configured path
    ///
    /// Clears the disabled state left by an earlier failure.
    pub fn reinit_file_session(&self) -> Result<(), SinkError> {
        if matches!(
            self.lifecycle.state(),
            LifecycleState::ShuttingDown | LifecycleState::Shutdown
        ) {
            return Err(SinkError::Unavailable("file"));
        }
        let path = self.config().log_file_path;
        self.file_failure_reported.store(false, Ordering::Release);
        self.lifecycle.file().reinit(Some(path))
    }

    /// Header lines for the next session that gets opened
    pub fn set_session_metadata(&self, metadata: SessionMetadata) {
        self.lifecycle.file().set_metadata(metadata);
    }

    /// Path of the current (or next) session file
    pub fn log_file_path(&self) -> PathBuf {
        self.lifecycle.file().path()
    }

    pub fn file_state(&self) -> FileSessionState {
        self.lifecycle.file().state()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Flush the open file session, if any
    pub fn flush(&self) {
        if let Err(e) = self.lifecycle.file().flush() {
            tracing::warn!(error = %e, "Failed to flush log file");
        }
    }

    /// Attach the surface that draws the display sink
    pub fn attach_surface(&self, surface: Arc<dyn DisplaySurface>) -> Result<(), SinkError> {
        self.lifecycle.display().attach(surface)
    }

    /// Entries the display surface should draw at `now`
    pub fn visible_display_entries(&self, now: DateTime<Local>) -> Vec<LogEntry> {
        self.lifecycle.display().render(now)
    }

    /// Number of entries held by the display buffer, expired ones included
    pub fn display_len(&self) -> usize {
        self.lifecycle.display().len()
    }

    /// Empty the display buffer
    pub fn clear_display(&self) {
        self.lifecycle.display().clear();
    }

    pub fn set_display_visible(&self, visible: bool) {
        self.lifecycle.display().set_visible(visible);
    }

    pub fn toggle_display_visible(&self) -> bool {
        self.lifecycle.display().toggle_visible()
    }

    /// Flush and close everything; later log calls reach the console only
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

fn build_entry(message: impl Into<String>, severity: Severity, error: Option<ErrorPayload>) -> LogEntry {
    let entry = LogEntry::new(severity, message);
    match error {
        Some(payload) => entry.with_error(payload),
        None => entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::display::tests::{PanickingSurface, RecordingSurface};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingConsole {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingConsole {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl ConsoleWriter for RecordingConsole {
        fn emit(&self, entry: &LogEntry) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{}: {}", entry.severity(), entry.message()));
        }
    }

    struct PanickingConsole;

    impl ConsoleWriter for PanickingConsole {
        fn emit(&self, entry: &LogEntry) {
            panic!("console failed on {}", entry.message());
        }
    }

    fn logger(config: SinkConfig) -> (Logger, RecordingConsole) {
        let console = RecordingConsole::default();
        let logger = Logger::with_console(config, SessionMetadata::new(), Box::new(console.clone()));
        (logger, console)
    }

    fn config_in(temp_dir: &TempDir) -> SinkConfig {
        SinkConfig::default().with_log_file_path(temp_dir.path().join("logs").join("session.log"))
    }

    fn read_log(temp_dir: &TempDir) -> String {
        std::fs::read_to_string(temp_dir.path().join("logs").join("session.log")).unwrap()
    }

    #[test]
    fn test_log_reaches_all_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));
        logger
            .attach_surface(Arc::new(RecordingSurface::default()))
            .unwrap();

        logger.info("hello");

        assert_eq!(console.lines(), vec!["Info: hello"]);
        assert_eq!(logger.display_len(), 1);
        assert_eq!(logger.visible_display_entries(Local::now()).len(), 1);
        assert!(read_log(&temp_dir).contains("] [Info] hello"));
        assert_eq!(logger.lifecycle_state(), LifecycleState::Ready);
    }

    #[test]
    fn test_non_verbose_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));

        logger.log("skipped", false, Severity::Error, None);

        assert!(console.lines().is_empty());
        assert_eq!(logger.display_len(), 0);
        assert_eq!(logger.file_state(), FileSessionState::Closed);
        assert_eq!(logger.lifecycle_state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_all_sinks_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir).with_sinks(SinkSet::NONE);
        let (logger, console) = logger(config);

        logger.log("nothing", true, Severity::Info, None);

        assert!(console.lines().is_empty());
        assert_eq!(logger.display_len(), 0);
        assert!(!temp_dir.path().join("logs").exists());
        assert_eq!(logger.lifecycle_state(), LifecycleState::Ready);
        assert!(logger.capabilities().is_empty());
    }

    #[test]
    fn test_scenario_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _console) = logger(config_in(&temp_dir));

        logger.log("A", true, Severity::Info, None);
        logger.log(
            "B",
            true,
            Severity::Error,
            Some(ErrorPayload::new("failure", "boom")),
        );
        logger.shutdown();

        let content = read_log(&temp_dir);
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("=== Log Session Started:"));
        assert!(lines.iter().any(|l| l.ends_with("] [Info] A")));
        let b = lines.iter().position(|l| l.ends_with("] [Error] B")).unwrap();
        assert!(lines[b + 1].starts_with("Exception:"));
        assert_eq!(lines[b + 2], "boom");
        assert!(lines.last().unwrap().starts_with("=== Log Session Ended:"));
    }

    #[test]
    fn test_file_failure_is_isolated_and_reported_once() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let config = SinkConfig::default().with_log_file_path(blocker.join("session.log"));
        let (logger, console) = logger(config);

        logger.info("first");
        logger.info("second");

        let lines = console.lines();
        assert_eq!(lines[0], "Info: first");
        assert!(lines[1].starts_with("Warning: File logging disabled:"));
        assert_eq!(lines[2], "Info: second");
        assert_eq!(lines.len(), 3);

        // notice went to the display buffer as well
        assert_eq!(logger.display_len(), 3);
        assert_eq!(logger.file_state(), FileSessionState::Disabled);
    }

    #[test]
    fn test_direct_entry_points_skip_other_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));

        logger.log_to_console("console only", Severity::Warning, None);
        assert_eq!(console.lines(), vec!["Warning: console only"]);
        assert_eq!(logger.display_len(), 0);
        assert_eq!(logger.file_state(), FileSessionState::Closed);

        logger.log_to_display("display only", Severity::Info, None);
        assert_eq!(console.lines().len(), 1);
        assert_eq!(logger.display_len(), 1);
        assert_eq!(logger.file_state(), FileSessionState::Closed);

        logger.log_to_file("file only", Severity::Assertion, None);
        assert_eq!(console.lines().len(), 1);
        assert_eq!(logger.display_len(), 1);
        assert!(read_log(&temp_dir).contains("] [Assertion] file only"));
    }

    #[test]
    fn test_direct_entry_points_respect_enablement() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir).with_sinks(SinkSet::NONE);
        let (logger, console) = logger(config);

        logger.log_to_console("x", Severity::Info, None);
        logger.log_to_file("x", Severity::Info, None);
        logger.log_to_display("x", Severity::Info, None);

        assert!(console.lines().is_empty());
        assert_eq!(logger.display_len(), 0);
        assert!(!temp_dir.path().join("logs").exists());
    }

    #[test]
    fn test_capacity_change_applies_on_next_insert() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir).with_sinks(SinkSet {
            console: false,
            file: false,
            display: true,
        });
        let (logger, _console) = logger(config);

        for i in 0..10 {
            logger.info(format!("msg {}", i));
        }
        assert_eq!(logger.display_len(), 10);

        logger.update_config(|c| c.max_screen_lines = 3);
        assert_eq!(logger.display_len(), 10);

        logger.info("msg 10");
        assert_eq!(logger.display_len(), 3);
    }

    #[test]
    fn test_update_config_toggles_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));

        logger.update_config(|c| c.console_enabled = false);
        logger.info("quiet");
        assert!(console.lines().is_empty());
        assert!(!logger.capabilities().console);

        logger.update_config(|c| c.console_enabled = true);
        logger.info("loud");
        assert_eq!(console.lines(), vec!["Info: loud"]);
    }

    #[test]
    fn test_path_change_before_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _console) = logger(config_in(&temp_dir));
        let moved = temp_dir.path().join("moved.log");

        logger.update_config(|c| c.log_file_path = moved.clone());
        logger.info("hello");

        assert_eq!(logger.log_file_path(), moved);
        assert!(moved.exists());
    }

    #[test]
    fn test_reinit_file_session_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let config = SinkConfig::default().with_log_file_path(blocker.join("session.log"));
        let (logger, _console) = logger(config);

        logger.info("lost");
        assert_eq!(logger.file_state(), FileSessionState::Disabled);

        let good = temp_dir.path().join("good.log");
        logger.update_config(|c| c.log_file_path = good.clone());
        logger.reinit_file_session().unwrap();
        logger.info("kept");
        logger.shutdown();

        let content = std::fs::read_to_string(&good).unwrap();
        assert!(content.contains("] [Info] kept"));
        assert!(!content.contains("lost"));
    }

    #[test]
    fn test_shutdown_stops_file_and_display() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));

        logger.info("before");
        logger.shutdown();
        logger.shutdown();
        logger.info("after");

        let content = read_log(&temp_dir);
        assert!(!content.contains("after"));
        assert_eq!(content.matches("=== Log Session Ended:").count(), 1);
        assert_eq!(logger.display_len(), 0);
        assert_eq!(console.lines(), vec!["Info: before", "Info: after"]);
        assert!(logger.reinit_file_session().is_err());
    }

    #[test]
    fn test_drop_writes_footer() {
        let temp_dir = TempDir::new().unwrap();
        {
            let (logger, _console) = logger(config_in(&temp_dir));
            logger.info("bye");
        }
        let content = read_log(&temp_dir);
        assert_eq!(content.matches("=== Log Session Ended:").count(), 1);
    }

    #[test]
    fn test_display_visibility_controls() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _console) = logger(config_in(&temp_dir));
        logger
            .attach_surface(Arc::new(RecordingSurface::default()))
            .unwrap();

        logger.info("shown");
        logger.set_display_visible(false);
        assert!(logger.visible_display_entries(Local::now()).is_empty());
        assert!(logger.toggle_display_visible());
        assert_eq!(logger.visible_display_entries(Local::now()).len(), 1);

        logger.clear_display();
        assert_eq!(logger.display_len(), 0);
    }

    #[test]
    fn test_concurrent_logging() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));
        let logger = Arc::new(logger);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        logger.info(format!("thread {} msg {}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        logger.shutdown();

        assert_eq!(console.lines().len(), 100);
        let content = read_log(&temp_dir);
        assert_eq!(content.lines().filter(|l| l.contains("] [Info] thread ")).count(), 100);
    }

    #[test]
    fn test_panicking_surface_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = logger(config_in(&temp_dir));
        logger.attach_surface(Arc::new(PanickingSurface)).unwrap();

        logger.info("x");
        logger.info("y");

        let lines = console.lines();
        assert_eq!(lines[0], "Info: x");
        assert_eq!(lines[1], "Warning: Display logging disabled: display sink panicked");
        assert_eq!(lines[2], "Info: y");
        assert_eq!(lines.len(), 3);

        let content = read_log(&temp_dir);
        assert!(content.contains("] [Info] x"));
        assert!(content.contains("] [Warning] Display logging disabled"));
        assert!(content.contains("] [Info] y"));

        // Both entries were buffered before the surface callback ran
        assert_eq!(logger.display_len(), 2);
    }

    #[test]
    fn test_panicking_console_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let logger = Logger::with_console(
            config_in(&temp_dir),
            SessionMetadata::new(),
            Box::new(PanickingConsole),
        );
        let surface = Arc::new(RecordingSurface::default());
        logger.attach_surface(surface.clone()).unwrap();

        logger.info("x");
        logger.info("y");
        logger.shutdown();

        // The notice is delivered before the entry that triggered it reaches the other sinks
        let content = read_log(&temp_dir);
        assert!(content.contains("] [Info] x"));
        assert_eq!(
            content.matches("Console logging disabled: console sink panicked").count(),
            1
        );
        assert!(content.contains("] [Info] y"));
        assert_eq!(
            *surface.added.lock().unwrap(),
            vec![
                "Console logging disabled: console sink panicked",
                "x",
                "y"
            ]
        );
    }
}
