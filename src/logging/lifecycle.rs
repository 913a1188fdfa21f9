//! Sink lifecycle controller
//!
//! Owns the single file session and the single display sink. Initialization
//! is one-time and cheap to re-check; shutdown runs once, either explicitly or
//! from `Drop` when the owner goes away.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Once;

use super::display::DisplaySink;
use super::file_writer::{FileSession, SessionMetadata};

/// Lifecycle of the whole logging facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ShuttingDown,
    Shutdown,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Ready,
            2 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Shutdown,
        }
    }
}

/// Owner of the process-wide sinks
pub struct Lifecycle {
    state: AtomicU8,
    init: Once,
    teardown_armed: AtomicBool,
    file: FileSession,
    display: DisplaySink,
}

impl Lifecycle {
    pub fn new(file: FileSession, display: DisplaySink) -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            init: Once::new(),
            teardown_armed: AtomicBool::new(false),
            file,
            display,
        }
    }

    /// Lifecycle for a log file at `path` and a display buffer of `max_entries`
    pub fn with_defaults(
        path: impl Into<std::path::PathBuf>,
        metadata: SessionMetadata,
        max_entries: usize,
    ) -> Self {
        Self::new(FileSession::new(path, metadata), DisplaySink::new(max_entries))
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `Ready` and arm the teardown hook
    ///
    /// Only the first call does any work. Sinks are not touched here; they
    /// open on first real use. Returns whether the controller accepts writes.
    pub fn initialize(&self) -> bool {
        self.init.call_once(|| {
            let moved = self
                .state
                .compare_exchange(
                    LifecycleState::Uninitialized as u8,
                    LifecycleState::Ready as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok();
            if moved {
                self.teardown_armed.store(true, Ordering::Release);
                tracing::debug!("Logging initialized");
            }
        });
        self.accepts_writes()
    }

    pub fn is_initialized(&self) -> bool {
        self.init.is_completed()
    }

    /// Whether the teardown hook has been armed by [`initialize`](Self::initialize)
    pub fn teardown_armed(&self) -> bool {
        self.teardown_armed.load(Ordering::Acquire)
    }

    /// True only while `Ready`; sinks refuse new entries in every other state
    pub fn accepts_writes(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// The owned session file
    pub fn file(&self) -> &FileSession {
        &self.file
    }

    pub fn display(&self) -> &DisplaySink {
        &self.display
    }

    /// Close the file session and tear down the display sink
    ///
    /// Runs at most once; later calls return `false` immediately. Returns
    /// after the footer has been flushed and the file handle released.
    pub fn shutdown(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            match LifecycleState::from_u8(current) {
                LifecycleState::ShuttingDown | LifecycleState::Shutdown => return false,
                _ => {}
            }
            match self.state.compare_exchange(
                current,
                LifecycleState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if let Err(e) = self.file.close() {
            tracing::warn!(error = %e, "Failed to close log session");
        }
        self.display.teardown();
        self.teardown_armed.store(false, Ordering::Release);

        self.state
            .store(LifecycleState::Shutdown as u8, Ordering::Release);
        tracing::debug!("Logging shut down");
        true
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.teardown_armed() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("file", &self.file)
            .field("display", &self.display.state())
            .finish()
    }
}
