//! Transient on-screen display sink
//!
//! Wraps a [`RingBuffer`] behind a mutex and forwards changes to an attached
//! [`DisplaySurface`]. Drawing is up to the surface; this sink only keeps the
//! ordered, time-stamped entries and the visibility flag.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local};

use super::buffer::RingBuffer;
use super::entry::LogEntry;
use super::error::SinkError;

/// Something that draws the transient log view
///
/// Callbacks are invoked without the sink lock held, so a surface may read
/// back from the sink. A panicking callback is caught and never reaches the
/// caller of the sink.
pub trait DisplaySurface: Send + Sync {
    /// A new entry was appended to the buffer while the view is visible
    fn on_entry_added(&self, entry: &LogEntry);

    /// The view was shown or hidden
    fn on_visibility_changed(&self, _visible: bool) {}

    /// The buffer was cleared
    fn on_cleared(&self) {}

    /// The sink is being torn down and will not call this surface again
    fn detach(&self) {}
}

/// Lifecycle of the display sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No surface attached yet
    Uninitialized,
    /// A surface is attached
    Initialized,
    /// Torn down; terminal
    TornDown,
}

struct Inner {
    buffer: RingBuffer,
    surface: Option<Arc<dyn DisplaySurface>>,
    visible: bool,
    state: DisplayState,
}

/// Thread-safe transient display sink
pub struct DisplaySink {
    inner: Mutex<Inner>,
}

impl DisplaySink {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: RingBuffer::new(max_entries),
                surface: None,
                visible: true,
                state: DisplayState::Uninitialized,
            }),
        }
    }

    /// Current lifecycle state; a poisoned lock reads as torn down
    pub fn state(&self) -> DisplayState {
        self.inner
            .lock()
            .map(|i| i.state)
            .unwrap_or(DisplayState::TornDown)
    }

    /// Attach the surface that draws this sink
    ///
    /// Replaces any previously attached surface. Fails once torn down.
    pub fn attach(&self, surface: Arc<dyn DisplaySurface>) -> Result<(), SinkError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SinkError::Unavailable("display"))?;
        if inner.state == DisplayState::TornDown {
            return Err(SinkError::Unavailable("display"));
        }
        inner.surface = Some(surface);
        inner.state = DisplayState::Initialized;
        Ok(())
    }

    /// Append an entry that stays visible for `display_for`
    ///
    /// `max_entries` is re-read on every call so capacity changes apply on the
    /// next insert. Bookkeeping happens even without a surface.
    pub fn append(
        &self,
        entry: LogEntry,
        max_entries: usize,
        display_for: Duration,
    ) -> Result<(), SinkError> {
        let entry = entry.expiring_after(display_for);

        let notify = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| SinkError::Unavailable("display"))?;
            if inner.state == DisplayState::TornDown {
                return Err(SinkError::Unavailable("display"));
            }
            inner.buffer.set_max_entries(max_entries);
            let surface = if inner.visible {
                inner.surface.clone()
            } else {
                None
            };
            let pushed = surface.as_ref().map(|_| entry.clone());
            inner.buffer.push(entry);
            surface.zip(pushed)
        };

        match notify {
            Some((surface, entry)) => SinkError::catch_panic("display", || {
                surface.on_entry_added(&entry);
                Ok(())
            }),
            None => Ok(()),
        }
    }

    /// Entries the surface should draw at `now`, oldest first
    ///
    /// Empty when no surface is attached or the view is hidden.
    pub fn render(&self, now: DateTime<Local>) -> Vec<LogEntry> {
        match self.inner.lock() {
            Ok(inner) if inner.surface.is_some() && inner.visible => {
                inner.buffer.render(now).cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Number of buffered entries, expired ones included
    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.buffer.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffered entry and tell the surface
    pub fn clear(&self) {
        let surface = match self.inner.lock() {
            Ok(mut inner) => {
                inner.buffer.clear();
                inner.surface.clone()
            }
            Err(_) => None,
        };
        if let Some(surface) = surface {
            notify_quietly("on_cleared", || surface.on_cleared());
        }
    }

    /// Whether the view is shown; a new sink starts visible
    pub fn is_visible(&self) -> bool {
        self.inner.lock().map(|i| i.visible).unwrap_or(false)
    }

    /// Show or hide the view
    ///
    /// The surface only hears about actual changes.
    pub fn set_visible(&self, visible: bool) {
        let surface = match self.inner.lock() {
            Ok(mut inner) if inner.visible != visible => {
                inner.visible = visible;
                inner.surface.clone()
            }
            _ => None,
        };
        if let Some(surface) = surface {
            notify_quietly("on_visibility_changed", || {
                surface.on_visibility_changed(visible)
            });
        }
    }

    /// Flip visibility, returning the new value
    pub fn toggle_visible(&self) -> bool {
        let visible = !self.is_visible();
        self.set_visible(visible);
        visible
    }

    /// Detach the surface and drop all entries; the sink stays torn down
    pub fn teardown(&self) {
        let surface = match self.inner.lock() {
            Ok(mut inner) => {
                inner.state = DisplayState::TornDown;
                inner.buffer.clear();
                inner.surface.take()
            }
            Err(_) => None,
        };
        if let Some(surface) = surface {
            notify_quietly("detach", || surface.detach());
        }
    }
}

fn notify_quietly(callback: &'static str, f: impl FnOnce()) {
    let result = SinkError::catch_panic("display", || {
        f();
        Ok(())
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, callback, "Display surface callback failed");
    }
}
