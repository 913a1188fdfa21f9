//! Configuration management for sinkroute
//!
//! Which sinks are active is decided twice: once at build time through the
//! `console`, `file` and `display` cargo features, and once at run time
//! through [`SinkConfig`].

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the session log inside the logs directory
pub const LOG_FILE_NAME: &str = "session.log";

const MAX_DISPLAY_SECONDS: f64 = 1.0e9;

/// An individual logging destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Persistent console (tracing events)
    Console,
    /// Durable session file
    File,
    /// Transient on-screen ring buffer
    Display,
}

impl SinkKind {
    pub const ALL: [SinkKind; 3] = [SinkKind::Console, SinkKind::File, SinkKind::Display];

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Display => "display",
        }
    }

    /// Capitalized name for the start of a message
    pub fn label(&self) -> &'static str {
        match self {
            SinkKind::Console => "Console",
            SinkKind::File => "File",
            SinkKind::Display => "Display",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Small fixed set of sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkSet {
    pub console: bool,
    pub file: bool,
    pub display: bool,
}

impl SinkSet {
    pub const NONE: SinkSet = SinkSet {
        console: false,
        file: false,
        display: false,
    };

    pub const ALL: SinkSet = SinkSet {
        console: true,
        file: true,
        display: true,
    };

    /// Sinks linked into this binary
    pub const fn compiled() -> SinkSet {
        SinkSet {
            console: cfg!(feature = "console"),
            file: cfg!(feature = "file"),
            display: cfg!(feature = "display"),
        }
    }

    /// Capability set a build of the given kind ships with
    ///
    /// `suppress_release_file_log` is the persisted user preference that turns
    /// file logging off for release builds.
    pub fn for_profile(profile: BuildProfile, suppress_release_file_log: bool) -> SinkSet {
        match profile {
            BuildProfile::Editor => SinkSet::ALL,
            BuildProfile::Development => SinkSet {
                console: false,
                file: true,
                display: true,
            },
            BuildProfile::Release => SinkSet {
                console: false,
                file: !suppress_release_file_log,
                display: false,
            },
        }
    }

    /// Set holding a single sink
    pub fn only(kind: SinkKind) -> SinkSet {
        SinkSet {
            console: kind == SinkKind::Console,
            file: kind == SinkKind::File,
            display: kind == SinkKind::Display,
        }
    }

    pub fn contains(&self, kind: SinkKind) -> bool {
        match kind {
            SinkKind::Console => self.console,
            SinkKind::File => self.file,
            SinkKind::Display => self.display,
        }
    }

    pub fn intersect(&self, other: SinkSet) -> SinkSet {
        SinkSet {
            console: self.console && other.console,
            file: self.file && other.file,
            display: self.display && other.display,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.console || self.file || self.display)
    }

    /// Members in a stable order: console, file, display
    pub fn iter(&self) -> impl Iterator<Item = SinkKind> + '_ {
        SinkKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Display for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Kind of build producing the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProfile {
    /// Full interactive tooling environment
    Editor,
    /// Debug/development build
    Development,
    /// Shipping build
    Release,
}

impl BuildProfile {
    /// Profile of the running binary, based on debug assertions
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildProfile::Development
        } else {
            BuildProfile::Release
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildProfile::Editor => "Editor",
            BuildProfile::Development => "Development",
            BuildProfile::Release => "Release",
        })
    }
}

/// Runtime sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinkConfig {
    /// Emit entries as tracing events
    #[serde(default = "default_true")]
    pub console_enabled: bool,

    /// Append entries to the session log file
    #[serde(default = "default_true")]
    pub file_enabled: bool,

    /// Keep entries in the on-screen ring buffer
    #[serde(default = "default_true")]
    pub display_enabled: bool,

    /// Ring buffer capacity (default: 25, minimum 1)
    #[serde(default = "default_max_screen_lines")]
    pub max_screen_lines: usize,

    /// Seconds an entry stays visible on screen (default: 5.0)
    #[serde(default = "default_screen_display_seconds")]
    pub screen_display_seconds: f64,

    /// Session log file path
    #[serde(default = "default_log_path")]
    pub log_file_path: PathBuf,

    /// Turn the file sink off in release builds
    #[serde(default)]
    pub suppress_release_file_log: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_screen_lines() -> usize {
    crate::logging::DEFAULT_MAX_ENTRIES
}

fn default_screen_display_seconds() -> f64 {
    5.0
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: true,
            display_enabled: true,
            max_screen_lines: default_max_screen_lines(),
            screen_display_seconds: default_screen_display_seconds(),
            log_file_path: default_log_path(),
            suppress_release_file_log: false,
        }
    }
}

impl SinkConfig {
    /// Config with only the sinks a build profile ships with
    pub fn for_profile(profile: BuildProfile) -> Self {
        Self::default().with_sinks(SinkSet::for_profile(profile, false))
    }

    /// Config with every sink switched off
    pub fn disabled() -> Self {
        Self::default().with_sinks(SinkSet::NONE)
    }

    /// Replace the three enable switches
    pub fn with_sinks(mut self, sinks: SinkSet) -> Self {
        self.console_enabled = sinks.console;
        self.file_enabled = sinks.file;
        self.display_enabled = sinks.display;
        self
    }

    pub fn with_log_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file_path = path.into();
        self
    }

    /// Runtime switches as a set
    pub fn enabled_sinks(&self) -> SinkSet {
        SinkSet {
            console: self.console_enabled,
            file: self.file_enabled && !self.release_file_suppressed(),
            display: self.display_enabled,
        }
    }

    fn release_file_suppressed(&self) -> bool {
        self.suppress_release_file_log && BuildProfile::current() == BuildProfile::Release
    }

    /// Ring buffer capacity, never below one
    pub fn effective_max_screen_lines(&self) -> usize {
        self.max_screen_lines.max(1)
    }

    /// Display duration, clamped to a finite non-negative value
    pub fn display_duration(&self) -> chrono::Duration {
        let secs = if self.screen_display_seconds.is_finite() {
            self.screen_display_seconds.clamp(0.0, MAX_DISPLAY_SECONDS)
        } else {
            0.0
        };
        chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
    }

    /// Load configuration from the default location
    ///
    /// Without a config file the sinks come from the build profile's mapping.
    pub fn load_for_profile(profile: BuildProfile) -> Result<Self> {
        Self::load_or(&config_file_path(), || Self::for_profile(profile))
    }

    /// Load configuration from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_or(path, Self::default)
    }

    /// Load configuration from `path`, or `fallback()` if the file does not exist
    pub fn load_or(path: &Path, fallback: impl FnOnce() -> Self) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(fallback())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_file_path();
        std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
        self.save_to(&path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the base configuration directory (<data dir>/sinkroute)
/// Falls back to ./.sinkroute if no platform data directory is available
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| PathBuf::from(".sinkroute"))
}

/// Try to get the base configuration directory
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sinkroute"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Default session log file path
pub fn default_log_path() -> PathBuf {
    logs_dir().join(LOG_FILE_NAME)
}
