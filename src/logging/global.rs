//! Process-scoped logger
//!
//! Optional convenience for code that cannot be handed a [`Logger`]. The
//! logger must be installed explicitly; until then the free functions here
//! do nothing. Dropping the returned [`GlobalGuard`] shuts it down.

use std::sync::OnceLock;

use anyhow::{bail, Result};

use super::dispatcher::Logger;
use super::entry::{ErrorPayload, Severity};

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Keeps the global logger alive; shuts it down when dropped
#[must_use = "dropping the guard shuts the global logger down"]
#[derive(Debug)]
pub struct GlobalGuard {
    _private: (),
}

impl Drop for GlobalGuard {
    fn drop(&mut self) {
        if let Some(logger) = GLOBAL.get() {
            logger.shutdown();
        }
    }
}

/// Install `logger` as the process-wide logger
///
/// Fails if a logger has already been installed.
pub fn install(logger: Logger) -> Result<GlobalGuard> {
    if GLOBAL.set(logger).is_err() {
        bail!("Global logger is already installed");
    }
    Ok(GlobalGuard { _private: () })
}

/// The installed logger, if any
pub fn get() -> Option<&'static Logger> {
    GLOBAL.get()
}

pub fn log(message: impl Into<String>, verbose: bool, severity: Severity, error: Option<ErrorPayload>) {
    if let Some(logger) = get() {
        logger.log(message, verbose, severity, error);
    }
}

pub fn info(message: impl Into<String>) {
    log(message, true, Severity::Info, None);
}

pub fn warning(message: impl Into<String>) {
    log(message, true, Severity::Warning, None);
}

pub fn error(message: impl Into<String>) {
    log(message, true, Severity::Error, None);
}

pub fn exception(message: impl Into<String>, payload: ErrorPayload) {
    log(message, true, Severity::Exception, Some(payload));
}
