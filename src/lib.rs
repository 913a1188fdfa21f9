//! sinkroute - in-process log routing
//!
//! A single call fans a message out to a console sink, a durable session file
//! and a transient on-screen ring buffer, each of which can be switched off at
//! run time or compiled out through cargo features.

pub mod config;
pub mod logging;
