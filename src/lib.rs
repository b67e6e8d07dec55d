//! Two-phase configuration loader for a modular host daemon.
//!
//! Known top-level settings are decoded as soon as the file is read. Plugin
//! tables are kept raw and decoded later by the plugin that owns them.

pub mod config;
pub mod observability;

pub use config::{Config, ConfigError};
