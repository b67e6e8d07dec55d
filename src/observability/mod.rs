//! Observability subsystem.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary, which calls [`logging::init`] once the configuration is loaded.

pub mod logging;
