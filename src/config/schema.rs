//! Configuration schema definitions.
//!
//! Defines the top-level daemon configuration. Known sections derive Serde
//! traits; plugin-owned sections are carried opaquely in [`PluginTables`] and
//! decoded later by whichever plugin asks for them.

use serde::{Deserialize, Serialize};

use crate::config::plugins::PluginTables;

/// Default persistent data directory.
pub const DEFAULT_ROOT: &str = "/var/lib/hostd";
/// Default runtime state directory.
pub const DEFAULT_STATE: &str = "/run/hostd";
/// Default control socket path.
pub const DEFAULT_GRPC_SOCKET: &str = "/run/hostd/hostd.sock";
/// Default debug socket path.
pub const DEFAULT_DEBUG_SOCKET: &str = "/run/hostd/debug.sock";
/// Default log level.
pub const DEFAULT_DEBUG_LEVEL: &str = "info";
/// Default snapshot driver.
pub const DEFAULT_SNAPSHOTTER: &str = "overlay";

/// Root configuration for the host daemon.
///
/// Scalar fields are declared before tables so the encoder never has to emit
/// a bare value after a table header.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory where runtime state is stored.
    pub state: String,

    /// Directory where persistent data is stored.
    pub root: String,

    /// Snapshot driver to use.
    pub snapshotter: String,

    /// Run the daemon as a child subreaper.
    pub subreaper: bool,

    /// Control endpoint settings.
    pub grpc: GrpcConfig,

    /// Debug and profiling settings.
    pub debug: DebugConfig,

    /// Metrics and monitoring settings.
    pub metrics: MetricsConfig,

    /// Plugin tables, held opaque until a plugin resolves its own.
    #[serde(default, skip_deserializing, skip_serializing_if = "PluginTables::is_empty")]
    pub plugins: PluginTables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE.to_string(),
            root: DEFAULT_ROOT.to_string(),
            snapshotter: DEFAULT_SNAPSHOTTER.to_string(),
            subreaper: false,
            grpc: GrpcConfig::default(),
            debug: DebugConfig::default(),
            metrics: MetricsConfig::default(),
            plugins: PluginTables::default(),
        }
    }
}

/// Control endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GrpcConfig {
    /// Socket path the control endpoint listens on.
    pub socket: String,

    /// User id owning the socket; `-1` leaves it unchanged.
    pub uid: i64,

    /// Group id owning the socket; `-1` leaves it unchanged.
    pub gid: i64,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            socket: DEFAULT_GRPC_SOCKET.to_string(),
            uid: 0,
            gid: 0,
        }
    }
}

/// Debug endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebugConfig {
    /// Socket path for the debug endpoint.
    pub socket: String,

    /// Log verbosity (`"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`).
    pub level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            socket: DEFAULT_DEBUG_SOCKET.to_string(),
            level: DEFAULT_DEBUG_LEVEL.to_string(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Listen address for the metrics endpoint; empty disables it.
    pub address: String,
}
