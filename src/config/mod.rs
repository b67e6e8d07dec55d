//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Config::default() (baseline values)
//!     → loader.rs (parse TOML, overlay known fields)
//!         → plugin tables captured raw, paired with the parse metadata
//!     → Config (owned by the host, passed by reference)
//!
//! Per plugin, on demand:
//!     Config::decode_plugin(name, &mut dest)
//!     → plugins.rs (overlay the raw table onto dest)
//!
//! Optionally:
//!     writer.rs (encode back to TOML)
//! ```
//!
//! # Design Decisions
//! - Only globally known fields are decoded up front
//! - A plugin with no table is a normal state, not an error
//! - Fragments and the metadata of their parse are stored as one value

pub mod loader;
pub mod metadata;
pub mod plugins;
pub mod schema;
pub mod writer;

pub use loader::ConfigError;
pub use metadata::{Key, MetaData};
pub use plugins::{PluginFragment, PluginTables};
pub use schema::{Config, DebugConfig, GrpcConfig, MetricsConfig};
