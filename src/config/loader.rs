//! Configuration loading from disk.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::Error as _;
use thiserror::Error;

use crate::config::metadata::{undecoded_keys, Key, MetaData};
use crate::config::plugins::{PluginFragment, PluginTables};
use crate::config::schema::Config;

/// Name of the table holding plugin-owned sections.
pub const PLUGINS_KEY: &str = "plugins";

/// Error type for configuration loading, plugin resolution and encoding.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is malformed or a known field has the wrong type.
    #[error("failed to decode config{}: {source}", origin_suffix(.origin))]
    Decode {
        origin: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    /// A plugin fragment does not match the shape its plugin asked for.
    #[error("failed to decode plugin {name:?} from {key}: {source}")]
    PluginDecode {
        name: String,
        key: Key,
        #[source]
        source: toml::de::Error,
    },

    /// A plugin destination could not be encoded to overlay the fragment onto.
    #[error("failed to encode destination for plugin {name:?} from {key}: {source}")]
    PluginDestination {
        name: String,
        key: Key,
        #[source]
        source: toml::ser::Error,
    },

    /// The configuration could not be encoded.
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The encoded configuration could not be written out.
    #[error("failed to write config: {0}")]
    Write(#[source] io::Error),
}

impl ConfigError {
    /// True when the configuration file does not exist.
    ///
    /// Hosts typically fall back to [`Config::default`] in that case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

fn origin_suffix(origin: &Option<PathBuf>) -> String {
    match origin {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

impl Config {
    /// Load configuration from a TOML file on top of the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        config.load_into(path)?;
        Ok(config)
    }

    /// Decode a TOML file into this configuration.
    ///
    /// Only keys present in the file are overwritten. The plugin tables and
    /// their metadata are replaced by those of this file.
    pub fn load_into(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_into(&content, Some(path))
    }

    /// Decode TOML text into this configuration.
    ///
    /// On error `self` is left untouched.
    pub fn decode_into(&mut self, text: &str, origin: Option<&Path>) -> Result<(), ConfigError> {
        let decode_err = |source: toml::de::Error| ConfigError::Decode {
            origin: origin.map(Path::to_path_buf),
            source,
        };

        let mut document: toml::Table = toml::from_str(text).map_err(decode_err)?;
        let mut meta = MetaData::new(origin, &document);

        let mut base = table_of(&*self)?;
        base.remove(PLUGINS_KEY);

        let mut fragments = BTreeMap::new();
        if let Some(value) = document.remove(PLUGINS_KEY) {
            let tables = match value {
                toml::Value::Table(tables) => tables,
                other => {
                    return Err(decode_err(toml::de::Error::custom(format!(
                        "`{PLUGINS_KEY}` must be a table, found {}",
                        other.type_str()
                    ))))
                }
            };
            // Entries are captured whatever their type; only the owning
            // plugin's decode decides whether the shape fits.
            for (name, value) in tables {
                let key = Key::root(PLUGINS_KEY).child(&name);
                fragments.insert(name, PluginFragment::new(key, value));
            }
        }

        // Unknown top-level tables belong to plugins too. A name already
        // claimed under `plugins` keeps that fragment; the duplicate stays in
        // the document and is reported as undecoded.
        let captured: Vec<String> = document
            .iter()
            .filter(|(name, value)| {
                value.is_table() && !base.contains_key(*name) && !fragments.contains_key(*name)
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in captured {
            if let Some(value) = document.remove(&name) {
                fragments.insert(name.clone(), PluginFragment::new(Key::root(&name), value));
            }
        }

        let known = document.clone();
        merge_tables(&mut base, document);
        let decoded: Config = toml::Value::Table(base).try_into().map_err(decode_err)?;

        let undecoded = undecoded_keys(&known, &table_of(&decoded)?);
        for key in &undecoded {
            tracing::warn!(key = %key, "Unknown configuration key ignored");
        }
        meta.set_undecoded(undecoded);

        *self = Config {
            plugins: PluginTables::new(fragments, meta),
            ..decoded
        };

        tracing::debug!(
            origin = ?origin,
            plugins = ?self.plugins.names().collect::<Vec<_>>(),
            "Configuration decoded"
        );
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut config = Config::default();
        config.decode_into(text, None)?;
        Ok(config)
    }
}

/// Encode a value as a TOML table; non-table values yield an empty table.
pub(crate) fn table_of<T: serde::Serialize + ?Sized>(value: &T) -> Result<toml::Table, toml::ser::Error> {
    match toml::Value::try_from(value)? {
        toml::Value::Table(table) => Ok(table),
        _ => Ok(toml::Table::new()),
    }
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other value
/// replaces what was there.
pub(crate) fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg: Config = "".parse().expect("empty document");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_single_field_overrides_only_that_field() {
        let cfg: Config = "snapshotter = \"btrfs\"".parse().expect("decode");

        let mut expected = Config::default();
        expected.snapshotter = "btrfs".to_string();
        assert_eq!(cfg, expected);
    }

    #[test]
    fn test_nested_field_keeps_sibling_defaults() {
        let cfg: Config = "[grpc]\nuid = 1000\n".parse().expect("decode");

        assert_eq!(cfg.grpc.uid, 1000);
        assert_eq!(cfg.grpc.gid, 0);
        assert_eq!(cfg.grpc.socket, "/run/hostd/hostd.sock");
    }

    #[test]
    fn test_decode_into_overlays_existing_values() {
        let mut cfg = Config::default();
        cfg.root = "/srv/hostd".to_string();
        cfg.debug.level = "debug".to_string();

        cfg.decode_into("[debug]\nsocket = \"/tmp/debug.sock\"\n", None)
            .expect("decode");

        assert_eq!(cfg.root, "/srv/hostd");
        assert_eq!(cfg.debug.level, "debug");
        assert_eq!(cfg.debug.socket, "/tmp/debug.sock");
    }

    #[test]
    fn test_unterminated_table_header_is_decode_error() {
        let err = "[grpc\nuid = 1\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Decode { origin: None, .. }));
    }

    #[test]
    fn test_known_field_type_mismatch_is_decode_error() {
        let err = "subreaper = \"yes\"".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));

        let err = "[grpc]\ngid = \"wheel\"\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_socket_ids_accept_any_integer() {
        let cfg: Config = "[grpc]\nuid = -1\ngid = -1\n".parse().expect("unset sentinel");
        assert_eq!(cfg.grpc.uid, -1);
        assert_eq!(cfg.grpc.gid, -1);

        let cfg: Config = format!("[grpc]\nuid = 4294967296\ngid = {}\n", i64::MAX)
            .parse()
            .expect("wider than 32 bits");
        assert_eq!(cfg.grpc.uid, 4_294_967_296);
        assert_eq!(cfg.grpc.gid, i64::MAX);
    }

    #[test]
    fn test_failed_decode_leaves_config_untouched() {
        let mut cfg: Config = "[plugins.cri]\nenabled = true\n".parse().expect("decode");
        let before = cfg.clone();

        let result = cfg.decode_into("root = \"/new\"\nsubreaper = 3\n", None);

        assert!(result.is_err());
        assert_eq!(cfg, before);
        assert!(cfg.plugins.contains("cri"));
    }

    #[test]
    fn test_plugins_section_must_be_a_table() {
        let err = "plugins = 5".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_plugin_entries_of_any_type_are_captured() {
        let cfg: Config = "[plugins]\ncri = \"on\"\n[[plugins.hooks]]\nname = \"a\"\n"
            .parse()
            .expect("plugin values are not inspected");

        let names: Vec<&str> = cfg.plugins.names().collect();
        assert_eq!(names, vec!["cri", "hooks"]);
        assert_eq!(cfg.plugins.get("cri").unwrap().value().as_str(), Some("on"));
        assert!(cfg.plugins.get("hooks").unwrap().value().is_array());
        assert_eq!(cfg.plugins.metadata().type_of(&["plugins", "hooks"]), Some("array"));
    }

    #[test]
    fn test_plugin_map_keys_match_document_tables() {
        let cfg: Config = r#"
[plugins.cri]
enabled = true

[plugins.linux]
shim = "hostd-shim"

[scheduler]
pause_threshold = 0.02
"#
        .parse()
        .expect("decode");

        let names: Vec<&str> = cfg.plugins.names().collect();
        assert_eq!(names, vec!["cri", "linux", "scheduler"]);
        assert_eq!(cfg.plugins.get("scheduler").unwrap().key().to_string(), "scheduler");
        assert_eq!(cfg.plugins.get("cri").unwrap().key().to_string(), "plugins.cri");
    }

    #[test]
    fn test_plugins_table_wins_over_top_level_duplicate() {
        let cfg: Config = "[plugins.cri]\nsource = 1\n[cri]\nsource = 2\n"
            .parse()
            .expect("decode");

        let fragment = cfg.plugins.get("cri").unwrap();
        assert_eq!(fragment.value().get("source"), Some(&toml::Value::Integer(1)));
        assert_eq!(cfg.plugins.metadata().undecoded(), &[Key::root("cri")]);
    }

    #[test]
    fn test_unknown_scalars_are_recorded_as_undecoded() {
        let cfg: Config = "version = 2\n[grpc]\naddress = \"tcp://x\"\n"
            .parse()
            .expect("unknown keys are not errors");

        let undecoded: Vec<String> = cfg
            .plugins
            .metadata()
            .undecoded()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(undecoded, vec!["grpc.address", "version"]);
        assert!(cfg.plugins.is_empty());
    }

    #[test]
    fn test_metadata_tracks_defined_keys() {
        let cfg: Config = "root = \"/data\"\n[plugins.cri]\nenabled = true\n"
            .parse()
            .expect("decode");

        let meta = cfg.plugins.metadata();
        assert!(meta.is_defined(&["root"]));
        assert!(meta.is_defined(&["plugins", "cri", "enabled"]));
        assert!(!meta.is_defined(&["state"]));
        assert_eq!(meta.type_of(&["plugins", "cri", "enabled"]), Some("boolean"));
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();

        merge_tables(&mut base, overlay);

        let expected: toml::Table = toml::from_str("[a]\nx = 1\ny = 3\n[b]\nz = 4\n").unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Config::load("/nonexistent/hostd/config.toml").unwrap_err();
        assert!(err.is_not_found());
    }
}
