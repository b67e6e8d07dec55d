//! Plugin-owned configuration tables and on-demand resolution.
//!
//! The loader does not know plugin schemas. Each plugin entry is captured as a
//! raw [`toml::Value`] and decoded later, by name, into whatever shape the
//! plugin asks for. Resolution never consumes or mutates the fragment.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::config::loader::{merge_tables, ConfigError};
use crate::config::metadata::{Key, MetaData};
use crate::config::schema::Config;

/// A captured plugin entry, not yet decoded.
///
/// Usually a table, but `[[plugins.<name>]]` arrays and plain values are kept
/// as well.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginFragment {
    key: Key,
    value: toml::Value,
}

impl PluginFragment {
    pub(crate) fn new(key: Key, value: toml::Value) -> Self {
        Self { key, value }
    }

    /// Key path the fragment was captured from.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Raw captured value.
    pub fn value(&self) -> &toml::Value {
        &self.value
    }
}

/// Plugin fragments together with the metadata of the parse that produced them.
///
/// Only the loader builds a non-empty value, so fragments and metadata always
/// come from the same document.
#[derive(Debug, Clone, Default)]
pub struct PluginTables {
    fragments: BTreeMap<String, PluginFragment>,
    meta: MetaData,
}

impl PluginTables {
    pub(crate) fn new(fragments: BTreeMap<String, PluginFragment>, meta: MetaData) -> Self {
        Self { fragments, meta }
    }

    pub fn get(&self, name: &str) -> Option<&PluginFragment> {
        self.fragments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Plugin names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Metadata of the parse pass these fragments came from.
    pub fn metadata(&self) -> &MetaData {
        &self.meta
    }

    fn decode_into<T>(&self, name: &str, dest: &mut T) -> Result<bool, ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(fragment) = self.fragments.get(name) else {
            tracing::debug!(plugin = name, "No configuration for plugin");
            return Ok(false);
        };

        let current = toml::Value::try_from(&*dest).map_err(|source| ConfigError::PluginDestination {
            name: name.to_string(),
            key: fragment.key.clone(),
            source,
        })?;
        let merged = match (current, fragment.value.clone()) {
            (toml::Value::Table(mut base), toml::Value::Table(overlay)) => {
                merge_tables(&mut base, overlay);
                toml::Value::Table(base)
            }
            (_, value) => value,
        };

        let decoded: T = merged
            .try_into()
            .map_err(|source| plugin_error(name, fragment, source))?;
        *dest = decoded;

        tracing::debug!(plugin = name, key = %fragment.key, "Plugin configuration decoded");
        Ok(true)
    }

    fn decode<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some(fragment) = self.fragments.get(name) else {
            tracing::debug!(plugin = name, "No configuration for plugin");
            return Ok(None);
        };

        fragment
            .value
            .clone()
            .try_into()
            .map(Some)
            .map_err(|source| plugin_error(name, fragment, source))
    }
}

fn plugin_error(name: &str, fragment: &PluginFragment, source: toml::de::Error) -> ConfigError {
    ConfigError::PluginDecode {
        name: name.to_string(),
        key: fragment.key.clone(),
        source,
    }
}

// Equality covers plugin names and contents only. Metadata and capture keys
// describe where a document came from, not what it says.
impl PartialEq for PluginTables {
    fn eq(&self, other: &Self) -> bool {
        self.fragments.len() == other.fragments.len()
            && self
                .fragments
                .iter()
                .zip(other.fragments.iter())
                .all(|((a, fa), (b, fb))| a == b && fa.value == fb.value)
    }
}

impl Serialize for PluginTables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fragments.iter().map(|(name, fragment)| (name, &fragment.value)))
    }
}

impl Config {
    /// Decode the named plugin's table into `dest`.
    ///
    /// Keys set by the table overwrite the matching fields of `dest`; the rest
    /// keep their current values. A fragment that is not a table replaces
    /// `dest` outright. Returns `Ok(false)` without touching `dest` when the
    /// document has no entry for `name`.
    ///
    /// `dest` must itself encode as TOML (string map keys, integers within
    /// `i64`); otherwise [`ConfigError::PluginDestination`] is returned and
    /// `dest` is left as it was. Use [`Config::plugin`] for such types.
    pub fn decode_plugin<T>(&self, name: &str, dest: &mut T) -> Result<bool, ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.plugins.decode_into(name, dest)
    }

    /// Decode the named plugin's table on its own, without a destination to
    /// fall back on. Returns `Ok(None)` when the document has no such table.
    pub fn plugin<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        self.plugins.decode(name)
    }
}
