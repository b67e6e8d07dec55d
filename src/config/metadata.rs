//! Decode metadata recorded by a single parse pass.
//!
//! A [`MetaData`] value describes one document: where it came from, every key
//! path it defines and the keys the typed decode did not consume. It is only
//! ever built by the loader and travels together with the plugin fragments of
//! the same pass (see [`PluginTables`](crate::config::PluginTables)).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A dotted key path into a TOML document, e.g. `grpc.uid`.
///
/// Displays as a valid TOML key: segments that are not bare keys are written
/// as basic strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<String>);

impl Key {
    /// Key path of a top-level entry.
    pub fn root(segment: &str) -> Self {
        Self(vec![segment.to_string()])
    }

    /// Extend the path by one segment.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> From<&[S]> for Key {
    fn from(segments: &[S]) -> Self {
        Self(segments.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if is_bare_key(segment) {
                f.write_str(segment)?;
            } else {
                write_basic_string(f, segment)?;
            }
        }
        Ok(())
    }
}

fn write_basic_string(f: &mut fmt::Formatter<'_>, segment: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in segment.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{8}' => f.write_str("\\b")?,
            '\t' => f.write_str("\\t")?,
            '\n' => f.write_str("\\n")?,
            '\u{c}' => f.write_str("\\f")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04X}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn is_bare_key(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Metadata for one decoded document.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    origin: Option<PathBuf>,
    keys: BTreeMap<Key, &'static str>,
    undecoded: Vec<Key>,
}

impl MetaData {
    /// Record every key path defined by `document`.
    pub(crate) fn new(origin: Option<&Path>, document: &toml::Table) -> Self {
        let mut keys = BTreeMap::new();
        collect_keys(None, document, &mut keys);
        Self {
            origin: origin.map(Path::to_path_buf),
            keys,
            undecoded: Vec::new(),
        }
    }

    pub(crate) fn set_undecoded(&mut self, undecoded: Vec<Key>) {
        self.undecoded = undecoded;
    }

    /// Path of the file this document was read from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Whether the document explicitly sets the given key path.
    pub fn is_defined(&self, path: &[&str]) -> bool {
        self.keys.contains_key(&Key::from(path))
    }

    /// TOML type name (`"string"`, `"integer"`, `"table"`, ...) of a defined key.
    pub fn type_of(&self, path: &[&str]) -> Option<&'static str> {
        self.keys.get(&Key::from(path)).copied()
    }

    /// All key paths defined by the document, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.keys()
    }

    /// Keys that are neither known fields nor plugin tables.
    pub fn undecoded(&self) -> &[Key] {
        &self.undecoded
    }
}

fn collect_keys(prefix: Option<&Key>, table: &toml::Table, out: &mut BTreeMap<Key, &'static str>) {
    for (name, value) in table {
        let key = match prefix {
            Some(prefix) => prefix.child(name),
            None => Key::root(name),
        };
        if let toml::Value::Table(inner) = value {
            collect_keys(Some(&key), inner, out);
        }
        out.insert(key, value.type_str());
    }
}

/// Key paths present in `document` but absent from `decoded`.
///
/// Descends only into tables both sides share; a missing table is reported
/// once at its own path.
pub(crate) fn undecoded_keys(document: &toml::Table, decoded: &toml::Table) -> Vec<Key> {
    let mut out = Vec::new();
    diff_keys(None, document, decoded, &mut out);
    out
}

fn diff_keys(prefix: Option<&Key>, document: &toml::Table, decoded: &toml::Table, out: &mut Vec<Key>) {
    for (name, value) in document {
        let key = match prefix {
            Some(prefix) => prefix.child(name),
            None => Key::root(name),
        };
        match (value, decoded.get(name)) {
            (_, None) => out.push(key),
            (toml::Value::Table(inner), Some(toml::Value::Table(known))) => {
                diff_keys(Some(&key), inner, known, out)
            }
            _ => {}
        }
    }
}
