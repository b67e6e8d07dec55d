//! Configuration encoding.
//!
//! Every known field is written. Plugin fragments still held opaque are written
//! back verbatim under `[plugins.<name>]`, including tables that were captured
//! from the top level of the source document. Decode metadata is never written.

use std::io::Write;

use crate::config::loader::ConfigError;
use crate::config::schema::Config;

impl Config {
    /// Encode the configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Encode the configuration and write it to `writer`.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<u64, ConfigError> {
        let encoded = self.to_toml_string()?;
        writer
            .write_all(encoded.as_bytes())
            .map_err(ConfigError::Write)?;
        writer.flush().map_err(ConfigError::Write)?;
        Ok(encoded.len() as u64)
    }
}
