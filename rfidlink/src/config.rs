//! Reader configuration
//!
//! Loaded from a TOML file. Command bytes are deployment specific, so the
//! `[commands]` table is where they live:
//!
//! ```toml
//! [reader]
//! host = "192.168.1.200"
//! port = 2000
//!
//! [commands]
//! RFID_QUERY = "A5 5A 00 0A 80 00 00 8A 0D 0A"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rfidlink_core::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_LOOP_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_SEQUENCE_INTERVAL_MS, DEFAULT_STOP_TIMEOUT_MS, RECV_CHUNK_SIZE,
};
use rfidlink_core::CommandTable;

use crate::error::Result;

/// Top-level reader configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReaderConfig {
    pub reader: ConnectionConfig,

    #[serde(default, rename = "loop")]
    pub loops: LoopConfig,

    /// Command name to hex payload
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

/// Where the reader lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Largest chunk read from the socket at once
    #[serde(default = "default_recv_chunk_size")]
    pub recv_chunk_size: usize,
}

/// Periodic and sequenced sending
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// How long stopping a periodic sender may wait for it
    pub stop_timeout_ms: u64,

    pub default_interval_ms: u64,

    pub sequence_interval_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            default_interval_ms: DEFAULT_LOOP_INTERVAL_MS,
            sequence_interval_ms: DEFAULT_SEQUENCE_INTERVAL_MS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT * 1000
}

fn default_recv_chunk_size() -> usize {
    RECV_CHUNK_SIZE
}

impl ReaderConfig {
    /// Load configuration from a TOML file
    ///
    /// The command table is checked as part of loading.
    ///
    /// # Example
    /// ```no_run
    /// use rfidlink::ReaderConfig;
    ///
    /// let config = ReaderConfig::from_file("reader.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ReaderConfig = toml::from_str(contents)?;
        config.command_table()?;
        Ok(config)
    }

    /// Defaults for the reference reader at `192.168.1.200:2000`
    ///
    /// Carries no commands; add them before building a device.
    pub fn defaults() -> Self {
        Self {
            reader: ConnectionConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                connect_timeout_ms: default_connect_timeout_ms(),
                recv_chunk_size: RECV_CHUNK_SIZE,
            },
            loops: LoopConfig::default(),
            commands: BTreeMap::new(),
        }
    }

    /// Add a command (builder style)
    pub fn with_command(mut self, name: impl Into<String>, hex: impl Into<String>) -> Self {
        self.commands.insert(name.into(), hex.into());
        self
    }

    /// Build the command table, checking required commands are present
    pub fn command_table(&self) -> Result<CommandTable> {
        let table = CommandTable::from_hex_entries(&self.commands)?;
        table.validate_required()?;
        Ok(table)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.reader.connect_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.loops.stop_timeout_ms)
    }

    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.loops.default_interval_ms)
    }

    pub fn sequence_interval(&self) -> Duration {
        Duration::from_millis(self.loops.sequence_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use rfidlink_core::command::names;

    const SAMPLE: &str = include_str!("../reader.toml");

    #[test]
    fn test_sample_config() {
        let config = ReaderConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.reader.host, "192.168.1.200");
        assert_eq!(config.reader.port, 2000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));

        let table = config.command_table().unwrap();
        assert!(table.contains(names::RFID_QUERY));
        assert!(table.contains(names::DEVICE_STATUS_QUERY));
    }

    #[test]
    fn test_optional_sections_default() {
        let config = ReaderConfig::from_toml_str(
            r#"
            [reader]
            host = "10.0.0.7"

            [commands]
            RFID_QUERY = "01"
            CMD_RFID_LOOP_START = "02"
            CMD_RFID_LOOP_STOP = "03"
            DEVICE_STATUS_QUERY = "04"
            "#,
        )
        .unwrap();

        assert_eq!(config.reader.port, DEFAULT_PORT);
        assert_eq!(config.reader.recv_chunk_size, RECV_CHUNK_SIZE);
        assert_eq!(config.loops, LoopConfig::default());
        assert_eq!(config.stop_timeout(), Duration::from_secs(2));
        assert_eq!(config.sequence_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_required_command() {
        let result = ReaderConfig::from_toml_str(
            r#"
            [reader]
            host = "10.0.0.7"

            [commands]
            RFID_QUERY = "01"
            "#,
        );

        assert!(matches!(
            result,
            Err(Error::Core(rfidlink_core::Error::MissingCommand(_)))
        ));
    }

    #[test]
    fn test_bad_hex_command() {
        let config = ReaderConfig::defaults()
            .with_command(names::RFID_QUERY, "ZZ")
            .with_command(names::LOOP_START, "02")
            .with_command(names::LOOP_STOP, "03")
            .with_command(names::DEVICE_STATUS_QUERY, "04");

        assert!(matches!(
            config.command_table(),
            Err(Error::Core(rfidlink_core::Error::InvalidCommandBytes { .. }))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let result = ReaderConfig::from_toml_str("[reader\nhost = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ReaderConfig::from_file("/nonexistent/reader.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
