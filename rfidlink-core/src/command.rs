//! Named reader commands
//!
//! Reader command bytes differ between deployments, so they are never
//! hard-coded: a [`CommandTable`] is built once from configuration and
//! shared read-only for the life of the process.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, Result};

/// Command names the rest of the stack refers to
pub mod names {
    /// Single inventory query
    pub const RFID_QUERY: &str = "RFID_QUERY";

    /// Start continuous inventory
    pub const LOOP_START: &str = "CMD_RFID_LOOP_START";

    /// Stop continuous inventory
    pub const LOOP_STOP: &str = "CMD_RFID_LOOP_STOP";

    /// Reader status query
    pub const DEVICE_STATUS_QUERY: &str = "DEVICE_STATUS_QUERY";

    /// Names every command table must define
    pub const REQUIRED: [&str; 4] = [RFID_QUERY, LOOP_START, LOOP_STOP, DEVICE_STATUS_QUERY];
}

/// Mapping from command name to the exact bytes sent for it
///
/// # Examples
///
/// ```
/// use rfidlink_core::CommandTable;
///
/// let table = CommandTable::from_hex_entries([("RFID_QUERY", "A5 5A 00 0A")]).unwrap();
/// assert_eq!(table.encode("RFID_QUERY").unwrap().as_ref(), &[0xA5, 0x5A, 0x00, 0x0A]);
/// assert!(table.encode("NOPE").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    entries: BTreeMap<String, Bytes>,
}

impl CommandTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command (builder style)
    pub fn with_command(mut self, name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.entries.insert(name.into(), bytes.into());
        self
    }

    /// Build a table from `(name, hex)` pairs
    ///
    /// Whitespace inside the hex string is ignored, so `"A5 5A 00"` and
    /// `"A55A00"` are equivalent.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload is not valid hex or is empty.
    pub fn from_hex_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut table = Self::new();

        for (name, hex_str) in entries {
            let name = name.into();
            let bytes = parse_hex(&name, hex_str.as_ref())?;

            trace!(command = %name, len = bytes.len(), "Loaded command");

            table.entries.insert(name, bytes);
        }

        Ok(table)
    }

    /// Look up the bytes for a command
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.entries.get(name)
    }

    /// Check if a command is defined
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Encode a named command
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] if the name is not in the table.
    pub fn encode(&self, name: &str) -> Result<Bytes> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))
    }

    /// Command names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every command in [`names::REQUIRED`] is defined
    pub fn validate_required(&self) -> Result<()> {
        match names::REQUIRED.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(Error::MissingCommand(missing.to_string())),
            None => Ok(()),
        }
    }
}

fn parse_hex(name: &str, hex_str: &str) -> Result<Bytes> {
    let compact: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() {
        return Err(Error::EmptyCommand(name.to_string()));
    }

    hex::decode(&compact)
        .map(Bytes::from)
        .map_err(|source| Error::InvalidCommandBytes {
            name: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full_table() -> CommandTable {
        CommandTable::from_hex_entries([
            (names::RFID_QUERY, "A5 5A 00 0A 80 00 00 8A 0D 0A"),
            (names::LOOP_START, "A5 5A 00 0A 82 00 00 88 0D 0A"),
            (names::LOOP_STOP, "A55A000A8C0000860D0A"),
            (names::DEVICE_STATUS_QUERY, "a5 5a 00 08 10 18 0d 0a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_encode_known_command() {
        let table = full_table();

        assert_eq!(
            table.encode(names::RFID_QUERY).unwrap().as_ref(),
            &[0xA5, 0x5A, 0x00, 0x0A, 0x80, 0x00, 0x00, 0x8A, 0x0D, 0x0A]
        );
        assert_eq!(
            table.encode(names::DEVICE_STATUS_QUERY).unwrap().as_ref(),
            &[0xA5, 0x5A, 0x00, 0x08, 0x10, 0x18, 0x0D, 0x0A]
        );
    }

    #[test]
    fn test_encode_unknown_command() {
        let table = full_table();

        let result = table.encode("PRODUCTION_START");
        assert!(matches!(result, Err(Error::UnknownCommand(ref name)) if name == "PRODUCTION_START"));
    }

    #[test]
    fn test_invalid_hex() {
        let result = CommandTable::from_hex_entries([("BAD", "A5 5G")]);

        assert!(matches!(result, Err(Error::InvalidCommandBytes { ref name, .. }) if name == "BAD"));
    }

    #[test]
    fn test_odd_length_hex() {
        let result = CommandTable::from_hex_entries([("ODD", "A5 5")]);

        assert!(matches!(result, Err(Error::InvalidCommandBytes { .. })));
    }

    #[test]
    fn test_empty_payload() {
        let result = CommandTable::from_hex_entries([("EMPTY", "   ")]);

        assert!(matches!(result, Err(Error::EmptyCommand(_))));
        assert!(result.unwrap_err().is_config_error());
    }

    #[test]
    fn test_validate_required() {
        assert!(full_table().validate_required().is_ok());

        let partial = CommandTable::new()
            .with_command(names::RFID_QUERY, vec![0x01])
            .with_command(names::LOOP_START, vec![0x02]);

        let result = partial.validate_required();
        assert!(matches!(result, Err(Error::MissingCommand(ref name)) if name == names::LOOP_STOP));
    }

    #[test]
    fn test_names_sorted() {
        let table = full_table();
        let listed: Vec<&str> = table.names().collect();

        assert_eq!(
            listed,
            vec![
                names::LOOP_START,
                names::LOOP_STOP,
                names::DEVICE_STATUS_QUERY,
                names::RFID_QUERY,
            ]
        );
        assert_eq!(table.len(), 4);
    }
}
