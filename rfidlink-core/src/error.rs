//! Error types for rfidlink-core

/// Result type alias for rfidlink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command name is not in the command table
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command every reader deployment needs is absent from the table
    #[error("Command table is missing required command: {0}")]
    MissingCommand(String),

    /// Configured command bytes are not valid hex
    #[error("Invalid bytes for command {name}: {source}")]
    InvalidCommandBytes {
        name: String,
        #[source]
        source: hex::FromHexError,
    },

    /// Configured command has no bytes at all
    #[error("Command {0} has an empty payload")]
    EmptyCommand(String),

    /// Frame is too short to hold the expected fields
    #[error("frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },
}

impl Error {
    /// Check if the error comes from a bad command table rather than traffic
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCommand(_) | Self::InvalidCommandBytes { .. } | Self::EmptyCommand(_)
        )
    }
}
