//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] rfidlink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] rfidlink_transport::Error),

    #[error("Reader not connected")]
    NotConnected,

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Check if the error names a command missing from the command table
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::Core(rfidlink_core::Error::UnknownCommand(_)))
    }
}
