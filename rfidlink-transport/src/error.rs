//! Transport errors

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout after {0:?}")]
    ConnectionTimeout(Duration),

    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Check if the error was raised while establishing a connection
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout(_)
                | Self::ConnectionRefused(_)
                | Self::Unreachable(_)
                | Self::InvalidAddress(_)
        )
    }
}
