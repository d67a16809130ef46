//! Transport layer for RFID readers
//!
//! Provides a duplex TCP session: a send loop drains an unbounded outbound
//! queue while a receive loop decodes inbound chunks and reports them
//! through [`Callbacks`].

pub mod callbacks;
pub mod error;
pub mod payload;
pub mod tcp;

pub use callbacks::Callbacks;
pub use error::{Error, Result};
pub use payload::Outbound;
pub use tcp::TcpTransport;

use async_trait::async_trait;

/// Connection lifecycle
///
/// There is no reconnecting state: reconnecting is a fresh `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Transport trait for reader sessions
///
/// Methods take `&self` so one transport can be shared between the caller
/// and the tasks sending on its behalf.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the reader and start the send/receive loops
    async fn connect(&self) -> Result<()>;

    /// Tear down the connection (idempotent)
    fn disconnect(&self);

    /// Current lifecycle state
    fn state(&self) -> LinkState;

    /// Check if connected
    fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Queue a payload for the send loop without waiting for it
    fn send(&self, payload: Outbound) -> Result<()>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
