//! Callbacks invoked by the transport loops
//!
//! Callbacks run synchronously on the loop task that produced the event.
//! A callback that blocks stalls that loop, so hand long work off to a
//! channel or another task.

use std::fmt;
use std::sync::Arc;

use rfidlink_core::DecodedMessage;

/// Receives every decoded inbound chunk
pub type DataHandler = Arc<dyn Fn(DecodedMessage) + Send + Sync>;

/// Receives connection state changes: `(connected, message)`
pub type ConnectionHandler = Arc<dyn Fn(bool, &str) + Send + Sync>;

/// Receives human-readable error messages
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// The three callbacks a transport reports through
///
/// Unset callbacks do nothing.
///
/// # Examples
///
/// ```
/// use rfidlink_transport::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_connection_change(|connected, msg| println!("connected={connected}: {msg}"))
///     .on_error(|msg| eprintln!("error: {msg}"));
/// ```
#[derive(Clone)]
pub struct Callbacks {
    data: DataHandler,
    connection: ConnectionHandler,
    error: ErrorHandler,
}

impl Callbacks {
    /// Create callbacks that ignore every event
    pub fn new() -> Self {
        Self {
            data: Arc::new(|_| {}),
            connection: Arc::new(|_, _| {}),
            error: Arc::new(|_| {}),
        }
    }

    pub fn on_data(mut self, f: impl Fn(DecodedMessage) + Send + Sync + 'static) -> Self {
        self.data = Arc::new(f);
        self
    }

    pub fn on_connection_change(mut self, f: impl Fn(bool, &str) + Send + Sync + 'static) -> Self {
        self.connection = Arc::new(f);
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Arc::new(f);
        self
    }

    /// Deliver a decoded chunk
    pub fn data(&self, message: DecodedMessage) {
        (self.data)(message)
    }

    /// Report a connection state change
    pub fn connection_changed(&self, connected: bool, message: &str) {
        (self.connection)(connected, message)
    }

    /// Report an error
    pub fn error(&self, message: &str) {
        (self.error)(message)
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}
