//! High-level device interface

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use rfidlink_core::constants::DEFAULT_STOP_TIMEOUT_MS;
use rfidlink_core::CommandTable;
use rfidlink_transport::{Callbacks, LinkState, Outbound, TcpTransport, Transport};

use crate::config::ReaderConfig;
use crate::error::{Error, Result};

/// RFID reader
///
/// Sends named commands to a reader and reports everything it hears
/// through the [`Callbacks`] given at construction.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use rfidlink::{Callbacks, Device, ReaderConfig};
///
/// #[tokio::main]
/// async fn main() -> rfidlink::Result<()> {
///     let config = ReaderConfig::from_file("reader.toml")?;
///     let callbacks = Callbacks::new().on_data(|msg| println!("{:?}", msg));
///
///     let device = Device::new(&config, callbacks)?;
///     device.connect().await?;
///
///     device.send_once("RFID_QUERY")?;
///     device.send_loop("DEVICE_STATUS_QUERY", Duration::from_secs(3)).await?;
///
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     device.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Device {
    inner: Arc<Inner>,
    /// Handle of the running periodic sender, if any
    periodic: AsyncMutex<Option<JoinHandle<()>>>,
    stop_timeout: Duration,
}

/// State shared with the sender tasks
struct Inner {
    transport: Box<dyn Transport>,
    commands: Arc<CommandTable>,
    callbacks: Callbacks,
    control: Arc<LoopControl>,
}

/// Stop signal shared by the periodic sender and sequences
///
/// Raising the signal cancels the current token and installs a fresh one,
/// so every task started before the stop sees it and every task started
/// after does not.
struct LoopControl {
    stop: parking_lot::Mutex<CancellationToken>,
    active: AtomicUsize,
}

impl LoopControl {
    fn new() -> Self {
        Self {
            stop: parking_lot::Mutex::new(CancellationToken::new()),
            active: AtomicUsize::new(0),
        }
    }

    fn token(&self) -> CancellationToken {
        self.stop.lock().clone()
    }

    fn signal_stop(&self) {
        let mut stop = self.stop.lock();
        stop.cancel();
        *stop = CancellationToken::new();
    }
}

/// Counts a periodic sender for as long as it is alive
struct ActiveSender(Arc<LoopControl>);

impl ActiveSender {
    fn register(control: &Arc<LoopControl>) -> Self {
        control.active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(control))
    }
}

impl Drop for ActiveSender {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Device {
    /// Create a device talking TCP to the configured reader
    ///
    /// # Errors
    ///
    /// Returns an error if the configured command table is invalid.
    pub fn new(config: &ReaderConfig, callbacks: Callbacks) -> Result<Self> {
        let commands = config.command_table()?;
        let host = config.reader.host.clone();
        let port = config.reader.port;
        let connect_timeout = config.connect_timeout();
        let chunk_size = config.reader.recv_chunk_size;

        let device = Self::with_transport(commands, callbacks, move |callbacks| -> Box<dyn Transport> {
            Box::new(
                TcpTransport::new(host, port, callbacks)
                    .with_connect_timeout(connect_timeout)
                    .with_recv_chunk_size(chunk_size),
            )
        });

        Ok(device.with_stop_timeout(config.stop_timeout()))
    }

    /// Create a device around any transport
    ///
    /// `make_transport` receives the callbacks the transport must report
    /// through. They wrap `callbacks` so that a disconnect also stops the
    /// periodic sender.
    pub fn with_transport<F>(commands: CommandTable, callbacks: Callbacks, make_transport: F) -> Self
    where
        F: FnOnce(Callbacks) -> Box<dyn Transport>,
    {
        let control = Arc::new(LoopControl::new());

        let inner = Arc::new_cyclic(|weak| {
            let transport = make_transport(stop_on_disconnect(&callbacks, &control, weak.clone()));
            Inner {
                transport,
                commands: Arc::new(commands),
                callbacks,
                control,
            }
        });

        Self {
            inner,
            periodic: AsyncMutex::new(None),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
        }
    }

    /// Set how long stopping the periodic sender may wait for it
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Current connection state
    pub fn state(&self) -> LinkState {
        self.inner.transport.state()
    }

    /// Reader address
    pub fn remote_addr(&self) -> String {
        self.inner.transport.remote_addr()
    }

    /// Command table in use
    pub fn commands(&self) -> &CommandTable {
        &self.inner.commands
    }

    /// Names of every configured command
    pub fn available_commands(&self) -> Vec<String> {
        self.inner.commands.names().map(str::to_string).collect()
    }

    /// Number of periodic senders currently running
    pub fn active_senders(&self) -> usize {
        self.inner.control.active.load(Ordering::SeqCst)
    }

    /// Connect to the reader
    ///
    /// No retries: on failure the caller decides whether to try again.
    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to {}...", self.remote_addr());

        self.inner.transport.connect().await?;

        info!("Connected to {}", self.remote_addr());
        Ok(())
    }

    /// Stop the periodic sender and close the connection
    pub async fn disconnect(&self) {
        self.stop_loop().await;

        if self.is_connected() {
            info!("Disconnecting from {}...", self.remote_addr());
            self.inner.transport.disconnect();
            info!("Disconnected");
        }
    }

    /// Send a named command once
    ///
    /// Failures are returned and also reported through the error callback.
    pub fn send_once(&self, name: &str) -> Result<()> {
        self.inner.send_once(name)
    }

    /// Send raw bytes, text or JSON without going through the command table
    pub fn send_payload(&self, payload: impl Into<Outbound>) -> Result<()> {
        let result = match self.inner.ensure_connected() {
            Ok(()) => self.inner.transport.send(payload.into()).map_err(Error::from),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.inner.report(e);
        }
        result
    }

    /// Start sending a named command every `interval`
    ///
    /// Replaces any running periodic sender, waiting for it to stop first.
    /// The sender ends on [`stop_loop`](Self::stop_loop) or when the
    /// connection drops.
    pub async fn send_loop(&self, name: &str, interval: Duration) -> Result<()> {
        let mut periodic = self.periodic.lock().await;

        if let Err(e) = self.inner.validate(name) {
            self.inner.report(&e);
            return Err(e);
        }

        self.stop_periodic(&mut periodic).await;

        let active = ActiveSender::register(&self.inner.control);
        let cancel = self.inner.control.token();

        info!(command = name, ?interval, "Starting periodic sender");

        *periodic = Some(tokio::spawn(periodic_sender(
            Arc::clone(&self.inner),
            name.to_string(),
            interval,
            cancel,
            active,
        )));

        Ok(())
    }

    /// Stop the periodic sender and any running sequence (idempotent)
    pub async fn stop_loop(&self) {
        let mut periodic = self.periodic.lock().await;
        self.stop_periodic(&mut periodic).await;
    }

    /// Send several named commands, `interval` apart, on a background task
    ///
    /// The sequence runs alongside any periodic sender. It ends early when
    /// the loop stop signal is raised or the connection drops; unknown
    /// names are reported and skipped.
    pub fn send_sequence<I, S>(&self, names: I, interval: Duration) -> Result<JoinHandle<()>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Err(e) = self.inner.ensure_connected() {
            self.inner.report(&e);
            return Err(e);
        }

        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let cancel = self.inner.control.token();
        let inner = Arc::clone(&self.inner);

        debug!(count = names.len(), ?interval, "Starting command sequence");

        Ok(tokio::spawn(async move {
            for name in names {
                if cancel.is_cancelled() {
                    debug!("Command sequence stopped");
                    return;
                }

                match inner.send_once(&name) {
                    Ok(()) => {}
                    Err(e) if e.is_unknown_command() => continue,
                    Err(_) => return,
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Command sequence stopped");
                        return;
                    }
                    _ = sleep(interval) => {}
                }
            }

            trace!("Command sequence finished");
        }))
    }

    async fn stop_periodic(&self, periodic: &mut Option<JoinHandle<()>>) {
        self.inner.control.signal_stop();

        if let Some(handle) = periodic.take() {
            if timeout(self.stop_timeout, handle).await.is_err() {
                warn!("Periodic sender did not stop within {:?}", self.stop_timeout);
            } else {
                debug!("Periodic sender stopped");
            }
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.inner.control.signal_stop();
        self.inner.transport.disconnect();
    }
}

impl Inner {
    fn ensure_connected(&self) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    fn validate(&self, name: &str) -> Result<()> {
        self.ensure_connected()?;
        if !self.commands.contains(name) {
            return Err(rfidlink_core::Error::UnknownCommand(name.to_string()).into());
        }
        Ok(())
    }

    fn send_once(&self, name: &str) -> Result<()> {
        let result = self.try_send(name);
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    fn try_send(&self, name: &str) -> Result<()> {
        self.ensure_connected()?;

        let bytes = self.commands.encode(name)?;
        trace!("Sending {}: {:02X?}", name, &bytes[..]);

        self.transport.send(Outbound::Bytes(bytes))?;
        Ok(())
    }

    fn report(&self, err: &Error) {
        warn!("{}", err);
        self.callbacks.error(&err.to_string());
    }
}

/// Wrap the caller's callbacks so a disconnect raises the loop stop signal
///
/// A late report from a connection that has since been replaced leaves the
/// stop signal alone: the transport is already connecting or connected again.
fn stop_on_disconnect(
    callbacks: &Callbacks,
    control: &Arc<LoopControl>,
    inner: Weak<Inner>,
) -> Callbacks {
    let user = callbacks.clone();
    let control = Arc::clone(control);

    callbacks.clone().on_connection_change(move |connected, message| {
        if !connected {
            let superseded = inner
                .upgrade()
                .is_some_and(|inner| inner.transport.state() != LinkState::Disconnected);

            if superseded {
                debug!("Ignoring disconnect report from a replaced connection");
            } else {
                control.signal_stop();
            }
        }
        user.connection_changed(connected, message);
    })
}

async fn periodic_sender(
    inner: Arc<Inner>,
    name: String,
    interval: Duration,
    cancel: CancellationToken,
    _active: ActiveSender,
) {
    loop {
        if cancel.is_cancelled() || !inner.transport.is_connected() {
            break;
        }

        if inner.send_once(&name).is_err() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    debug!(command = %name, "Periodic sender exiting");
}
