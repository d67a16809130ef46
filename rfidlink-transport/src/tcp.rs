//! TCP transport
//!
//! Each live connection owns two tasks:
//!
//! - the send loop, the only writer of the socket, draining the outbound queue
//! - the receive loop, the only reader, decoding chunks for the data callback
//!
//! Both race their blocking point against the connection's cancellation
//! token. The receive loop always has the last word: whatever ends the
//! connection, it tears the link down and reports `(false, "disconnected")`
//! exactly once.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use rfidlink_core::constants::{DEFAULT_CONNECT_TIMEOUT, RECV_CHUNK_SIZE};
use rfidlink_core::frame;

use crate::{error::*, Callbacks, LinkState, Outbound, Transport};

/// Message reported when a live connection ends
pub const DISCONNECTED: &str = "disconnected";

/// TCP transport for RFID readers
pub struct TcpTransport {
    addr: String,
    port: u16,
    connect_timeout: Duration,
    recv_chunk_size: usize,
    shared: Arc<Shared>,
}

/// State shared with the loop tasks
struct Shared {
    slot: Mutex<Slot>,
    callbacks: Callbacks,
    next_link_id: AtomicU64,
}

enum Slot {
    Idle,
    Connecting,
    Live(Link),
}

/// Handles to one live connection
struct Link {
    id: u64,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16, callbacks: Callbacks) -> Self {
        Self {
            addr: addr.into(),
            port,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            recv_chunk_size: RECV_CHUNK_SIZE,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Idle),
                callbacks,
                next_link_id: AtomicU64::new(1),
            }),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the largest chunk read from the socket at once
    pub fn with_recv_chunk_size(mut self, size: usize) -> Self {
        self.recv_chunk_size = size.max(1);
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        addrs
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }

    async fn open(&self) -> Result<(SocketAddr, TcpStream)> {
        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout(self.connect_timeout))?
            .map_err(|e| classify_connect_error(addr, e))?;

        // Commands are small and latency matters more than throughput
        stream.set_nodelay(true)?;

        Ok((addr, stream))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<()> {
        let mut guard = ConnectingGuard::enter(&self.shared)?;

        let (addr, stream) = match self.open().await {
            Ok(opened) => opened,
            Err(e) => {
                drop(guard);

                let message = format!("Connection to {} failed: {}", self.remote_addr(), e);
                warn!("{}", message);
                self.shared.callbacks.connection_changed(false, &message);
                self.shared.callbacks.error(&message);

                return Err(e);
            }
        };

        let (reader, writer) = stream.into_split();
        let (outbound, queue) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let id = self.shared.next_link_id.fetch_add(1, Ordering::Relaxed);

        guard.promote(Link {
            id,
            cancel: cancel.clone(),
            outbound,
        });

        debug!(link = id, "Connected to {}", addr);

        self.shared
            .callbacks
            .connection_changed(true, &format!("Connected to {}", addr));

        tokio::spawn(send_loop(
            writer,
            queue,
            cancel.clone(),
            self.shared.callbacks.clone(),
        ));
        tokio::spawn(receive_loop(
            reader,
            id,
            cancel,
            Arc::clone(&self.shared),
            self.recv_chunk_size,
        ));

        Ok(())
    }

    fn disconnect(&self) {
        let link = {
            let mut slot = self.shared.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Live(link) => Some(link),
                other => {
                    *slot = other;
                    None
                }
            }
        };

        if let Some(link) = link {
            debug!(link = link.id, "Disconnecting from {}...", self.remote_addr());
            link.cancel.cancel();
        }
    }

    fn state(&self) -> LinkState {
        match &*self.shared.slot.lock() {
            Slot::Idle => LinkState::Disconnected,
            Slot::Connecting => LinkState::Connecting,
            Slot::Live(link) if !link.cancel.is_cancelled() => LinkState::Connected,
            Slot::Live(_) => LinkState::Disconnected,
        }
    }

    fn send(&self, payload: Outbound) -> Result<()> {
        match &*self.shared.slot.lock() {
            Slot::Live(link) if !link.cancel.is_cancelled() => {
                link.outbound.send(payload).map_err(|_| Error::NotConnected)
            }
            _ => Err(Error::NotConnected),
        }
    }

    fn remote_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
            self.disconnect();
        }
    }
}

impl Shared {
    /// Clear the slot if it still holds the given link
    fn release(&self, id: u64) {
        let mut slot = self.slot.lock();
        if matches!(&*slot, Slot::Live(link) if link.id == id) {
            *slot = Slot::Idle;
        }
    }
}

/// Holds the slot in `Connecting` until the attempt resolves
///
/// Dropping the guard without promoting it (failure, or the connect future
/// being dropped) puts the slot back to `Idle`.
struct ConnectingGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl<'a> ConnectingGuard<'a> {
    fn enter(shared: &'a Shared) -> Result<Self> {
        let mut slot = shared.slot.lock();

        match &*slot {
            Slot::Connecting => return Err(Error::AlreadyConnected),
            Slot::Live(link) if !link.cancel.is_cancelled() => return Err(Error::AlreadyConnected),
            // A cancelled link whose receive loop has not released it yet
            Slot::Live(_) | Slot::Idle => {}
        }

        *slot = Slot::Connecting;
        Ok(Self {
            shared,
            armed: true,
        })
    }

    fn promote(&mut self, link: Link) {
        *self.shared.slot.lock() = Slot::Live(link);
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self.shared.slot.lock();
            if matches!(&*slot, Slot::Connecting) {
                *slot = Slot::Idle;
            }
        }
    }
}

fn classify_connect_error(addr: SocketAddr, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => Error::ConnectionRefused(addr.to_string()),
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            Error::Unreachable(addr.to_string())
        }
        _ => Error::Io(err),
    }
}

async fn send_loop(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
    callbacks: Callbacks,
) {
    trace!("Send loop started");

    loop {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            payload = queue.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        let data: Bytes = payload.into_bytes();
        if data.is_empty() {
            continue;
        }

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        let written = async {
            writer.write_all(&data).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            if !cancel.is_cancelled() {
                let message = format!("Send failed: {}", e);
                warn!("{}", message);
                callbacks.error(&message);
            }
            cancel.cancel();
            break;
        }
    }

    let _ = writer.shutdown().await;
    trace!("Send loop stopped");
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    id: u64,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    chunk_size: usize,
) {
    trace!("Receive loop started");

    let mut buf = vec![0u8; chunk_size];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!(link = id, "{}", Error::ConnectionClosed);
                break;
            }
            Ok(n) => {
                trace!("Received {} bytes: {:02X?}", n, &buf[..n.min(16)]);

                let message = frame::decode(Bytes::copy_from_slice(&buf[..n]));
                shared.callbacks.data(message);
            }
            Err(e) => {
                if !cancel.is_cancelled() {
                    let message = format!("Receive failed: {}", e);
                    warn!("{}", message);
                    shared.callbacks.error(&message);
                }
                break;
            }
        }
    }

    cancel.cancel();
    shared.release(id);

    debug!(link = id, "Connection ended");
    shared.callbacks.connection_changed(false, DISCONNECTED);
}
