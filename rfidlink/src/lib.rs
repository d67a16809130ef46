//! # rfidlink
//!
//! Async client for networked UHF RFID readers speaking the A5 5A binary
//! envelope over TCP.
//!
//! ## Features
//!
//! - Named commands loaded from a TOML command table
//! - One-shot, periodic and sequenced sending
//! - Inbound chunks decoded into JSON or binary, with tag report parsing
//! - Callback based: nothing blocks waiting for a reply
//!
//! ## Quick Start
//!
//! ```no_run
//! use rfidlink::{Callbacks, Device, ReaderConfig, ReaderEvent};
//!
//! #[tokio::main]
//! async fn main() -> rfidlink::Result<()> {
//!     let config = ReaderConfig::from_file("reader.toml")?;
//!
//!     let callbacks = Callbacks::new().on_data(|msg| {
//!         if let ReaderEvent::TagReport(tag) = ReaderEvent::from(msg) {
//!             println!("{}", tag);
//!         }
//!     });
//!
//!     // Connect to reader
//!     let device = Device::new(&config, callbacks)?;
//!     device.connect().await?;
//!
//!     // Ask for one inventory round
//!     device.send_once("RFID_QUERY")?;
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!
//!     device.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod event;

// Re-exports
pub use config::{ConnectionConfig, LoopConfig, ReaderConfig};
pub use device::Device;
pub use error::{Error, Result};
pub use event::ReaderEvent;

// Re-export lower layers
pub use rfidlink_core::{command::names, CommandTable, DecodedMessage};
pub use rfidlink_transport::{Callbacks, LinkState, Outbound, TcpTransport, Transport};
pub use rfidlink_types::{TagRead, TagRecord};
