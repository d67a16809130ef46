//! Single inventory query example

use std::time::Duration;

use rfidlink::{names, Callbacks, Device, ReaderConfig, ReaderEvent};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging, RUST_LOG=rfidlink=trace shows raw frames
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::var("READER_CONFIG").unwrap_or_else(|_| "rfidlink/reader.toml".to_string());
    let mut config = ReaderConfig::from_file(&path)?;

    // Change to your reader IP
    if let Ok(ip) = std::env::var("READER_IP") {
        config.reader.host = ip;
    }

    let callbacks = Callbacks::new()
        .on_data(|msg| match ReaderEvent::from(msg) {
            ReaderEvent::TagReport(tag) if tag.is_valid() => println!("✓ {}", tag),
            ReaderEvent::TagReport(tag) => println!("✗ {}", tag),
            other => println!("{:?}", other),
        })
        .on_connection_change(|connected, msg| println!("[connected={}] {}", connected, msg))
        .on_error(|msg| eprintln!("error: {}", msg));

    let device = Device::new(&config, callbacks)?;

    println!("Connecting to {}...", device.remote_addr());
    device.connect().await?;

    device.send_once(names::RFID_QUERY)?;
    sleep(Duration::from_secs(2)).await;

    device.disconnect().await;
    println!("✓ Disconnected");

    Ok(())
}
