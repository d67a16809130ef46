//! Continuous inventory example
//!
//! Starts the reader's inventory loop, polls device status in the
//! background, then stops everything after `READER_SECONDS` seconds.

use std::time::Duration;

use rfidlink::{names, Callbacks, Device, ReaderConfig, ReaderEvent};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::var("READER_CONFIG").unwrap_or_else(|_| "rfidlink/reader.toml".to_string());
    let mut config = ReaderConfig::from_file(&path)?;
    if let Ok(ip) = std::env::var("READER_IP") {
        config.reader.host = ip;
    }

    let seconds: u64 = std::env::var("READER_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let callbacks = Callbacks::new()
        .on_data(|msg| match ReaderEvent::from(msg) {
            ReaderEvent::TagReport(tag) => println!("{}", tag),
            ReaderEvent::LoopStopped => println!("Reader loop stopped"),
            ReaderEvent::Structured(value) => println!("JSON: {}", value),
            _ => {}
        })
        .on_connection_change(|connected, msg| println!("[connected={}] {}", connected, msg))
        .on_error(|msg| eprintln!("error: {}", msg));

    let device = Device::new(&config, callbacks)?;
    device.connect().await?;

    // Start the reader's own loop, then poll its status
    device.send_once(names::LOOP_START)?;
    device
        .send_loop(names::DEVICE_STATUS_QUERY, config.default_interval())
        .await?;

    sleep(Duration::from_secs(seconds)).await;

    device.stop_loop().await;
    let stop = device.send_sequence([names::LOOP_STOP], config.sequence_interval())?;
    stop.await?;

    device.disconnect().await;
    Ok(())
}
