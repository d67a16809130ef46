//! Protocol constants

/// Default reader address
pub const DEFAULT_HOST: &str = "192.168.1.200";

/// Default reader port
pub const DEFAULT_PORT: u16 = 2000;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Largest chunk handed to the decoder per socket read
pub const RECV_CHUNK_SIZE: usize = 1024;

/// How long stopping a periodic sender may wait for it (milliseconds)
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;

/// Default periodic send interval (milliseconds)
pub const DEFAULT_LOOP_INTERVAL_MS: u64 = 5000;

/// Default spacing between commands of a sequence (milliseconds)
pub const DEFAULT_SEQUENCE_INTERVAL_MS: u64 = 1000;

/// Marker opening every binary reader envelope
pub const FRAME_MARKER: [u8; 2] = [0xA5, 0x5A];

/// Shortest chunk treated as an envelope
pub const ENVELOPE_MIN_LEN: usize = 8;

/// Offset of the command discriminator inside an envelope
pub const ENVELOPE_COMMAND_OFFSET: usize = 4;

/// Tag-report frame layout
pub mod tag_report {
    use std::ops::Range;

    /// Shortest frame that holds every field
    pub const MIN_LEN: usize = 51;

    pub const PC: Range<usize> = 5..7;
    pub const EPC: Range<usize> = 7..19;
    pub const TID: Range<usize> = 19..31;
    pub const USER: Range<usize> = 31..47;

    /// Big-endian signed tenths of a dBm
    pub const RSSI: Range<usize> = 47..49;

    pub const ANTENNA: usize = 49;
}

/// Envelope command discriminators sent by the reader
pub mod envelope {
    /// Tag report produced while inventory loop is running
    pub const LOOP_REPORT: u8 = 0x83;

    /// Acknowledgement of the inventory loop stop command
    pub const LOOP_STOP_ACK: u8 = 0x8D;
}
