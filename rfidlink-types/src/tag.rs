//! Tag read records

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Fields of one successful tag read
///
/// Built once by the frame codec and never mutated afterwards. All byte
/// fields are copied out of the report frame verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRead {
    pc: [u8; 2],
    epc: [u8; 12],
    tid: [u8; 12],
    user: [u8; 16],
    rssi_raw: i16,
    antenna: u8,
    read_at: DateTime<Local>,
}

impl TagRead {
    /// Create a tag read stamped with the current local time
    pub fn new(
        pc: [u8; 2],
        epc: [u8; 12],
        tid: [u8; 12],
        user: [u8; 16],
        rssi_raw: i16,
        antenna: u8,
    ) -> Self {
        Self {
            pc,
            epc,
            tid,
            user,
            rssi_raw,
            antenna,
            read_at: Local::now(),
        }
    }

    /// Protocol Control word
    pub fn pc(&self) -> &[u8; 2] {
        &self.pc
    }

    /// Electronic Product Code
    pub fn epc(&self) -> &[u8; 12] {
        &self.epc
    }

    /// Tag identifier
    pub fn tid(&self) -> &[u8; 12] {
        &self.tid
    }

    /// USER memory bank
    pub fn user(&self) -> &[u8; 16] {
        &self.user
    }

    /// RSSI as reported on the wire (tenths of a dBm)
    pub fn rssi_raw(&self) -> i16 {
        self.rssi_raw
    }

    /// RSSI in dBm
    pub fn rssi_dbm(&self) -> f64 {
        f64::from(self.rssi_raw) / 10.0
    }

    /// Antenna port that produced the read
    pub fn antenna(&self) -> u8 {
        self.antenna
    }

    /// Local time the frame was decoded
    pub fn read_at(&self) -> DateTime<Local> {
        self.read_at
    }

    /// EPC as compact uppercase hex (`E28278830000...`)
    pub fn epc_hex(&self) -> String {
        hex::encode_upper(self.epc)
    }

    /// TID as compact uppercase hex
    pub fn tid_hex(&self) -> String {
        hex::encode_upper(self.tid)
    }
}

/// Outcome of decoding one tag-report frame
///
/// A record is either a complete [`TagRead`] or a failure message. There is
/// no partially populated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TagRecord {
    /// Every field was decoded
    Read(TagRead),

    /// The frame could not be decoded
    Failed { error: String },
}

impl TagRecord {
    /// Create a failed record
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Check if the frame was decoded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Read(_))
    }

    /// Check if the record holds a usable read
    ///
    /// A read with zero RSSI is what readers emit for padding slots, so it
    /// does not count.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Read(read) => read.rssi_raw != 0,
            Self::Failed { .. } => false,
        }
    }

    /// Decoded fields, if any
    pub fn read(&self) -> Option<&TagRead> {
        match self {
            Self::Read(read) => Some(read),
            Self::Failed { .. } => None,
        }
    }

    /// Failure message, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Read(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    pub fn epc(&self) -> Option<&[u8; 12]> {
        self.read().map(TagRead::epc)
    }

    pub fn tid(&self) -> Option<&[u8; 12]> {
        self.read().map(TagRead::tid)
    }

    pub fn rssi_dbm(&self) -> Option<f64> {
        self.read().map(TagRead::rssi_dbm)
    }

    pub fn antenna(&self) -> Option<u8> {
        self.read().map(TagRead::antenna)
    }
}

impl From<TagRead> for TagRecord {
    fn from(read: TagRead) -> Self {
        Self::Read(read)
    }
}

impl fmt::Display for TagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(read) => {
                writeln!(f, "EPC: {}", spaced_hex(&read.epc))?;
                writeln!(f, "TID: {}", spaced_hex(&read.tid))?;
                writeln!(f, "USER: {}", spaced_hex(&read.user))?;
                writeln!(f, "PC: {}", spaced_hex(&read.pc))?;
                writeln!(f, "RSSI: {:.1} dBm", read.rssi_dbm())?;
                writeln!(f, "Antenna: {}", read.antenna)?;
                write!(f, "Time: {}", read.read_at.format("%Y-%m-%d %H:%M:%S"))
            }
            Self::Failed { error } => write!(f, "Tag decode failed: {}", error),
        }
    }
}

/// Format bytes as space separated uppercase hex (`E2 82 78 83`)
pub fn spaced_hex(bytes: &[u8]) -> String {
    let compact = hex::encode_upper(bytes);
    let mut out = String::with_capacity(compact.len() + compact.len() / 2);

    for (i, pair) in compact.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_read(rssi_raw: i16) -> TagRead {
        TagRead::new(
            [0x30, 0x00],
            [0xE2, 0x82, 0x78, 0x83, 0, 0, 0, 0, 0, 0x88, 0, 0],
            [0xE2, 0x82, 0x78, 0x83, 0x20, 0, 0, 0, 0, 0x88, 0x3A, 0xCC],
            [0; 16],
            rssi_raw,
            1,
        )
    }

    #[test]
    fn test_spaced_hex() {
        assert_eq!(spaced_hex(&[0xE2, 0x82, 0x0A]), "E2 82 0A");
        assert_eq!(spaced_hex(&[]), "");
    }

    #[test]
    fn test_read_accessors() {
        let read = sample_read(-657);

        assert_eq!(read.rssi_dbm(), -65.7);
        assert_eq!(read.antenna(), 1);
        assert_eq!(read.epc_hex(), "E28278830000000000880000");
        assert_eq!(read.tid_hex(), "E28278832000000000883ACC");
    }

    #[test]
    fn test_record_success() {
        let record = TagRecord::from(sample_read(-657));

        assert!(record.is_success());
        assert!(record.is_valid());
        assert_eq!(record.error(), None);
        assert_eq!(record.antenna(), Some(1));
    }

    #[test]
    fn test_record_zero_rssi_not_valid() {
        let record = TagRecord::from(sample_read(0));

        assert!(record.is_success());
        assert!(!record.is_valid());
    }

    #[test]
    fn test_record_failed() {
        let record = TagRecord::failed("frame too short");

        assert!(!record.is_success());
        assert!(!record.is_valid());
        assert_eq!(record.error(), Some("frame too short"));
        assert_eq!(record.epc(), None);
        assert_eq!(record.to_string(), "Tag decode failed: frame too short");
    }

    #[test]
    fn test_record_summary() {
        let summary = TagRecord::from(sample_read(-657)).to_string();

        assert!(summary.contains("EPC: E2 82 78 83 00 00 00 00 00 88 00 00"));
        assert!(summary.contains("RSSI: -65.7 dBm"));
        assert!(summary.contains("Antenna: 1"));
    }

    #[test]
    fn test_record_json() {
        let record = TagRecord::from(sample_read(-500));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["status"], "read");
        assert_eq!(json["antenna"], 1);
        assert_eq!(json["rssi_raw"], -500);

        let back: TagRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);

        let failed = serde_json::to_value(TagRecord::failed("boom")).unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["error"], "boom");
    }
}
