//! Inbound frame decoding
//!
//! The reader link has no framing header: every socket read is handed to
//! [`decode`] as-is. A chunk is treated as a structured (JSON) message if it
//! is UTF-8 text that parses as JSON, and as a binary frame otherwise.
//!
//! # Tag-report frame
//!
//! ```text
//! ┌────────┬─────┬─────┬──────┬──────┬──────┬──────┬──────┬─────────┐
//! │ A5 5A  │ ..  │ cmd │  PC  │ EPC  │ TID  │ USER │ RSSI │ antenna │
//! │ 0..2   │ 2..4│  4  │ 5..7 │ 7..19│19..31│31..47│47..49│   49    │
//! └────────┴─────┴─────┴──────┴──────┴──────┴──────┴──────┴─────────┘
//! ```
//!
//! RSSI is a big-endian two's-complement `i16` in tenths of a dBm.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, trace};

use rfidlink_types::{TagRead, TagRecord};

use crate::constants::{tag_report, ENVELOPE_COMMAND_OFFSET, ENVELOPE_MIN_LEN, FRAME_MARKER};
use crate::error::Error;

/// One decoded socket chunk
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    /// UTF-8 JSON text
    Structured(Value),

    /// Anything else, bytes unchanged
    Binary(Bytes),
}

impl DecodedMessage {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Self::Structured(_) => None,
            Self::Binary(bytes) => Some(bytes),
        }
    }

    /// Envelope command discriminator, if this is an envelope frame
    pub fn envelope_command(&self) -> Option<u8> {
        self.as_binary().and_then(|bytes| decode_envelope(bytes))
    }

    /// Decode this chunk as a tag report
    ///
    /// Returns `None` for structured messages.
    pub fn tag_report(&self) -> Option<TagRecord> {
        self.as_binary().map(|bytes| decode_tag_report(bytes))
    }
}

/// Decode one inbound chunk
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rfidlink_core::frame::{decode, DecodedMessage};
///
/// let msg = decode(Bytes::from_static(br#"{"type":"status_update"}"#));
/// assert!(msg.is_structured());
///
/// let msg = decode(Bytes::from_static(&[0xA5, 0x5A, 0x00]));
/// assert!(matches!(msg, DecodedMessage::Binary(_)));
/// ```
pub fn decode(buf: Bytes) -> DecodedMessage {
    let parsed = std::str::from_utf8(&buf)
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(text).ok());

    match parsed {
        Some(value) => {
            trace!(len = buf.len(), "Decoded structured message");
            DecodedMessage::Structured(value)
        }
        None => {
            trace!("Decoded {} binary bytes: {:02X?}", buf.len(), &buf[..buf.len().min(16)]);
            DecodedMessage::Binary(buf)
        }
    }
}

/// Read the envelope command discriminator
///
/// Returns `None` unless the chunk starts with `A5 5A` and is long enough
/// to be an envelope.
pub fn decode_envelope(buf: &[u8]) -> Option<u8> {
    if buf.len() < ENVELOPE_MIN_LEN || buf[..2] != FRAME_MARKER {
        return None;
    }

    Some(buf[ENVELOPE_COMMAND_OFFSET])
}

/// Decode a tag-report frame
///
/// Never fails outright: a frame that is too short yields a
/// [`TagRecord::Failed`] describing the shortfall.
pub fn decode_tag_report(buf: &[u8]) -> TagRecord {
    if buf.len() < tag_report::MIN_LEN {
        let err = Error::FrameTooShort {
            expected: tag_report::MIN_LEN,
            actual: buf.len(),
        };
        debug!("Rejecting tag report: {}", err);
        return TagRecord::failed(err.to_string());
    }

    let read = TagRead::new(
        field(buf, tag_report::PC),
        field(buf, tag_report::EPC),
        field(buf, tag_report::TID),
        field(buf, tag_report::USER),
        BigEndian::read_i16(&buf[tag_report::RSSI]),
        buf[tag_report::ANTENNA],
    );

    trace!(
        epc = %read.epc_hex(),
        rssi = read.rssi_dbm(),
        antenna = read.antenna(),
        "Decoded tag report"
    );

    TagRecord::Read(read)
}

/// Copy a fixed-size field out of a frame already checked for length
fn field<const N: usize>(buf: &[u8], range: Range<usize>) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[range]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::envelope;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const EPC: [u8; 12] = [0xE2, 0x82, 0x78, 0x83, 0x00, 0x00, 0x00, 0x00, 0x00, 0x88, 0x00, 0x00];
    const TID: [u8; 12] = [0xE2, 0x82, 0x78, 0x83, 0x20, 0x00, 0x00, 0x00, 0x00, 0x88, 0x3A, 0xCC];

    fn report_frame(len: usize, rssi: [u8; 2], antenna: u8) -> Vec<u8> {
        let mut frame = vec![0u8; len];
        frame[0] = 0xA5;
        frame[1] = 0x5A;
        frame[3] = len as u8;
        frame[4] = envelope::LOOP_REPORT;
        frame[5..7].copy_from_slice(&[0x30, 0x00]);
        frame[7..19].copy_from_slice(&EPC);
        frame[19..31].copy_from_slice(&TID);
        for (i, b) in frame[31..47].iter_mut().enumerate() {
            *b = i as u8;
        }
        frame[47..49].copy_from_slice(&rssi);
        frame[49] = antenna;
        frame
    }

    #[test]
    fn test_decode_json_object() {
        let msg = decode(Bytes::from_static(br#"{"type":"rfid_data","data":{"tray_id":"T-01"}}"#));

        let value = msg.as_structured().unwrap();
        assert_eq!(value["type"], "rfid_data");
        assert_eq!(value["data"]["tray_id"], "T-01");
    }

    #[test]
    fn test_decode_invalid_utf8_is_binary() {
        let raw = Bytes::from_static(&[0xA5, 0x5A, 0xFF, 0xFE]);
        let msg = decode(raw.clone());

        assert_eq!(msg, DecodedMessage::Binary(raw));
    }

    #[test]
    fn test_decode_text_that_is_not_json_is_binary() {
        let raw = Bytes::from_static(b"OK\r\n{");
        let msg = decode(raw.clone());

        assert_eq!(msg.as_binary(), Some(&raw));
    }

    #[test]
    fn test_decode_split_json_is_binary() {
        // A JSON message split across two reads cannot be recognised
        let msg = decode(Bytes::from_static(br#"{"type":"status_"#));

        assert!(msg.is_binary());
    }

    #[test]
    fn test_envelope_command() {
        let frame = report_frame(53, [0xFD, 0x6F], 1);

        assert_eq!(decode_envelope(&frame), Some(envelope::LOOP_REPORT));
        assert_eq!(
            decode(Bytes::from(frame)).envelope_command(),
            Some(envelope::LOOP_REPORT)
        );
    }

    #[test]
    fn test_envelope_requires_marker_and_length() {
        assert_eq!(decode_envelope(&[0xA5, 0x5A, 0x00, 0x08, 0x8D, 0x00, 0x00]), None);
        assert_eq!(
            decode_envelope(&[0xA5, 0x5A, 0x00, 0x08, 0x8D, 0x00, 0x00, 0x95]),
            Some(envelope::LOOP_STOP_ACK)
        );
        assert_eq!(decode_envelope(&[0x5A, 0xA5, 0x00, 0x08, 0x8D, 0x00, 0x00, 0x95]), None);
    }

    #[test]
    fn test_tag_report_fields() {
        let frame = report_frame(53, [0xFD, 0x6F], 1);
        let record = decode_tag_report(&frame);
        let read = record.read().unwrap();

        assert_eq!(read.pc(), &[0x30, 0x00]);
        assert_eq!(read.epc(), &EPC);
        assert_eq!(read.tid(), &TID);
        assert_eq!(read.user()[15], 15);
        assert_eq!(read.rssi_raw(), -657);
        assert_eq!(read.rssi_dbm(), -65.7);
        assert_eq!(read.antenna(), 1);
        assert!(record.is_valid());
    }

    #[test]
    fn test_tag_report_exact_min_length() {
        let frame = report_frame(tag_report::MIN_LEN, [0x00, 0x64], 2);
        let record = decode_tag_report(&frame);

        assert_eq!(record.rssi_dbm(), Some(10.0));
        assert_eq!(record.antenna(), Some(2));
    }

    #[test]
    fn test_tag_report_antenna_not_sign_extended() {
        let frame = report_frame(53, [0xFF, 0xFF], 0xF0);
        let record = decode_tag_report(&frame);

        assert_eq!(record.antenna(), Some(0xF0));
        assert_eq!(record.rssi_dbm(), Some(-0.1));
    }

    #[test]
    fn test_tag_report_too_short() {
        let frame = report_frame(50, [0xFD, 0x6F], 1);
        let record = decode_tag_report(&frame);

        assert!(!record.is_success());
        assert_eq!(
            record.error(),
            Some("frame too short: expected at least 51 bytes, got 50 bytes")
        );
    }

    #[test]
    fn test_message_tag_report() {
        let frame = report_frame(53, [0xFD, 0x6F], 2);

        let binary = decode(Bytes::from(frame));
        assert_eq!(binary.tag_report().and_then(|r| r.antenna()), Some(2));

        let structured = decode(Bytes::from_static(b"[1, 2]"));
        assert_eq!(structured.tag_report(), None);
    }

    proptest! {
        #[test]
        fn short_frames_always_fail(buf in proptest::collection::vec(any::<u8>(), 0..tag_report::MIN_LEN)) {
            let record = decode_tag_report(&buf);
            prop_assert!(!record.is_success());
            let expected = format!("got {} bytes", buf.len());
            prop_assert!(record.error().unwrap().contains(&expected));
        }

        #[test]
        fn long_frames_always_decode(buf in proptest::collection::vec(any::<u8>(), tag_report::MIN_LEN..256)) {
            let record = decode_tag_report(&buf);
            let read = record.read().unwrap();
            prop_assert_eq!(read.antenna(), buf[49]);
            prop_assert_eq!(read.rssi_raw(), i16::from_be_bytes([buf[47], buf[48]]));
        }

        #[test]
        fn decode_keeps_binary_bytes(buf in proptest::collection::vec(any::<u8>(), 0..512)) {
            let raw = Bytes::from(buf);
            if let DecodedMessage::Binary(bytes) = decode(raw.clone()) {
                prop_assert_eq!(bytes, raw);
            }
        }
    }
}
