//! Reader envelope dispatch
//!
//! The codec only exposes the envelope discriminator. Which discriminator
//! means what is reader policy, and lives here.

use bytes::Bytes;
use serde_json::Value;

use rfidlink_core::constants::envelope;
use rfidlink_core::{decode_envelope, decode_tag_report, DecodedMessage};
use rfidlink_types::TagRecord;

/// What one inbound chunk means to the application
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    /// Inventory loop report carrying one tag read
    TagReport(TagRecord),

    /// Reader acknowledged the loop stop command
    LoopStopped,

    /// Envelope with a discriminator this crate has no handler for
    Envelope { command: u8, frame: Bytes },

    /// JSON message
    Structured(Value),

    /// Binary data that is not an envelope
    Unrecognized(Bytes),
}

impl ReaderEvent {
    /// Classify a decoded chunk
    pub fn from_message(message: DecodedMessage) -> Self {
        match message {
            DecodedMessage::Structured(value) => Self::Structured(value),
            DecodedMessage::Binary(frame) => match decode_envelope(&frame) {
                Some(envelope::LOOP_REPORT) => Self::TagReport(decode_tag_report(&frame)),
                Some(envelope::LOOP_STOP_ACK) => Self::LoopStopped,
                Some(command) => Self::Envelope { command, frame },
                None => Self::Unrecognized(frame),
            },
        }
    }
}

impl From<DecodedMessage> for ReaderEvent {
    fn from(message: DecodedMessage) -> Self {
        Self::from_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn envelope_frame(command: u8, len: usize) -> Bytes {
        let mut frame = vec![0u8; len];
        frame[0] = 0xA5;
        frame[1] = 0x5A;
        frame[4] = command;
        frame[47] = 0xFD;
        frame[48] = 0x6F;
        if len > 49 {
            frame[49] = 2;
        }
        Bytes::from(frame)
    }

    #[test]
    fn test_loop_report() {
        let event = ReaderEvent::from_message(DecodedMessage::Binary(envelope_frame(0x83, 53)));

        match event {
            ReaderEvent::TagReport(record) => {
                assert!(record.is_success());
                assert_eq!(record.antenna(), Some(2));
                assert_eq!(record.rssi_dbm(), Some(-65.7));
            }
            other => panic!("expected tag report, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_loop_report() {
        let event = ReaderEvent::from_message(DecodedMessage::Binary(envelope_frame(0x83, 49)));

        match event {
            ReaderEvent::TagReport(record) => assert!(!record.is_success()),
            other => panic!("expected failed tag report, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_stop_ack() {
        let event = ReaderEvent::from(DecodedMessage::Binary(envelope_frame(0x8D, 49)));
        assert_eq!(event, ReaderEvent::LoopStopped);
    }

    #[test]
    fn test_other_envelope() {
        let frame = envelope_frame(0x11, 49);
        let event = ReaderEvent::from(DecodedMessage::Binary(frame.clone()));

        assert_eq!(event, ReaderEvent::Envelope { command: 0x11, frame });
    }

    #[test]
    fn test_structured_and_unrecognized() {
        let value = json!({"type": "production_data"});
        assert_eq!(
            ReaderEvent::from(DecodedMessage::Structured(value.clone())),
            ReaderEvent::Structured(value)
        );

        let junk = Bytes::from_static(&[0x00, 0x01, 0x02]);
        assert_eq!(
            ReaderEvent::from(DecodedMessage::Binary(junk.clone())),
            ReaderEvent::Unrecognized(junk)
        );
    }
}
