//! # rfidlink-core
//!
//! Core protocol implementation for networked UHF RFID readers.
//!
//! This crate provides the low-level protocol primitives:
//! - Command table (named commands to configured bytes)
//! - Inbound frame decoding (structured vs. binary, tag reports, envelopes)
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod error;
pub mod frame;

pub use command::CommandTable;
pub use error::{Error, Result};
pub use frame::{decode, decode_envelope, decode_tag_report, DecodedMessage};

pub use rfidlink_types::{TagRead, TagRecord};
