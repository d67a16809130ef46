//! Type definitions for rfidlink

pub mod tag;

pub use tag::{spaced_hex, TagRead, TagRecord};
