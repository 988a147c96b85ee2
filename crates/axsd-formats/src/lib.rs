//! AXSD bytestream decoding for the AxolotlSD sound driver.
//!
//! Parses the packed song format (a timeline of channel events plus the
//! patch and drum waveforms they reference) into the IR consumed by the
//! playback engine.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod axsd_format;

pub use axsd_format::{decode, decode_from_c_array};

/// Error type for AXSD decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// First four bytes are not the `AXSD` magic
    BadMagic,
    /// A record tag byte matched no known command
    UnknownTag(u8),
    /// A record's payload ran past the end of the buffer
    Truncated,
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FormatError::BadMagic => write!(f, "first 4 bytes of this song are not 'AXSD'"),
            FormatError::UnknownTag(tag) => write!(f, "unknown command tag 0x{:02X}", tag),
            FormatError::Truncated => write!(f, "record payload ran past end of buffer"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
