//! # Error Types
//!
//! Error handling for the Hexabus codec, device model and transports.
//!
//! Two enums cover everything that can go wrong:
//! - [`MalformedPacket`]: a datagram that could not be decoded. Receive loops log
//!   and drop these; only explicit [`Packet::decode`](crate::core::packet::Packet::decode)
//!   callers ever see them.
//! - [`HexabusError`]: everything a caller of the public API can observe.
//!
//! ## Error Categories
//! - **Local validation**: EID out of range, unknown endpoint, data type mismatch,
//!   invalid string payloads. Raised before any byte reaches a socket.
//! - **Remote**: the device answered with an `Error` packet.
//! - **Timeout**: no correlated reply arrived in time.
//! - **Transport**: socket I/O failures and use after close.
//!
//! ## Example Usage
//! ```rust,no_run
//! use hexabus::error::{HexabusError, Result};
//! use hexabus::{Device, Hexabus};
//! use std::sync::Arc;
//! use tracing::{info, warn};
//!
//! fn read_switch(device: &Device<Hexabus>) -> Result<bool> {
//!     match device.query::<bool>(1) {
//!         Ok(on) => Ok(on),
//!         Err(HexabusError::NoResponse(after)) => {
//!             warn!(?after, "Device did not answer");
//!             Ok(false)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let bus = Arc::new(Hexabus::new()?);
//!     let device = Device::new(bus, "[fe80::50:c4ff:fe04:819a]:61616".parse().unwrap());
//!     info!(on = read_switch(&device)?, "Switch state");
//!     Ok(())
//! }
//! ```

use crate::core::types::{DataType, ErrorCode, PacketType};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Static messages shared by log statements and error paths.
pub mod constants {
    pub const ERR_MISSING_HEADER: &str = "Missing Hexabus header";
    pub const ERR_CRC_MISMATCH: &str = "CRC error";
    pub const ERR_NO_RESPONSE: &str = "No response within timeout";
    pub const ERR_TRANSPORT_CLOSED: &str = "Transport closed";
    pub const ERR_RECEIVER_IO: &str = "I/O error in the receiving thread";
    pub const ERR_ILLEGAL_PACKET: &str = "Received illegal packet";
    pub const ERR_UNEXPECTED_REPLY: &str = "Unexpected reply received";
}

/// Reasons a datagram could not be decoded into a [`Packet`](crate::core::packet::Packet).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPacket {
    #[error("Missing header")]
    MissingHeader,

    #[error("Unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),

    #[error("Unknown data type: {0:#04x}")]
    UnknownDataType(u8),

    #[error("Unknown error code: {0:#04x}")]
    UnknownErrorCode(u8),

    #[error("Truncated packet: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("{0} unexpected bytes after the checksum")]
    TrailingBytes(usize),

    #[error("CRC error: received {received:#06x}, calculated {calculated:#06x}")]
    CrcMismatch { received: u16, calculated: u16 },
}

/// The primary error type for all Hexabus operations
#[derive(Error, Debug)]
pub enum HexabusError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed packet: {0}")]
    Malformed(#[from] MalformedPacket),

    #[error("EID too large: {0} (maximum is 255)")]
    EidOutOfRange(u32),

    #[error("EID not found: {0}")]
    UnknownEndpoint(u8),

    #[error("Wrong data type: {expected} expected, got {actual}")]
    WrongDataType { expected: DataType, actual: DataType },

    #[error("String too long: {0} characters (maximum is 127)")]
    StringTooLong(usize),

    #[error("Non-ASCII string")]
    NonAsciiString,

    #[error("String contains a NUL character at position {0}")]
    StringContainsNul(usize),

    #[error("Error packet received: {0}")]
    Remote(ErrorCode),

    #[error("Unexpected reply received: {0}")]
    UnexpectedReply(PacketType),

    #[error("No response within {0:?}")]
    NoResponse(Duration),

    #[error("Transport closed")]
    Closed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HexabusError {
    /// Whether the failure happened before anything was put on the wire.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            HexabusError::EidOutOfRange(_)
                | HexabusError::UnknownEndpoint(_)
                | HexabusError::WrongDataType { .. }
                | HexabusError::StringTooLong(_)
                | HexabusError::NonAsciiString
                | HexabusError::StringContainsNul(_)
                | HexabusError::ConfigError(_)
        )
    }
}

/// Type alias for Results using HexabusError
pub type Result<T> = std::result::Result<T, HexabusError>;
