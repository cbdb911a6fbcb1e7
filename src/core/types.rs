//! Wire-level enumerations: packet types, data types and error codes.
//!
//! Every enum maps to exactly one byte on the wire. Unknown codes are reported
//! through [`MalformedPacket`] by the decoder, never silently mapped.

use crate::error::MalformedPacket;
use std::fmt;

/// Packet type byte, the fifth byte of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Error,
    Info,
    Query,
    Write,
    EndpointInfo,
    EndpointQuery,
}

impl PacketType {
    /// Get the type identifier byte for the wire protocol
    pub const fn code(self) -> u8 {
        match self {
            PacketType::Error => 0x00,
            PacketType::Info => 0x01,
            PacketType::Query => 0x02,
            PacketType::Write => 0x04,
            PacketType::EndpointInfo => 0x09,
            PacketType::EndpointQuery => 0x0A,
        }
    }

    /// Look up a packet type from its identifier byte
    pub fn from_code(code: u8) -> Result<Self, MalformedPacket> {
        match code {
            0x00 => Ok(PacketType::Error),
            0x01 => Ok(PacketType::Info),
            0x02 => Ok(PacketType::Query),
            0x04 => Ok(PacketType::Write),
            0x09 => Ok(PacketType::EndpointInfo),
            0x0A => Ok(PacketType::EndpointQuery),
            other => Err(MalformedPacket::UnknownPacketType(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketType::Error => "ERROR",
            PacketType::Info => "INFO",
            PacketType::Query => "QUERY",
            PacketType::Write => "WRITE",
            PacketType::EndpointInfo => "EPINFO",
            PacketType::EndpointQuery => "EPQUERY",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of value stored at an endpoint. Each kind has a fixed on-wire width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Uint8,
    Uint32,
    DateTime,
    Float,
    String,
    Timestamp,
}

impl DataType {
    /// All data types in wire-code order
    pub const ALL: [DataType; 7] = [
        DataType::Bool,
        DataType::Uint8,
        DataType::Uint32,
        DataType::DateTime,
        DataType::Float,
        DataType::String,
        DataType::Timestamp,
    ];

    pub const fn code(self) -> u8 {
        match self {
            DataType::Bool => 1,
            DataType::Uint8 => 2,
            DataType::Uint32 => 3,
            DataType::DateTime => 4,
            DataType::Float => 5,
            DataType::String => 6,
            DataType::Timestamp => 7,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, MalformedPacket> {
        match code {
            1 => Ok(DataType::Bool),
            2 => Ok(DataType::Uint8),
            3 => Ok(DataType::Uint32),
            4 => Ok(DataType::DateTime),
            5 => Ok(DataType::Float),
            6 => Ok(DataType::String),
            7 => Ok(DataType::Timestamp),
            other => Err(MalformedPacket::UnknownDataType(other)),
        }
    }

    /// Number of payload bytes a value of this type occupies on the wire.
    ///
    /// Never variable: a `String` always takes 128 bytes, whatever its content.
    pub const fn width(self) -> usize {
        match self {
            DataType::Bool | DataType::Uint8 => 1,
            DataType::Uint32 | DataType::Float | DataType::Timestamp => 4,
            DataType::DateTime => 8,
            DataType::String => 128,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Uint8 => "UINT8",
            DataType::Uint32 => "UINT32",
            DataType::DateTime => "DATETIME",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error code carried by an `Error` packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownEid,
    WriteReadOnly,
    CrcFailed,
    DataType,
}

impl ErrorCode {
    pub const fn code(self) -> u8 {
        match self {
            ErrorCode::UnknownEid => 1,
            ErrorCode::WriteReadOnly => 2,
            ErrorCode::CrcFailed => 3,
            ErrorCode::DataType => 4,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, MalformedPacket> {
        match code {
            1 => Ok(ErrorCode::UnknownEid),
            2 => Ok(ErrorCode::WriteReadOnly),
            3 => Ok(ErrorCode::CrcFailed),
            4 => Ok(ErrorCode::DataType),
            other => Err(MalformedPacket::UnknownErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::UnknownEid => "UNKNOWNEID",
            ErrorCode::WriteReadOnly => "WRITEREADONLY",
            ErrorCode::CrcFailed => "CRCFAILED",
            ErrorCode::DataType => "DATATYPE",
        };
        f.write_str(name)
    }
}
