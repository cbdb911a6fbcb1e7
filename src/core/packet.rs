//! # Hexabus Packets
//!
//! The six packet variants and their binary codec.
//!
//! ## Wire Format
//! ```text
//! [Header "HX0B"(4)] [Type(1)] [Flags(1)=0] [Body(N)] [CRC16 BE(2)]
//!
//! ERROR            body = [code]
//! QUERY / EPQUERY  body = [eid]
//! INFO / WRITE     body = [eid][data type][value(width)]
//! EPINFO           body = [eid][data type][description(128)]
//! ```
//!
//! The checksum covers every byte before it, header included. A datagram must hold
//! exactly one packet: short input is `Truncated`, extra bytes are `TrailingBytes`.

use crate::config::{HEADER, MAX_PACKET_SIZE};
use crate::core::crc::crc16;
use crate::core::types::{DataType, ErrorCode, PacketType};
use crate::core::value::{get_string, put_string, validate_string, Value};
use crate::error::{HexabusError, MalformedPacket, Result};
use crate::utils::hexdump::HexDump;
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::net::SocketAddr;
use tracing::trace;

/// Header, type and flags
const PREFIX_LEN: usize = 6;
const CRC_LEN: usize = 2;

/// Validate an EID given as a wider integer.
pub fn checked_eid(eid: u32) -> Result<u8> {
    u8::try_from(eid).map_err(|_| HexabusError::EidOutOfRange(eid))
}

/// A decoded Hexabus packet. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Error {
        code: ErrorCode,
    },
    Info {
        eid: u8,
        value: Value,
    },
    Query {
        eid: u8,
    },
    Write {
        eid: u8,
        value: Value,
    },
    /// Describes an endpoint; `data_type` is the endpoint's type, the payload on
    /// the wire is always the 128-byte description.
    EndpointInfo {
        eid: u8,
        data_type: DataType,
        description: String,
    },
    EndpointQuery {
        eid: u8,
    },
}

impl Packet {
    pub fn error(code: ErrorCode) -> Self {
        Packet::Error { code }
    }

    pub fn query(eid: u32) -> Result<Self> {
        Ok(Packet::Query {
            eid: checked_eid(eid)?,
        })
    }

    pub fn endpoint_query(eid: u32) -> Result<Self> {
        Ok(Packet::EndpointQuery {
            eid: checked_eid(eid)?,
        })
    }

    pub fn info(eid: u32, value: Value) -> Result<Self> {
        let eid = checked_eid(eid)?;
        value.validate()?;
        Ok(Packet::Info { eid, value })
    }

    pub fn write(eid: u32, value: Value) -> Result<Self> {
        let eid = checked_eid(eid)?;
        value.validate()?;
        Ok(Packet::Write { eid, value })
    }

    pub fn endpoint_info(eid: u32, data_type: DataType, description: &str) -> Result<Self> {
        let eid = checked_eid(eid)?;
        validate_string(description)?;
        Ok(Packet::EndpointInfo {
            eid,
            data_type,
            description: description.to_owned(),
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Error { .. } => PacketType::Error,
            Packet::Info { .. } => PacketType::Info,
            Packet::Query { .. } => PacketType::Query,
            Packet::Write { .. } => PacketType::Write,
            Packet::EndpointInfo { .. } => PacketType::EndpointInfo,
            Packet::EndpointQuery { .. } => PacketType::EndpointQuery,
        }
    }

    /// Endpoint addressed by this packet; `None` for `Error`.
    pub fn eid(&self) -> Option<u8> {
        match self {
            Packet::Error { .. } => None,
            Packet::Info { eid, .. }
            | Packet::Query { eid }
            | Packet::Write { eid, .. }
            | Packet::EndpointInfo { eid, .. }
            | Packet::EndpointQuery { eid } => Some(*eid),
        }
    }

    /// Number of bytes `encode` produces.
    pub fn encoded_len(&self) -> usize {
        let body = match self {
            Packet::Error { .. } | Packet::Query { .. } | Packet::EndpointQuery { .. } => 1,
            Packet::Info { value, .. } | Packet::Write { value, .. } => {
                2 + value.data_type().width()
            }
            Packet::EndpointInfo { .. } => 2 + DataType::String.width(),
        };
        PREFIX_LEN + body + CRC_LEN
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Append the encoded packet to `buf`. Nothing is appended on error.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Packet::Info { value, .. } | Packet::Write { value, .. } => value.validate()?,
            Packet::EndpointInfo { description, .. } => validate_string(description)?,
            _ => {}
        }

        let start = buf.len();
        buf.reserve(self.encoded_len());
        buf.put_u32(HEADER);
        buf.put_u8(self.packet_type().code());
        buf.put_u8(0);

        match self {
            Packet::Error { code } => buf.put_u8(code.code()),
            Packet::Query { eid } | Packet::EndpointQuery { eid } => buf.put_u8(*eid),
            Packet::Info { eid, value } | Packet::Write { eid, value } => {
                buf.put_u8(*eid);
                buf.put_u8(value.data_type().code());
                value.encode(buf)?;
            }
            Packet::EndpointInfo {
                eid,
                data_type,
                description,
            } => {
                buf.put_u8(*eid);
                buf.put_u8(data_type.code());
                put_string(description, buf)?;
            }
        }

        let crc = crc16(&buf[start..]);
        buf.put_u16(crc);
        trace!(packet_type = %self.packet_type(), bytes = %HexDump(&buf[start..]), "Encoded packet");
        Ok(())
    }

    /// Decode one datagram.
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, MalformedPacket> {
        trace!(len = bytes.len(), bytes = %HexDump(bytes), "Decoding packet");

        let header = HEADER.to_be_bytes();
        if !bytes.starts_with(&header) {
            if bytes.len() < header.len() && header.starts_with(bytes) {
                return Err(MalformedPacket::Truncated {
                    needed: PREFIX_LEN,
                    available: bytes.len(),
                });
            }
            return Err(MalformedPacket::MissingHeader);
        }
        if bytes.len() < PREFIX_LEN {
            return Err(MalformedPacket::Truncated {
                needed: PREFIX_LEN,
                available: bytes.len(),
            });
        }

        let packet_type = PacketType::from_code(bytes[4])?;
        let expected = expected_len(packet_type, bytes)?;
        if bytes.len() < expected {
            return Err(MalformedPacket::Truncated {
                needed: expected,
                available: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(MalformedPacket::TrailingBytes(bytes.len() - expected));
        }

        let crc_at = expected - CRC_LEN;
        let received = u16::from_be_bytes([bytes[crc_at], bytes[crc_at + 1]]);
        let calculated = crc16(&bytes[..crc_at]);
        if received != calculated {
            return Err(MalformedPacket::CrcMismatch {
                received,
                calculated,
            });
        }

        let mut body = &bytes[PREFIX_LEN..crc_at];
        let packet = match packet_type {
            PacketType::Error => Packet::Error {
                code: ErrorCode::from_code(body.get_u8())?,
            },
            PacketType::Query => Packet::Query { eid: body.get_u8() },
            PacketType::EndpointQuery => Packet::EndpointQuery { eid: body.get_u8() },
            PacketType::Info | PacketType::Write => {
                let eid = body.get_u8();
                let data_type = DataType::from_code(body.get_u8())?;
                let value = Value::decode(data_type, &mut body);
                if packet_type == PacketType::Info {
                    Packet::Info { eid, value }
                } else {
                    Packet::Write { eid, value }
                }
            }
            PacketType::EndpointInfo => {
                let eid = body.get_u8();
                let data_type = DataType::from_code(body.get_u8())?;
                Packet::EndpointInfo {
                    eid,
                    data_type,
                    description: get_string(&mut body),
                }
            }
        };
        Ok(packet)
    }
}

/// Total length implied by the type byte and, for value bodies, the data type byte.
fn expected_len(
    packet_type: PacketType,
    bytes: &[u8],
) -> std::result::Result<usize, MalformedPacket> {
    let body = match packet_type {
        PacketType::Error | PacketType::Query | PacketType::EndpointQuery => 1,
        PacketType::Info | PacketType::Write | PacketType::EndpointInfo => {
            let Some(&code) = bytes.get(PREFIX_LEN + 1) else {
                return Err(MalformedPacket::Truncated {
                    needed: PREFIX_LEN + 2,
                    available: bytes.len(),
                });
            };
            let data_type = DataType::from_code(code)?;
            let width = if packet_type == PacketType::EndpointInfo {
                DataType::String.width()
            } else {
                data_type.width()
            };
            2 + width
        }
    };
    let len = PREFIX_LEN + body + CRC_LEN;
    debug_assert!(len <= MAX_PACKET_SIZE);
    Ok(len)
}

impl Packet {
    fn fmt_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Error { code } => write!(f, "{code}"),
            Packet::Query { eid } | Packet::EndpointQuery { eid } => write!(f, "{eid}"),
            Packet::Info { eid, value } | Packet::Write { eid, value } => {
                write!(f, "{eid}/{} {value}", value.data_type())
            }
            Packet::EndpointInfo {
                eid,
                data_type,
                description,
            } => write!(f, "{eid}/{data_type} {description:?}"),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : ", self.packet_type())?;
        self.fmt_body(f)
    }
}

/// A packet together with the address it arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPacket {
    pub packet: Packet,
    pub source: SocketAddr,
}

impl ReceivedPacket {
    pub fn decode(bytes: &[u8], source: SocketAddr) -> std::result::Result<Self, MalformedPacket> {
        Ok(ReceivedPacket {
            packet: Packet::decode(bytes)?,
            source,
        })
    }
}

impl fmt::Display for ReceivedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] : ", self.packet.packet_type(), self.source)?;
        self.packet.fmt_body(f)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn info_uint8_wire_example() {
        let packet = Packet::info(5, Value::Uint8(200)).unwrap();
        let bytes = packet.encode().unwrap();
        assert_eq!(
            bytes,
            vec![0x48, 0x58, 0x30, 0x42, 0x01, 0x00, 0x05, 0x02, 0xC8, 0x1D, 0x5C]
        );
        assert_eq!(bytes.len(), packet.encoded_len());
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn query_and_error_are_nine_bytes() {
        let query = Packet::query(7).unwrap().encode().unwrap();
        assert_eq!(query, vec![0x48, 0x58, 0x30, 0x42, 0x02, 0x00, 0x07, 0x42, 0xC4]);

        let error = Packet::error(ErrorCode::UnknownEid).encode().unwrap();
        assert_eq!(error, vec![0x48, 0x58, 0x30, 0x42, 0x00, 0x00, 0x01, 0x92, 0x4A]);
    }

    #[test]
    fn endpoint_info_is_full_size() {
        let packet = Packet::endpoint_info(3, DataType::Bool, "Main switch").unwrap();
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes.len(), MAX_PACKET_SIZE);
        assert_eq!(bytes[7], DataType::Bool.code());
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn eid_bound_is_checked() {
        assert!(Packet::query(255).is_ok());
        assert!(matches!(
            Packet::query(256),
            Err(HexabusError::EidOutOfRange(256))
        ));
        assert!(matches!(
            Packet::write(1000, Value::Bool(true)),
            Err(HexabusError::EidOutOfRange(1000))
        ));
    }

    #[test]
    fn invalid_string_produces_no_bytes() {
        let packet = Packet::Write {
            eid: 1,
            value: Value::String("y".repeat(200)),
        };
        let mut buf = BytesMut::from(&b"keep"[..]);
        assert!(matches!(
            packet.encode_into(&mut buf),
            Err(HexabusError::StringTooLong(200))
        ));
        assert_eq!(&buf[..], b"keep");
    }

    #[test]
    fn decode_rejects_bad_framing() {
        let good = Packet::query(7).unwrap().encode().unwrap();

        let mut bad_header = good.clone();
        bad_header[0] = b'X';
        assert_eq!(Packet::decode(&bad_header), Err(MalformedPacket::MissingHeader));

        assert!(matches!(
            Packet::decode(&good[..good.len() - 1]),
            Err(MalformedPacket::Truncated { needed: 9, available: 8 })
        ));

        let mut long = good.clone();
        long.push(0);
        assert_eq!(Packet::decode(&long), Err(MalformedPacket::TrailingBytes(1)));

        let mut bad_type = good.clone();
        bad_type[4] = 0x03;
        assert_eq!(
            Packet::decode(&bad_type),
            Err(MalformedPacket::UnknownPacketType(0x03))
        );

        let mut bad_crc = good;
        bad_crc[8] ^= 0x01;
        assert!(matches!(
            Packet::decode(&bad_crc),
            Err(MalformedPacket::CrcMismatch { .. })
        ));
    }

    #[test]
    fn unknown_data_type_and_error_code() {
        let mut info = Packet::info(1, Value::Bool(true)).unwrap().encode().unwrap();
        info[7] = 9;
        assert_eq!(Packet::decode(&info), Err(MalformedPacket::UnknownDataType(9)));

        let mut bytes = vec![0x48, 0x58, 0x30, 0x42, 0x00, 0x00, 0x07];
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(Packet::decode(&bytes), Err(MalformedPacket::UnknownErrorCode(7)));
    }

    #[test]
    fn display_forms() {
        let source: SocketAddr = "[::1]:61616".parse().unwrap();
        let received = ReceivedPacket {
            packet: Packet::info(5, Value::Uint8(200)).unwrap(),
            source,
        };
        assert_eq!(received.to_string(), "INFO [[::1]:61616] : 5/UINT8 200");
        assert_eq!(
            Packet::error(ErrorCode::CrcFailed).to_string(),
            "ERROR : CRCFAILED"
        );
    }
}
