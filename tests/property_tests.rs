//! Property-based tests using proptest
//!
//! These tests validate codec invariants across randomly generated packets and
//! arbitrary datagrams.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hexabus::core::crc::crc16;
use hexabus::{DataType, DateTime, ErrorCode, Packet, Timestamp, Value};
use proptest::prelude::*;

fn ascii_string() -> impl Strategy<Value = String> {
    // NUL ends a string on the wire and trailing whitespace is trimmed on decode
    prop::collection::vec(1u8..0x80, 0..=127).prop_map(|bytes| {
        let s: String = bytes.into_iter().map(char::from).collect();
        s.trim_end().to_owned()
    })
}

fn data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(DataType::ALL.to_vec())
}

fn error_code() -> impl Strategy<Value = ErrorCode> {
    prop_oneof![
        Just(ErrorCode::UnknownEid),
        Just(ErrorCode::WriteReadOnly),
        Just(ErrorCode::CrcFailed),
        Just(ErrorCode::DataType),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<u8>().prop_map(Value::Uint8),
        any::<u32>().prop_map(Value::Uint32),
        (any::<[u8; 5]>(), any::<u16>(), any::<u8>()).prop_map(|(b, year, weekday)| {
            Value::DateTime(DateTime {
                hour: b[0],
                minute: b[1],
                second: b[2],
                day: b[3],
                month: b[4],
                year,
                weekday,
            })
        }),
        // NaN never compares equal, compare finite floats only
        (-1.0e30f32..1.0e30f32).prop_map(Value::Float),
        ascii_string().prop_map(Value::String),
        any::<u32>().prop_map(|secs| Value::Timestamp(Timestamp(secs))),
    ]
}

fn packet() -> impl Strategy<Value = Packet> {
    prop_oneof![
        error_code().prop_map(|code| Packet::Error { code }),
        (any::<u8>(), value()).prop_map(|(eid, value)| Packet::Info { eid, value }),
        any::<u8>().prop_map(|eid| Packet::Query { eid }),
        (any::<u8>(), value()).prop_map(|(eid, value)| Packet::Write { eid, value }),
        (any::<u8>(), data_type(), ascii_string()).prop_map(|(eid, data_type, description)| {
            Packet::EndpointInfo {
                eid,
                data_type,
                description,
            }
        }),
        any::<u8>().prop_map(|eid| Packet::EndpointQuery { eid }),
    ]
}

// Property: every packet decodes back to itself
proptest! {
    #[test]
    fn prop_packet_roundtrip(packet in packet()) {
        let bytes = packet.encode().expect("valid packets encode");
        let decoded = Packet::decode(&bytes).expect("encoded packets decode");
        prop_assert_eq!(decoded, packet);
    }
}

// Property: encoded length is fixed by packet and data type, never by content
proptest! {
    #[test]
    fn prop_encoded_length_is_fixed(packet in packet()) {
        let bytes = packet.encode().unwrap();
        prop_assert_eq!(bytes.len(), packet.encoded_len());

        let expected = match &packet {
            Packet::Error { .. } | Packet::Query { .. } | Packet::EndpointQuery { .. } => 9,
            Packet::Info { value, .. } | Packet::Write { value, .. } => 10 + value.data_type().width(),
            Packet::EndpointInfo { .. } => 138,
        };
        prop_assert_eq!(bytes.len(), expected);
    }
}

// Property: any single flipped bit is detected
proptest! {
    #[test]
    fn prop_single_bit_flip_detected(packet in packet(), bit in any::<prop::sample::Index>()) {
        let mut bytes = packet.encode().unwrap();
        let bit = bit.index(bytes.len() * 8);
        bytes[bit / 8] ^= 1 << (bit % 8);

        let decoded = Packet::decode(&bytes);
        prop_assert!(decoded.is_err(), "flip of bit {} went unnoticed", bit);
    }
}

// Property: the trailing checksum is the checksum of everything before it
proptest! {
    #[test]
    fn prop_checksum_covers_prefix(packet in packet()) {
        let bytes = packet.encode().unwrap();
        let (body, crc) = bytes.split_at(bytes.len() - 2);
        prop_assert_eq!(crc16(body).to_be_bytes(), [crc[0], crc[1]]);
    }
}

// Property: decoding arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_decode_arbitrary_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = Packet::decode(&data);
    }
}

// Property: arbitrary bodies behind a valid header never panic either
proptest! {
    #[test]
    fn prop_decode_with_header_never_panics(
        packet_type in any::<u8>(),
        body in prop::collection::vec(any::<u8>(), 0..140),
    ) {
        let mut bytes = vec![0x48, 0x58, 0x30, 0x42, packet_type, 0];
        bytes.extend_from_slice(&body);
        let _ = Packet::decode(&bytes);
    }
}
