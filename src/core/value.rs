//! # Typed Endpoint Values
//!
//! [`Value`] is the decoded form of an `Info`/`Write` payload. Each variant maps to
//! one [`DataType`] and always occupies that type's fixed width on the wire.
//!
//! ## Payload layouts (big-endian)
//! ```text
//! BOOL       [0|1]                              1 byte, any non-zero byte reads as true
//! UINT8      [u8]                               1 byte
//! UINT32     [u32]                              4 bytes
//! DATETIME   [h][m][s][day][month][year(2)][wd] 8 bytes, month 1-based, weekday 0 = Sunday
//! FLOAT      [f32]                              4 bytes IEEE-754
//! STRING     [ascii... 0 0 0]                   128 bytes, zero padded
//! TIMESTAMP  [u32]                              4 bytes, seconds since the Unix epoch
//! ```
//!
//! The [`HexabusValue`] trait ties Rust types to data types so that typed reads and
//! writes can be checked before touching the network.

use crate::core::types::DataType;
use crate::error::{HexabusError, Result};
use bytes::{Buf, BufMut};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest string that fits a STRING payload; one byte is kept for the terminator.
pub const MAX_STRING_LEN: usize = DataType::String.width() - 1;

/// Civil date and time as transmitted by DATETIME endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day: u8,
    /// 1 = January
    pub month: u8,
    pub year: u16,
    /// 0 = Sunday
    pub weekday: u8,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} (wd {})",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.weekday
        )
    }
}

/// Seconds since the Unix epoch, 32 bits wide on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub fn to_system_time(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(u64::from(self.0))
    }

    /// Convert a `SystemTime`, saturating outside the representable range.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Timestamp(u32::try_from(secs).unwrap_or(u32::MAX))
    }
}

/// A decoded endpoint value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Uint8(u8),
    Uint32(u32),
    DateTime(DateTime),
    Float(f32),
    String(String),
    Timestamp(Timestamp),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Uint8(_) => DataType::Uint8,
            Value::Uint32(_) => DataType::Uint32,
            Value::DateTime(_) => DataType::DateTime,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Check the value can be encoded: strings must be ASCII and at most 127 long.
    pub fn validate(&self) -> Result<()> {
        match self {
            Value::String(s) => validate_string(s),
            _ => Ok(()),
        }
    }

    /// Write exactly `self.data_type().width()` bytes.
    pub(crate) fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        match self {
            Value::Bool(v) => buf.put_u8(u8::from(*v)),
            Value::Uint8(v) => buf.put_u8(*v),
            Value::Uint32(v) => buf.put_u32(*v),
            Value::DateTime(dt) => {
                buf.put_u8(dt.hour);
                buf.put_u8(dt.minute);
                buf.put_u8(dt.second);
                buf.put_u8(dt.day);
                buf.put_u8(dt.month);
                buf.put_u16(dt.year);
                buf.put_u8(dt.weekday);
            }
            Value::Float(v) => buf.put_f32(*v),
            Value::String(s) => put_string(s, buf)?,
            Value::Timestamp(ts) => buf.put_u32(ts.0),
        }
        Ok(())
    }

    /// Read a value of type `data_type`. The caller guarantees `width()` bytes remain.
    pub(crate) fn decode<B: Buf>(data_type: DataType, buf: &mut B) -> Self {
        match data_type {
            // Devices are known to send other non-zero bytes for "on"
            DataType::Bool => Value::Bool(buf.get_u8() != 0),
            DataType::Uint8 => Value::Uint8(buf.get_u8()),
            DataType::Uint32 => Value::Uint32(buf.get_u32()),
            DataType::DateTime => Value::DateTime(DateTime {
                hour: buf.get_u8(),
                minute: buf.get_u8(),
                second: buf.get_u8(),
                day: buf.get_u8(),
                month: buf.get_u8(),
                year: buf.get_u16(),
                weekday: buf.get_u8(),
            }),
            DataType::Float => Value::Float(buf.get_f32()),
            DataType::String => Value::String(get_string(buf)),
            DataType::Timestamp => Value::Timestamp(Timestamp(buf.get_u32())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Timestamp(v) => write!(f, "@{}", v.0),
        }
    }
}

pub(crate) fn validate_string(s: &str) -> Result<()> {
    if !s.is_ascii() {
        return Err(HexabusError::NonAsciiString);
    }
    if s.len() > MAX_STRING_LEN {
        return Err(HexabusError::StringTooLong(s.len()));
    }
    // A NUL would end the field early on the wire
    if let Some(pos) = s.bytes().position(|b| b == 0) {
        return Err(HexabusError::StringContainsNul(pos));
    }
    Ok(())
}

/// Write `s` zero padded to the full STRING width.
pub(crate) fn put_string<B: BufMut>(s: &str, buf: &mut B) -> Result<()> {
    validate_string(s)?;
    buf.put_slice(s.as_bytes());
    buf.put_bytes(0, DataType::String.width() - s.len());
    Ok(())
}

/// Read a full STRING field; content ends at the first zero byte.
///
/// Bytes outside ASCII become U+FFFD and trailing whitespace is trimmed.
pub(crate) fn get_string<B: Buf>(buf: &mut B) -> String {
    let mut raw = [0u8; DataType::String.width()];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text: String = raw[..end]
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                char::from(b)
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect();
    text.trim_end().to_owned()
}

/// Rust types that can be read from and written to an endpoint.
pub trait HexabusValue: Sized {
    /// The endpoint data type this Rust type corresponds to
    const DATA_TYPE: DataType;

    fn into_value(self) -> Value;

    /// Extract from a value of the matching type; `None` for any other variant.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! hexabus_value {
    ($ty:ty, $variant:ident) => {
        impl HexabusValue for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

hexabus_value!(bool, Bool);
hexabus_value!(u8, Uint8);
hexabus_value!(u32, Uint32);
hexabus_value!(DateTime, DateTime);
hexabus_value!(f32, Float);
hexabus_value!(String, String);
hexabus_value!(Timestamp, Timestamp);

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use bytes::BytesMut;

    fn encoded(value: &Value) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.encode(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn every_value_uses_its_fixed_width() {
        let values = [
            Value::Bool(true),
            Value::Uint8(7),
            Value::Uint32(0xDEAD_BEEF),
            Value::DateTime(DateTime::default()),
            Value::Float(1.5),
            Value::String("abc".into()),
            Value::Timestamp(Timestamp(1)),
        ];
        for value in &values {
            assert_eq!(encoded(value).len(), value.data_type().width(), "{value:?}");
        }
    }

    #[test]
    fn datetime_layout() {
        let dt = DateTime {
            hour: 13,
            minute: 37,
            second: 5,
            day: 24,
            month: 12,
            year: 2013,
            weekday: 2,
        };
        assert_eq!(
            encoded(&Value::DateTime(dt)),
            vec![13, 37, 5, 24, 12, 0x07, 0xDD, 2]
        );
    }

    #[test]
    fn lenient_bool_decode() {
        for (byte, expected) in [(0u8, false), (1, true), (2, true), (0xFF, true)] {
            let mut buf = &[byte][..];
            assert_eq!(
                Value::decode(DataType::Bool, &mut buf),
                Value::Bool(expected)
            );
        }
    }

    #[test]
    fn string_is_zero_padded_and_trimmed_on_decode() {
        let bytes = encoded(&Value::String("Plug".into()));
        assert_eq!(&bytes[..4], b"Plug");
        assert!(bytes[4..].iter().all(|&b| b == 0));

        let mut buf = &bytes[..];
        assert_eq!(
            Value::decode(DataType::String, &mut buf),
            Value::String("Plug".into())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn string_limits() {
        assert!(Value::String("x".repeat(127)).validate().is_ok());
        assert!(matches!(
            Value::String("x".repeat(128)).validate(),
            Err(HexabusError::StringTooLong(128))
        ));
        assert!(matches!(
            Value::String("grüße".into()).validate(),
            Err(HexabusError::NonAsciiString)
        ));
    }

    #[test]
    fn string_with_nul_rejected() {
        assert!(matches!(
            Value::String("ab\0cd".into()).validate(),
            Err(HexabusError::StringContainsNul(2))
        ));
    }

    #[test]
    fn non_ascii_string_payload_decodes_lossily() {
        let mut raw = [0u8; 128];
        raw[..7].copy_from_slice(b"Temp \xB0C");
        let mut buf = &raw[..];
        assert_eq!(
            Value::decode(DataType::String, &mut buf),
            Value::String("Temp \u{FFFD}C".into())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn trailing_whitespace_trimmed_on_decode() {
        let mut raw = [0u8; 128];
        raw[..9].copy_from_slice(b"Lamp  \t\r ");
        let mut buf = &raw[..];
        assert_eq!(
            Value::decode(DataType::String, &mut buf),
            Value::String("Lamp".into())
        );
    }

    #[test]
    fn typed_extraction() {
        assert_eq!(u8::from_value(Value::Uint8(3)), Some(3));
        assert_eq!(u8::from_value(Value::Uint32(3)), None);
        assert_eq!(<Timestamp as HexabusValue>::DATA_TYPE, DataType::Timestamp);
        assert_eq!(<u32 as HexabusValue>::DATA_TYPE, DataType::Uint32);
    }

    #[test]
    fn timestamp_system_time_conversion() {
        let ts = Timestamp(1_400_000_000);
        assert_eq!(Timestamp::from_system_time(ts.to_system_time()), ts);
        assert_eq!(
            Timestamp::from_system_time(UNIX_EPOCH - Duration::from_secs(5)),
            Timestamp(0)
        );
    }
}
