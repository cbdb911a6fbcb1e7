//! Hexabus packet checksum.
//!
//! A byte-wise 16-bit mixing function applied to every byte from the header up to
//! the checksum field. It is equivalent to the reflected CCITT CRC used by the
//! device firmware; the shift/xor form below is what the devices implement.

/// Compute the checksum over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |crc, &b| update(crc, b))
}

/// Feed one byte into the accumulator.
#[inline]
pub fn update(mut crc: u16, byte: u8) -> u16 {
    crc ^= u16::from(byte);
    crc = crc.rotate_left(8);
    crc ^= (crc & 0xFF00) << 4;
    crc ^= crc >> 12;
    crc ^= (crc & 0xFF00) >> 5;
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn device_captured_info_packet() {
        // INFO eid=2 UINT32 0, as captured from a plug
        let bytes = [72, 88, 48, 66, 1, 0, 2, 3, 0, 0, 0, 0];
        assert_eq!(crc16(&bytes), 0xCA3D);
    }

    #[test]
    fn matches_kermit_check_value() {
        assert_eq!(crc16(b"123456789"), 0x2189);
    }

    #[test]
    fn incremental_update_equals_one_shot() {
        let data = b"HX0B\x02\x00\x07";
        let mut crc = 0;
        for &b in data.iter() {
            crc = update(crc, b);
        }
        assert_eq!(crc, crc16(data));
        assert_eq!(crc, 0x42C4);
    }
}
