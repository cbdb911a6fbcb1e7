//! Lazy hex rendering of raw datagrams for trace logs.

use std::fmt;

/// Formats bytes as space-separated uppercase hex pairs, only when displayed.
///
/// ```
/// use hexabus::utils::hexdump::HexDump;
/// assert_eq!(HexDump(&[0x48, 0x58, 0x0a]).to_string(), "48 58 0A");
/// ```
#[derive(Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{self}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_debug() {
        assert_eq!(HexDump(&[]).to_string(), "");
        assert_eq!(format!("{:?}", HexDump(&[1, 255])), "[01 FF]");
    }
}
