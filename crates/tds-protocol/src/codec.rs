//! String and length-prefix primitives shared by the handshake and token
//! decoders.
//!
//! TDS spells out two flavors of length-prefixed UTF-16LE string depending on
//! the surrounding structure: a one-byte character count (`B_VARCHAR`, used
//! throughout LOGIN7 and the error/info tokens) and a two-byte count
//! (`US_VARCHAR`, used for longer server messages). Both are read here as
//! `Result` rather than `Option` so a truncated buffer reports exactly where
//! it ran out instead of being swallowed by the caller.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Read a `B_VARCHAR`: a 1-byte character count followed by UTF-16LE data.
pub fn read_b_varchar(src: &mut impl Buf) -> Result<String, ProtocolError> {
    if src.remaining() < 1 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let char_count = src.get_u8() as usize;
    read_utf16_string(src, char_count)
}

/// Read a `US_VARCHAR`: a 2-byte character count followed by UTF-16LE data.
pub fn read_us_varchar(src: &mut impl Buf) -> Result<String, ProtocolError> {
    if src.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let char_count = src.get_u16_le() as usize;
    read_utf16_string(src, char_count)
}

/// Read `char_count` UTF-16LE code units and decode them as a `String`.
pub fn read_utf16_string(src: &mut impl Buf, char_count: usize) -> Result<String, ProtocolError> {
    let byte_count = char_count * 2;
    if src.remaining() < byte_count {
        return Err(ProtocolError::UnexpectedEof);
    }

    let units: Vec<u16> = (0..char_count).map(|_| src.get_u16_le()).collect();
    String::from_utf16(&units).map_err(|_| string_encoding_error("invalid UTF-16 sequence"))
}

#[cfg(feature = "std")]
fn string_encoding_error(msg: &str) -> ProtocolError {
    ProtocolError::StringEncoding(msg.to_string())
}

#[cfg(not(feature = "std"))]
fn string_encoding_error(msg: &'static str) -> ProtocolError {
    ProtocolError::StringEncoding(msg)
}

/// Write a `B_VARCHAR`, truncating to 255 UTF-16 code units if necessary.
pub fn write_b_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len().min(u8::MAX as usize);
    dst.put_u8(len as u8);
    units[..len].iter().for_each(|&unit| dst.put_u16_le(unit));
}

/// Write a `US_VARCHAR`, truncating to 65535 UTF-16 code units if necessary.
pub fn write_us_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len().min(u16::MAX as usize);
    dst.put_u16_le(len as u16);
    units[..len].iter().for_each(|&unit| dst.put_u16_le(unit));
}

/// Write UTF-16LE code units with no length prefix.
///
/// Used for LOGIN7's variable-length block, which is addressed by a single
/// offset/length table at the front of the packet rather than per-field
/// prefixes.
pub fn write_utf16_string(dst: &mut impl BufMut, s: &str) {
    s.encode_utf16().for_each(|unit| dst.put_u16_le(unit));
}

/// Read a NUL-terminated ASCII string, consuming the terminator.
pub fn read_null_terminated_ascii(src: &mut impl Buf) -> Result<String, ProtocolError> {
    let mut bytes = Vec::new();
    loop {
        if !src.has_remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        match src.get_u8() {
            0 => break,
            b => bytes.push(b),
        }
    }
    String::from_utf8(bytes).map_err(|_| string_encoding_error("invalid ASCII byte"))
}

/// Byte length of `s` once encoded as UTF-16, for sizing LOGIN7's
/// offset/length table ahead of writing the variable-length block.
#[must_use]
pub fn utf16_byte_len(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn b_varchar_roundtrips() {
        let original = "Hello, 世界!";
        let mut buf = BytesMut::new();
        write_b_varchar(&mut buf, original);

        let decoded = read_b_varchar(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn us_varchar_roundtrips() {
        let original = "Test string with Unicode: αβγ";
        let mut buf = BytesMut::new();
        write_us_varchar(&mut buf, original);

        let decoded = read_us_varchar(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn b_varchar_on_empty_buffer_is_unexpected_eof() {
        let mut empty = BytesMut::new().freeze();
        assert!(matches!(read_b_varchar(&mut empty), Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn b_varchar_truncates_beyond_255_units() {
        let long = "x".repeat(300);
        let mut buf = BytesMut::new();
        write_b_varchar(&mut buf, &long);
        let decoded = read_b_varchar(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.len(), 255);
    }

    #[test]
    fn null_terminated_ascii_stops_at_the_terminator() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"sa\0trailing garbage");
        let decoded = read_null_terminated_ascii(&mut buf).unwrap();
        assert_eq!(decoded, "sa");
    }

    #[test]
    fn utf16_byte_len_counts_surrogate_pairs_as_two_units() {
        assert_eq!(utf16_byte_len("Hello"), 10);
        assert_eq!(utf16_byte_len("世界"), 4);
    }
}
