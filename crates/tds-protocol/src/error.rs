//! Protocol-level decode/encode errors.
//!
//! These errors describe malformed wire data: truncated buffers, out-of-range
//! enum discriminants, and invalid string encodings. They never indicate a
//! server-reported failure (see the `ERROR`/`INFO` tokens for that) — a
//! `ProtocolError` means the bytes themselves could not be parsed as TDS.

/// Errors that can occur while decoding or encoding TDS protocol structures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An unrecognized packet type byte.
    #[error("invalid packet type: 0x{0:02X}")]
    InvalidPacketType(u8),

    /// An unrecognized packet status byte.
    #[error("invalid packet status: 0x{0:02X}")]
    InvalidPacketStatus(u8),

    /// An unrecognized pre-login option type byte.
    #[error("invalid pre-login option: 0x{0:02X}")]
    InvalidPreloginOption(u8),

    /// An unrecognized token type byte.
    #[error("invalid token type: 0x{0:02X}")]
    InvalidTokenType(u8),

    /// A time-family scale outside the valid 0-7 range.
    #[error("invalid scale: {0} (must be 0-7)")]
    InvalidScale(u8),

    /// Buffer held fewer bytes than a fixed-size structure requires.
    #[error("incomplete data: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes required to decode the structure.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Buffer was exhausted while a variable-length field was still being read.
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// A string field contained bytes that could not be decoded under its
    /// declared encoding (invalid UTF-16 surrogate pairs, etc).
    #[cfg(feature = "std")]
    #[error("string encoding error: {0}")]
    StringEncoding(String),

    /// A string field contained bytes that could not be decoded under its
    /// declared encoding (invalid UTF-16 surrogate pairs, etc).
    #[cfg(not(feature = "std"))]
    #[error("string encoding error: {0}")]
    StringEncoding(&'static str),
}

impl ProtocolError {
    /// True for errors caused by a buffer ending before a structure was fully
    /// read — the caller should wait for more bytes rather than treat this as
    /// fatal framing corruption.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompletePacket { .. } | Self::UnexpectedEof)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_incomplete() {
        assert!(ProtocolError::UnexpectedEof.is_incomplete());
        assert!(ProtocolError::IncompletePacket {
            expected: 8,
            actual: 3
        }
        .is_incomplete());
        assert!(!ProtocolError::InvalidPacketType(0xFF).is_incomplete());
    }

    #[test]
    fn test_display() {
        let err = ProtocolError::InvalidPacketType(0x99);
        assert_eq!(format!("{err}"), "invalid packet type: 0x99");
    }
}
