//! Errors produced by packet framing, message assembly, and connection I/O.

use std::io;

/// Errors that can occur while framing TDS packets or driving a connection.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The packet header's length field was smaller than the header itself.
    #[error("invalid packet header")]
    InvalidHeader,

    /// The packet header declared a length exceeding the negotiated maximum.
    #[error("packet too large: {size} bytes exceeds max {max}")]
    PacketTooLarge {
        /// Declared packet size in bytes.
        size: usize,
        /// Negotiated maximum packet size in bytes.
        max: usize,
    },

    /// The underlying transport reached EOF before a full message was read.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// Two packets of the same logical message arrived with a non-contiguous
    /// `packet_id` (mod 256), violating the framing invariant in MS-TDS §3.1.
    #[error("packet_id gap in logical message: expected {expected}, got {actual}")]
    PacketIdGap {
        /// The packet_id that should have followed the previous packet.
        expected: u8,
        /// The packet_id actually observed.
        actual: u8,
    },

    /// A second exchange was started while one was already in flight.
    ///
    /// The exchange engine multiplexes at most one outstanding logical
    /// request/response pair over a connection at a time (§4.7).
    #[error("an exchange is already in flight on this connection")]
    ExchangeInProgress,

    /// An operation that requires a `Ready` connection was attempted while
    /// the connection state machine was in a different state.
    #[error("connection is not ready: currently in {state} state")]
    NotReady {
        /// Human-readable name of the current state.
        state: &'static str,
    },

    /// The packet header or token payload could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(#[from] tds_protocol::error::ProtocolError),

    /// The underlying transport returned an I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CodecError::PacketTooLarge {
            size: 100_000,
            max: 65_535,
        };
        assert_eq!(format!("{err}"), "packet too large: 100000 bytes exceeds max 65535");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: CodecError = io_err.into();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
