//! Wire-level encode/decode of individual TDS packets.
//!
//! A [`Packet`] is one frame on the wire: an 8-byte header plus a payload
//! whose length the header declares. [`TdsCodec`] implements [`Decoder`] and
//! [`Encoder`] so a raw byte stream can be driven through `tokio_util`'s
//! `Framed`/`FramedRead`/`FramedWrite` wrappers. Reassembling packets into a
//! logical message (and validating the `packet_id` sequence across packets)
//! is the job of [`crate::assembly`], one layer up.

use bytes::{Buf, BufMut, BytesMut};
use tds_protocol::packet::{MAX_PACKET_SIZE, PACKET_HEADER_SIZE, PacketHeader};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// One TDS packet: header plus payload.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Decoded packet header.
    pub header: PacketHeader,
    /// Payload bytes, excluding the header.
    pub payload: BytesMut,
}

impl Packet {
    /// Pair a header with its payload.
    #[must_use]
    pub fn new(header: PacketHeader, payload: BytesMut) -> Self {
        Self { header, payload }
    }

    /// Total on-wire size, header included.
    #[must_use]
    pub fn total_size(&self) -> usize {
        PACKET_HEADER_SIZE + self.payload.len()
    }

    /// `true` for the packet that closes a logical message.
    #[must_use]
    pub fn is_end_of_message(&self) -> bool {
        self.header.is_end_of_message()
    }
}

/// Peek the 4-byte (type, status, length) prefix without consuming `src`.
///
/// Returns `None` if fewer than [`PACKET_HEADER_SIZE`] bytes are buffered.
/// The packet length is big-endian per MS-TDS §2.2.3.1, unlike every other
/// multi-byte integer on the wire.
fn peek_declared_length(src: &BytesMut) -> Option<usize> {
    if src.len() < PACKET_HEADER_SIZE {
        return None;
    }
    Some(u16::from_be_bytes([src[2], src[3]]) as usize)
}

/// Stateful codec for one direction of a TDS connection.
///
/// The decode side is a pure function of the buffered bytes; the encode side
/// additionally stamps each outgoing packet with a self-incrementing
/// `packet_id`, since callers build packets with the header's `packet_id`
/// left at its default.
pub struct TdsCodec {
    max_packet_size: usize,
    next_packet_id: u8,
}

impl TdsCodec {
    /// New codec, negotiated packet size defaulted to [`MAX_PACKET_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_packet_size: MAX_PACKET_SIZE,
            next_packet_id: 1,
        }
    }

    /// New codec capped at a size negotiated during LOGIN7 (clamped to
    /// [`MAX_PACKET_SIZE`]).
    #[must_use]
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size.min(MAX_PACKET_SIZE);
        self
    }

    /// `packet_id` never wraps to 0: MS-TDS reserves 0 and encoders must
    /// restart the sequence at 1.
    fn take_packet_id(&mut self) -> u8 {
        let id = self.next_packet_id;
        self.next_packet_id = match self.next_packet_id.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        id
    }

    /// Restart the `packet_id` sequence, used when beginning a new logical
    /// message after RESETCONNECTION.
    pub fn reset_packet_id(&mut self) {
        self.next_packet_id = 1;
    }
}

impl Default for TdsCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TdsCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(declared_len) = peek_declared_length(src) else {
            return Ok(None);
        };

        if declared_len < PACKET_HEADER_SIZE {
            return Err(CodecError::InvalidHeader);
        }
        if declared_len > self.max_packet_size {
            return Err(CodecError::PacketTooLarge {
                size: declared_len,
                max: self.max_packet_size,
            });
        }
        if src.len() < declared_len {
            src.reserve(declared_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(declared_len);
        let header = {
            let mut cursor = frame.as_ref();
            PacketHeader::decode(&mut cursor)?
        };
        let payload = frame.split_off(PACKET_HEADER_SIZE);
        let _ = frame; // header bytes, no longer needed

        tracing::trace!(
            packet_type = ?header.packet_type,
            packet_id = header.packet_id,
            len = declared_len,
            eom = header.is_end_of_message(),
            "decoded packet"
        );

        Ok(Some(Packet::new(header, payload)))
    }
}

impl Encoder<Packet> for TdsCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let total_len = PACKET_HEADER_SIZE + item.payload.len();
        if total_len > self.max_packet_size {
            return Err(CodecError::PacketTooLarge {
                size: total_len,
                max: self.max_packet_size,
            });
        }

        let mut header = item.header;
        header.length = total_len as u16;
        header.packet_id = self.take_packet_id();

        dst.reserve(total_len);
        header.encode(dst);
        dst.put_slice(&item.payload);

        tracing::trace!(
            packet_type = ?header.packet_type,
            packet_id = header.packet_id,
            len = total_len,
            "encoded packet"
        );

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tds_protocol::packet::{PacketStatus, PacketType};

    fn header_bytes(kind: PacketType, status: PacketStatus, len: u16) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(kind as u8);
        buf.put_u8(status.bits());
        buf.put_u16(len);
        buf.put_u16(0); // spid
        buf.put_u8(1); // packet_id
        buf.put_u8(0); // window
        buf
    }

    #[test]
    fn decodes_a_complete_packet() {
        let mut codec = TdsCodec::new();
        let mut buf = header_bytes(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 12);
        buf.put_slice(b"ping");

        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.header.packet_type, PacketType::SqlBatch);
        assert!(packet.is_end_of_message());
        assert_eq!(&packet.payload[..], b"ping");
        assert!(buf.is_empty());
    }

    #[test]
    fn withholds_until_payload_is_buffered() {
        let mut codec = TdsCodec::new();
        let mut buf = header_bytes(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 12);
        // 4 payload bytes declared, none supplied yet.
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn rejects_a_header_shorter_than_itself() {
        let mut codec = TdsCodec::new();
        let mut buf = header_bytes(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 3);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::InvalidHeader)
        ));
    }

    #[test]
    fn encoder_assigns_sequential_packet_ids() {
        let mut codec = TdsCodec::new();
        let header = PacketHeader::new(PacketType::SqlBatch, PacketStatus::NORMAL, 0);

        let mut first = BytesMut::new();
        codec
            .encode(Packet::new(header, BytesMut::from(&b"a"[..])), &mut first)
            .unwrap();
        let mut second = BytesMut::new();
        codec
            .encode(Packet::new(header, BytesMut::from(&b"b"[..])), &mut second)
            .unwrap();

        assert_eq!(first[4], 1);
        assert_eq!(second[4], 2);
    }

    #[test]
    fn packet_id_skips_the_reserved_zero_on_wraparound() {
        let mut codec = TdsCodec::new();
        codec.next_packet_id = 255;
        assert_eq!(codec.take_packet_id(), 255);
        assert_eq!(codec.take_packet_id(), 1);
    }
}
