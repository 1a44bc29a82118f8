//! Reassembly of packets into logical messages.
//!
//! A logical message is the ordered concatenation of packet payloads that
//! share a `packet_type`, up to and including the packet with
//! `END_OF_MESSAGE` set. Per the data model in the protocol's wire spec,
//! `packet_id` must increase monotonically mod 256 within that run; a gap
//! means a packet was dropped or reordered beneath us, which the assembler
//! treats as a protocol error rather than silently stitching mismatched
//! payloads together.

use bytes::{Bytes, BytesMut};
use tds_protocol::packet::{PacketStatus, PacketType};

use crate::error::CodecError;
use crate::packet_codec::Packet;

/// A fully reassembled logical message.
#[derive(Debug, Clone)]
pub struct LogicalMessage {
    /// Shared packet type of every constituent packet.
    pub packet_type: PacketType,
    /// Concatenated payload bytes across all packets.
    pub payload: Bytes,
}

impl LogicalMessage {
    /// Number of payload bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// `true` when the message carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Accumulates packets belonging to one in-flight logical message.
///
/// One assembler is owned per direction of a connection and lives across
/// messages: [`Assembler::accept`] returns `Ok(Some(..))` exactly when a
/// message completes, and resets its own state for the next one.
#[derive(Debug, Default)]
pub struct Assembler {
    buffer: BytesMut,
    in_progress: Option<InProgress>,
}

#[derive(Debug)]
struct InProgress {
    packet_type: PacketType,
    last_packet_id: u8,
    packet_count: usize,
}

impl Assembler {
    /// New, empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one packet into the assembler.
    ///
    /// Returns the completed message on the packet that carries
    /// `END_OF_MESSAGE`, `Ok(None)` while more packets are expected, and
    /// `Err` if the packet's `packet_id` does not continue the sequence
    /// established by the first packet of this message.
    pub fn accept(&mut self, packet: Packet) -> Result<Option<LogicalMessage>, CodecError> {
        let expected_next = match &self.in_progress {
            None => packet.header.packet_id,
            Some(state) => state.last_packet_id.wrapping_add(1),
        };
        if packet.header.packet_id != expected_next {
            return Err(CodecError::PacketIdGap {
                expected: expected_next,
                actual: packet.header.packet_id,
            });
        }

        let eom = packet.header.status.contains(PacketStatus::END_OF_MESSAGE);
        self.buffer.extend_from_slice(&packet.payload);

        let packet_type = self.in_progress.as_ref().map_or(packet.header.packet_type, |s| s.packet_type);
        let packet_count = self.in_progress.as_ref().map_or(1, |s| s.packet_count + 1);

        tracing::trace!(
            packet_type = ?packet_type,
            packet_count,
            buffered = self.buffer.len(),
            eom,
            "assembling logical message"
        );

        if eom {
            self.in_progress = None;
            Ok(Some(LogicalMessage {
                packet_type,
                payload: self.buffer.split().freeze(),
            }))
        } else {
            self.in_progress = Some(InProgress {
                packet_type,
                last_packet_id: packet.header.packet_id,
                packet_count,
            });
            Ok(None)
        }
    }

    /// Whether a message is partway through assembly.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Discard any partial message, e.g. after observing a connection reset
    /// or giving up mid-cancellation drain.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_progress = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tds_protocol::packet::PacketHeader;

    fn packet(packet_id: u8, eom: bool, payload: &[u8]) -> Packet {
        let mut header = PacketHeader::new(
            PacketType::TabularResult,
            if eom {
                PacketStatus::END_OF_MESSAGE
            } else {
                PacketStatus::NORMAL
            },
            0,
        );
        header.packet_id = packet_id;
        Packet::new(header, BytesMut::from(payload))
    }

    #[test]
    fn single_packet_completes_immediately() {
        let mut asm = Assembler::new();
        let msg = asm.accept(packet(1, true, b"hello")).unwrap().unwrap();
        assert_eq!(&msg.payload[..], b"hello");
        assert!(!asm.has_partial());
    }

    #[test]
    fn multi_packet_concatenates_in_order() {
        let mut asm = Assembler::new();
        assert!(asm.accept(packet(1, false, b"ab")).unwrap().is_none());
        assert!(asm.has_partial());
        let msg = asm.accept(packet(2, true, b"cd")).unwrap().unwrap();
        assert_eq!(&msg.payload[..], b"abcd");
    }

    #[test]
    fn a_gap_in_packet_id_is_rejected() {
        let mut asm = Assembler::new();
        asm.accept(packet(1, false, b"ab")).unwrap();
        let err = asm.accept(packet(3, true, b"cd")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PacketIdGap {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn packet_id_wraps_past_255_back_to_zero() {
        let mut asm = Assembler::new();
        asm.accept(packet(255, false, b"ab")).unwrap();
        let msg = asm.accept(packet(0, true, b"cd")).unwrap().unwrap();
        assert_eq!(&msg.payload[..], b"abcd");
    }

    #[test]
    fn reset_drops_partial_state() {
        let mut asm = Assembler::new();
        asm.accept(packet(1, false, b"partial")).unwrap();
        asm.reset();
        assert!(!asm.has_partial());
    }
}
