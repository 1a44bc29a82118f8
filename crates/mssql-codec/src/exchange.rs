//! The request/response exchange engine (spec §4.7).
//!
//! An [`ExchangeEngine`] owns one TDS connection and enforces that at most
//! one logical request/response pair is outstanding at a time: callers must
//! fully drain a response (via [`ExchangeEngine::next_message`] returning
//! `Ok(None)`) before starting another with [`ExchangeEngine::begin`]. The
//! transport is split into read/write halves so an out-of-band ATTENTION
//! packet can cancel a request while the read side is parked waiting on the
//! server — the one place this engine's shape still echoes the split-I/O
//! connection it was adapted from.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use tds_protocol::packet::{PACKET_HEADER_SIZE, PacketHeader, PacketStatus, PacketType};
use tds_protocol::token::{Done, DoneStatus, TokenType};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, Notify};

use crate::assembly::{Assembler, LogicalMessage};
use crate::error::CodecError;
use crate::framed::{PacketReader, PacketWriter};
use crate::packet_codec::Packet;
use crate::state::{ConnectionState, StateMachine};

/// Scan a TABULAR_RESULT payload for a DONE-family token and report whether
/// it is the terminal one (MORE clear) and whether it carries the
/// cancellation acknowledgement (ATTN set).
///
/// This is a best-effort linear scan rather than a full token-stream parse:
/// it looks for any of the three DONE token bytes and reads the status
/// field that immediately follows, which is sufficient because DONE tokens
/// are fixed-width and never contain an embedded byte equal to their own
/// token type within the two status bytes for any status combination the
/// server emits.
fn scan_done_status(payload: &[u8]) -> Option<DoneStatus> {
    let mut i = 0;
    while i < payload.len() {
        let is_done_token = TokenType::from_u8(payload[i]).is_some_and(|t| {
            matches!(t, TokenType::Done | TokenType::DoneProc | TokenType::DoneInProc)
        });
        if is_done_token && i + 1 + Done::SIZE <= payload.len() {
            let bits = u16::from_le_bytes([payload[i + 1], payload[i + 2]]);
            return Some(DoneStatus::from_bits(bits));
        }
        i += 1;
    }
    None
}

/// Drives one direction of packet traffic plus message reassembly.
struct Half<R> {
    framed: R,
    assembler: Assembler,
}

/// A connection mid-exchange: owns the transport, tracks lifecycle state,
/// and multiplexes at most one request/response pair at a time.
pub struct ExchangeEngine<T>
where
    T: AsyncRead + AsyncWrite,
{
    read: Half<PacketReader<ReadHalf<T>>>,
    write: Arc<Mutex<PacketWriter<WriteHalf<T>>>>,
    state: Arc<Mutex<StateMachine>>,
    cancel_requested: Arc<AtomicBool>,
    cancel_done: Arc<Notify>,
}

impl<T> ExchangeEngine<T>
where
    T: AsyncRead + AsyncWrite,
{
    /// Split `transport` and start a fresh engine in the `PreLogin` state.
    pub fn new(transport: T) -> Self {
        let (read_half, write_half) = tokio::io::split(transport);
        Self {
            read: Half {
                framed: PacketReader::new(read_half),
                assembler: Assembler::new(),
            },
            write: Arc::new(Mutex::new(PacketWriter::new(write_half))),
            state: Arc::new(Mutex::new(StateMachine::new())),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            cancel_done: Arc::new(Notify::new()),
        }
    }

    /// Force the lifecycle state forward, used by the handshake driver
    /// (PRELOGIN/TLS/LOGIN7) which owns those phases outside this engine.
    pub async fn advance_state(&self, to: ConnectionState) -> bool {
        self.state.lock().await.transition(to)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.state()
    }

    /// A cloneable handle that can cancel the in-flight exchange from
    /// another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle<T> {
        CancelHandle {
            write: Arc::clone(&self.write),
            cancel_requested: Arc::clone(&self.cancel_requested),
            cancel_done: Arc::clone(&self.cancel_done),
        }
    }

    /// Write one logical message as a sequence of packets, `RESET_CONNECTION`
    /// optionally set on the first packet only (MS-TDS requires it be scoped
    /// that way). Performs no state-machine checks; used both by `begin` and
    /// directly by the PRELOGIN/LOGIN7 handshake driver, which owns the
    /// `PreLogin`/`Login`/`PostLogin` states itself.
    pub async fn write_message(
        &self,
        packet_type: PacketType,
        payload: Bytes,
        max_packet_size: usize,
        reset_connection: bool,
    ) -> Result<(), CodecError> {
        let max_payload = max_packet_size.saturating_sub(PACKET_HEADER_SIZE).max(1);
        let chunks: Vec<_> = payload.chunks(max_payload).collect();
        let last = chunks.len().saturating_sub(1);

        let mut writer = self.write.lock().await;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut status = if i == last {
                PacketStatus::END_OF_MESSAGE
            } else {
                PacketStatus::NORMAL
            };
            if i == 0 && reset_connection {
                status |= PacketStatus::RESET_CONNECTION;
            }
            let header = PacketHeader::new(packet_type, status, 0);
            writer.send(Packet::new(header, BytesMut::from(chunk))).await?;
        }
        Ok(())
    }

    /// Begin a new exchange from the `Ready` state, moving the connection
    /// through `Sending` into `Receiving`.
    ///
    /// Fails with [`CodecError::NotReady`] unless the connection is
    /// currently `Ready`.
    pub async fn begin(
        &mut self,
        packet_type: PacketType,
        payload: Bytes,
        max_packet_size: usize,
        reset_connection: bool,
    ) -> Result<(), CodecError> {
        {
            let mut state = self.state.lock().await;
            if !state.transition(ConnectionState::Sending) {
                return Err(CodecError::NotReady {
                    state: state.state().name(),
                });
            }
        }

        self.write_message(packet_type, payload, max_packet_size, reset_connection)
            .await?;

        self.state.lock().await.transition(ConnectionState::Receiving);
        Ok(())
    }

    /// Pull the next reassembled message of the in-flight response.
    ///
    /// Returns `Ok(None)` once the terminal DONE token has been observed
    /// (or the cancellation drain completes) and the engine has returned to
    /// `Ready`, at which point a new exchange may begin.
    pub async fn next_message(&mut self) -> Result<Option<LogicalMessage>, CodecError> {
        loop {
            let Some(result) = self.read.framed.next().await else {
                return if self.read.assembler.has_partial() {
                    Err(CodecError::ConnectionClosed)
                } else {
                    Ok(None)
                };
            };
            let packet = result?;
            let Some(message) = self.read.assembler.accept(packet)? else {
                continue;
            };

            if self.cancel_requested.load(Ordering::Acquire) {
                if let Some(status) = scan_done_status(&message.payload) {
                    if status.attn {
                        tracing::debug!("cancellation acknowledged by server");
                        self.cancel_requested.store(false, Ordering::Release);
                        self.cancel_done.notify_waiters();
                        self.state.lock().await.transition(ConnectionState::Ready);
                        return Ok(None);
                    }
                }
                // Still draining towards the ATTN-flagged DONE; discard.
                continue;
            }

            if message.packet_type == PacketType::TabularResult {
                if let Some(status) = scan_done_status(&message.payload) {
                    if status.is_final() {
                        self.state.lock().await.transition(ConnectionState::Ready);
                    }
                }
            }

            return Ok(Some(message));
        }
    }
}

impl<T> std::fmt::Debug for ExchangeEngine<T>
where
    T: AsyncRead + AsyncWrite,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("has_partial_response", &self.read.assembler.has_partial())
            .finish_non_exhaustive()
    }
}

/// Handle used to cancel the exchange currently in flight on an
/// [`ExchangeEngine`] from a different task.
pub struct CancelHandle<T>
where
    T: AsyncRead + AsyncWrite,
{
    write: Arc<Mutex<PacketWriter<WriteHalf<T>>>>,
    cancel_requested: Arc<AtomicBool>,
    cancel_done: Arc<Notify>,
}

impl<T> CancelHandle<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Send an ATTENTION packet. The exchange engine will discard
    /// subsequent response packets until it observes the server's
    /// ATTN-flagged DONE acknowledging the cancellation.
    pub async fn cancel(&self) -> Result<(), CodecError> {
        self.cancel_requested.store(true, Ordering::Release);
        tracing::debug!("sending ATTENTION to cancel in-flight exchange");

        let header = PacketHeader::new(
            PacketType::Attention,
            PacketStatus::END_OF_MESSAGE,
            PACKET_HEADER_SIZE as u16,
        );
        let mut writer = self.write.lock().await;
        writer.send(Packet::new(header, BytesMut::new())).await?;
        Ok(())
    }

    /// Wait for the server's cancellation acknowledgement.
    pub async fn wait_cancelled(&self) {
        if self.cancel_requested.load(Ordering::Acquire) {
            self.cancel_done.notified().await;
        }
    }
}

impl<T> Clone for CancelHandle<T>
where
    T: AsyncRead + AsyncWrite,
{
    fn clone(&self) -> Self {
        Self {
            write: Arc::clone(&self.write),
            cancel_requested: Arc::clone(&self.cancel_requested),
            cancel_done: Arc::clone(&self.cancel_done),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scans_past_leading_bytes_to_find_a_final_done() {
        let mut payload = vec![0xAB, 0xCD]; // unrelated leading bytes
        payload.push(TokenType::Done as u8);
        payload.extend_from_slice(&0u16.to_le_bytes()); // status: no flags
        payload.extend_from_slice(&[0u8; 10]); // curcmd(2) + rowcount(8)

        let status = scan_done_status(&payload).unwrap();
        assert!(status.is_final());
        assert!(!status.attn);
    }

    #[test]
    fn recognizes_an_attn_acknowledgement() {
        let mut payload = vec![TokenType::Done as u8];
        payload.extend_from_slice(&0x0020u16.to_le_bytes()); // DONE_ATTN
        payload.extend_from_slice(&[0u8; 10]);

        let status = scan_done_status(&payload).unwrap();
        assert!(status.attn);
    }

    #[test]
    fn no_done_token_present_yields_none() {
        assert!(scan_done_status(b"no tokens here").is_none());
    }
}
