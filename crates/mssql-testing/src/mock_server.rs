//! In-process mock TDS server for exchange-engine integration tests.
//!
//! Spins up a loopback TCP listener, performs just enough of the PRELOGIN ->
//! LOGIN7 handshake to reach `Ready`, then replays a scripted sequence of
//! raw TABULAR_RESULT payloads in response to each client request. This
//! exists so the exchange engine's framing, reassembly, and state-machine
//! transitions can be exercised end-to-end without a live SQL Server
//! instance (see `SqlServerContainer`-less test tooling in the ambient
//! stack notes).
//!
//! The server speaks no encryption: it always answers PRELOGIN with
//! `EncryptionLevel::NotSupported`, so tests must connect without TLS.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use tds_protocol::token::{Done, DoneStatus, TokenType};
use tds_protocol::{EncryptionLevel, PreLogin};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Errors produced while starting or driving the mock server.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// Failed to bind the loopback listener.
    #[error("failed to bind mock server: {0}")]
    Bind(#[source] std::io::Error),
}

/// One scripted reply: raw bytes for the TABULAR_RESULT payload sent back
/// in response to the next client request, in order.
///
/// Callers build these with [`reply_done`] or [`reply_with_tokens`] rather
/// than constructing payloads by hand.
pub type ScriptedReply = Bytes;

/// A terminal DONE token with no rows affected and no further results.
#[must_use]
pub fn reply_done() -> ScriptedReply {
    encode_done(DoneStatus::default())
}

/// Prepend arbitrary pre-encoded tokens (e.g. COLMETADATA + ROW bytes built
/// with `tds_protocol::token` encoders) ahead of a terminal DONE.
#[must_use]
pub fn reply_with_tokens(mut tokens: BytesMut) -> ScriptedReply {
    tokens.extend_from_slice(&encode_done(DoneStatus::default()));
    tokens.freeze()
}

fn encode_done(status: DoneStatus) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(TokenType::Done as u8);
    buf.put_u16_le(status.to_bits());
    buf.put_u16_le(0); // cur_cmd
    buf.put_u64_le(0); // row_count
    debug_assert_eq!(buf.len(), 1 + Done::SIZE);
    buf.freeze()
}

/// A minimal LOGINACK token acknowledging TDS 7.4 with a fixed program
/// name, sufficient for clients that only check the ack arrived.
fn encode_login_ack() -> Bytes {
    let prog_name = "mock-tds";
    let utf16: Vec<u16> = prog_name.encode_utf16().collect();
    let mut body = BytesMut::new();
    body.put_u8(1); // interface: SQL
    body.put_u32_le(0x7400_0004); // TDS 7.4
    body.put_u8(utf16.len() as u8);
    for unit in utf16 {
        body.put_u16_le(unit);
    }
    body.put_u32_le(1); // prog_version

    let mut buf = BytesMut::new();
    buf.put_u8(TokenType::LoginAck as u8);
    buf.put_u16_le(body.len() as u16);
    buf.extend_from_slice(&body);
    buf.freeze()
}

/// Builder for [`MockTdsServer`].
#[derive(Default)]
pub struct MockServerBuilder {
    script: Vec<ScriptedReply>,
}

impl MockServerBuilder {
    /// Queue a reply to send for the Nth client request after login,
    /// in the order added.
    #[must_use]
    pub fn then_reply(mut self, reply: ScriptedReply) -> Self {
        self.script.push(reply);
        self
    }

    /// Start listening on an ephemeral loopback port.
    pub async fn build(self) -> Result<MockTdsServer, MockServerError> {
        MockTdsServer::start(self.script).await
    }
}

/// A running mock TDS server. Dropping the handle stops accepting new
/// connections but does not kill already-spawned connection handlers.
pub struct MockTdsServer {
    addr: SocketAddr,
    connection_count: Arc<AtomicUsize>,
    shutdown: mpsc::Sender<()>,
}

impl MockTdsServer {
    /// Start a builder.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    async fn start(script: Vec<ScriptedReply>) -> Result<Self, MockServerError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(MockServerError::Bind)?;
        let addr = listener.local_addr().map_err(MockServerError::Bind)?;
        let connection_count = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let script = Arc::new(script);
        let counted = Arc::clone(&connection_count);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { return };
                        counted.fetch_add(1, Ordering::SeqCst);
                        let script = Arc::clone(&script);
                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(stream, &script).await {
                                tracing::debug!(%err, "mock connection ended");
                            }
                        });
                    }
                }
            }
        });

        Ok(Self {
            addr,
            connection_count,
            shutdown: shutdown_tx,
        })
    }

    /// The loopback address clients should connect to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    /// Stop accepting new connections.
    pub fn stop(&self) {
        let _ = self.shutdown.try_send(());
    }
}

/// Reads one length-prefixed packet's raw payload bytes off `stream`,
/// regardless of packet type, by speaking the same 8-byte header that
/// `tds_protocol::packet` defines for the client side.
async fn read_one_message(stream: &mut TcpStream) -> std::io::Result<Bytes> {
    use tds_protocol::packet::{PACKET_HEADER_SIZE, PacketStatus};
    use tokio::io::AsyncReadExt;

    let mut payload = BytesMut::new();
    loop {
        let mut header = [0u8; PACKET_HEADER_SIZE];
        stream.read_exact(&mut header).await?;
        let len = u16::from_be_bytes([header[2], header[3]]) as usize;
        let mut body = vec![0u8; len - PACKET_HEADER_SIZE];
        stream.read_exact(&mut body).await?;
        payload.extend_from_slice(&body);
        if header[1] & PacketStatus::END_OF_MESSAGE.bits() != 0 {
            return Ok(payload.freeze());
        }
    }
}

async fn write_message(
    stream: &mut TcpStream,
    packet_type: tds_protocol::PacketType,
    payload: &[u8],
) -> std::io::Result<()> {
    use tds_protocol::packet::{PACKET_HEADER_SIZE, PacketHeader, PacketStatus};
    use tokio::io::AsyncWriteExt;

    let mut header = PacketHeader::new(packet_type, PacketStatus::END_OF_MESSAGE, 0);
    header.length = (PACKET_HEADER_SIZE + payload.len()) as u16;
    header.packet_id = 1;
    let mut frame = BytesMut::with_capacity(header.length as usize);
    header.encode(&mut frame);
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await
}

async fn serve_connection(mut stream: TcpStream, script: &[ScriptedReply]) -> std::io::Result<()> {
    // PRELOGIN
    let _client_prelogin = read_one_message(&mut stream).await?;
    let server_prelogin = PreLogin::new().with_encryption(EncryptionLevel::NotSupported).encode();
    write_message(&mut stream, tds_protocol::PacketType::PreLogin, &server_prelogin).await?;

    // LOGIN7
    let _login7 = read_one_message(&mut stream).await?;
    let mut login_response = BytesMut::new();
    login_response.extend_from_slice(&encode_login_ack());
    login_response.extend_from_slice(&encode_done(DoneStatus::default()));
    write_message(
        &mut stream,
        tds_protocol::PacketType::TabularResult,
        &login_response,
    )
    .await?;

    // One scripted reply per subsequent client request; default to a bare DONE.
    let mut scripted = script.iter();
    loop {
        let Ok(_request) = read_one_message(&mut stream).await else {
            return Ok(());
        };
        let reply = scripted.next().cloned().unwrap_or_else(reply_done);
        write_message(&mut stream, tds_protocol::PacketType::TabularResult, &reply).await?;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mssql_codec::{CodecError, ExchangeEngine, LogicalMessage};
    use tds_protocol::packet::PacketType;

    async fn next(engine: &mut ExchangeEngine<TcpStream>) -> LogicalMessage {
        engine.next_message().await.unwrap().expect("server should have replied")
    }

    #[tokio::test]
    async fn handshake_then_scripted_query_round_trip() {
        let server = MockTdsServer::builder()
            .then_reply(reply_done())
            .build()
            .await
            .unwrap();

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut engine = ExchangeEngine::new(stream);

        // Drive the handshake as a bare client would: send PRELOGIN, read the
        // reply, send LOGIN7, read the LOGINACK + DONE tabular result, then
        // hand state ownership to `Ready` the way a real handshake driver
        // would once PostLogin token draining completes.
        engine
            .write_message(PacketType::PreLogin, PreLogin::new().encode(), 4096, false)
            .await
            .unwrap();
        let prelogin_ack = next(&mut engine).await;
        assert!(!prelogin_ack.is_empty());

        engine
            .write_message(PacketType::Tds7Login, Bytes::new(), 4096, false)
            .await
            .unwrap();
        let login_ack = next(&mut engine).await;
        assert!(login_ack.payload.windows(1).any(|w| w[0] == TokenType::LoginAck as u8));

        engine.advance_state(mssql_codec::ConnectionState::SslNegotiation).await;
        engine.advance_state(mssql_codec::ConnectionState::Login).await;
        engine.advance_state(mssql_codec::ConnectionState::PostLogin).await;
        assert!(engine.advance_state(mssql_codec::ConnectionState::Ready).await);

        engine
            .begin(PacketType::SqlBatch, Bytes::from_static(b"SELECT 1"), 4096, false)
            .await
            .unwrap();
        let reply = next(&mut engine).await;
        assert!(reply.payload.starts_with(&[TokenType::Done as u8]));
        assert_eq!(engine.state().await, mssql_codec::ConnectionState::Ready);

        assert_eq!(server.connection_count(), 1);
        server.stop();
    }

    #[tokio::test]
    async fn a_second_exchange_is_rejected_while_one_is_in_flight() {
        let server = MockTdsServer::builder().build().await.unwrap();
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut engine = ExchangeEngine::new(stream);

        engine.advance_state(mssql_codec::ConnectionState::Login).await;
        engine.advance_state(mssql_codec::ConnectionState::PostLogin).await;
        engine.advance_state(mssql_codec::ConnectionState::Ready).await;

        engine
            .begin(PacketType::SqlBatch, Bytes::from_static(b"SELECT 1"), 4096, false)
            .await
            .unwrap();

        // Connection is now `Receiving`; a second exchange cannot begin
        // until the first one's response has been fully drained.
        let err = engine
            .begin(PacketType::SqlBatch, Bytes::from_static(b"SELECT 2"), 4096, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::NotReady { .. }));

        server.stop();
    }
}
