//! Structural tests for the in-process mock TDS server.
//!
//! These don't require a live SQL Server: they check the mock listens,
//! accepts connections, and replays scripted responses through a real
//! `ExchangeEngine`.

use bytes::Bytes;
use mssql_codec::{ConnectionState, ExchangeEngine};
use mssql_testing::mock_server::{MockTdsServer, reply_done};
use tds_protocol::packet::PacketType;
use tds_protocol::{PreLogin, token::TokenType};
use tokio::net::TcpStream;

#[tokio::test]
async fn mock_server_listens_on_an_ephemeral_port() {
    let server = MockTdsServer::builder().build().await.expect("server should start");
    assert!(server.addr().port() > 0);
    assert_eq!(server.connection_count(), 0);
    server.stop();
}

#[tokio::test]
async fn two_mock_servers_get_independent_ports() {
    let a = MockTdsServer::builder().build().await.unwrap();
    let b = MockTdsServer::builder().build().await.unwrap();
    assert_ne!(a.addr().port(), b.addr().port());
    a.stop();
    b.stop();
}

#[tokio::test]
async fn counts_accepted_connections() {
    let server = MockTdsServer::builder().build().await.unwrap();

    let _first = TcpStream::connect(server.addr()).await.unwrap();
    let _second = TcpStream::connect(server.addr()).await.unwrap();

    // Give the accept loop a moment to register both connections.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(server.connection_count(), 2);

    server.stop();
}

#[tokio::test]
async fn scripted_replies_are_served_in_order() {
    let server = MockTdsServer::builder()
        .then_reply(reply_done())
        .then_reply(reply_done())
        .build()
        .await
        .unwrap();

    let stream = TcpStream::connect(server.addr()).await.unwrap();
    let mut engine = ExchangeEngine::new(stream);

    engine
        .write_message(PacketType::PreLogin, PreLogin::new().encode(), 4096, false)
        .await
        .unwrap();
    engine.next_message().await.unwrap();

    engine
        .write_message(PacketType::Tds7Login, Bytes::new(), 4096, false)
        .await
        .unwrap();
    engine.next_message().await.unwrap();

    engine.advance_state(ConnectionState::Login).await;
    engine.advance_state(ConnectionState::PostLogin).await;
    engine.advance_state(ConnectionState::Ready).await;

    for query in [b"SELECT 1".as_slice(), b"SELECT 2".as_slice()] {
        engine
            .begin(PacketType::SqlBatch, Bytes::copy_from_slice(query), 4096, false)
            .await
            .unwrap();
        let reply = engine.next_message().await.unwrap().unwrap();
        assert!(reply.payload.starts_with(&[TokenType::Done as u8]));
    }

    server.stop();
}
