//! # mssql-testing
//!
//! In-process mock TDS server used by exchange-engine integration tests, so
//! the core driver's handshake and request/response cycle can be exercised
//! without a live SQL Server instance.
//!
//! ```rust,ignore
//! use mssql_testing::mock_server::{MockTdsServer, reply_done};
//!
//! #[tokio::test]
//! async fn round_trips_a_query() {
//!     let server = MockTdsServer::builder()
//!         .then_reply(reply_done())
//!         .build()
//!         .await
//!         .unwrap();
//!     // Connect an ExchangeEngine to server.addr() and drive the handshake.
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;

pub use mock_server::{MockServerBuilder, MockServerError, MockTdsServer, ScriptedReply, reply_done, reply_with_tokens};
