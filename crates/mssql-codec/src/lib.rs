//! # mssql-codec
//!
//! Async framing, message reassembly, and the connection-lifecycle/exchange
//! layer for the TDS wire protocol.
//!
//! ```text
//! TCP stream -> TdsCodec (packet framing) -> Assembler (logical message)
//!            -> ExchangeEngine (state machine + at-most-one-in-flight)
//! ```
//!
//! The read and write halves of the transport are always split
//! ([`exchange::ExchangeEngine`]), so an ATTENTION packet can be sent to
//! cancel an in-flight exchange even while the read side is parked waiting
//! on the server.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod assembly;
pub mod error;
pub mod exchange;
pub mod framed;
pub mod packet_codec;
pub mod state;

pub use assembly::{Assembler, LogicalMessage};
pub use error::CodecError;
pub use exchange::{CancelHandle, ExchangeEngine};
pub use framed::{PacketReader, PacketWriter};
pub use packet_codec::{Packet, TdsCodec};
pub use state::{ConnectionState, StateMachine};
