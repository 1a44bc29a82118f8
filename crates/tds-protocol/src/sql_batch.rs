//! SQL batch request encoding (packet type `SQL_BATCH`, MS-TDS 2.2.6.7).
//!
//! The payload is an `ALL_HEADERS` section (required since TDS 7.2) followed
//! by the SQL text as UTF-16LE. `ALL_HEADERS` carries the transaction
//! descriptor the server handed back in a prior `BeginTransaction` ENVCHANGE
//! token, or 0 to run in auto-commit mode.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::write_utf16_string;
use crate::prelude::*;

/// Write the `ALL_HEADERS` transaction-descriptor header (MS-TDS 2.2.5.3.1)
/// into `buf`: a 4-byte total length, then `HeaderLength(4) +
/// HeaderType(2)=0x0002 + TransactionDescriptor(8) + OutstandingRequestCount(4)`.
///
/// This single-header form is all a non-MARS connection ever needs to send.
pub fn write_transaction_descriptor_headers(buf: &mut BytesMut, transaction_descriptor: u64) {
    let start = buf.len();
    buf.put_u32_le(0); // total length, patched below

    buf.put_u32_le(18); // this header's own length
    buf.put_u16_le(0x0002); // header type: transaction descriptor
    buf.put_u64_le(transaction_descriptor);
    buf.put_u32_le(1); // outstanding request count, 1 outside MARS

    let total_len = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&total_len.to_le_bytes());
}

/// Encode a SQL batch request in auto-commit mode (no explicit transaction).
///
/// # Example
///
/// ```
/// use tds_protocol::sql_batch::encode_sql_batch;
///
/// let payload = encode_sql_batch("SELECT * FROM users WHERE id = 1");
/// assert!(!payload.is_empty());
/// ```
#[must_use]
pub fn encode_sql_batch(sql: &str) -> Bytes {
    encode_sql_batch_with_transaction(sql, 0)
}

/// Encode a SQL batch request to run under an explicit transaction.
///
/// `transaction_descriptor` must be the value the server returned in a
/// `BeginTransaction` ENVCHANGE token; pass 0 for auto-commit.
#[must_use]
pub fn encode_sql_batch_with_transaction(sql: &str, transaction_descriptor: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(22 + sql.len() * 2);
    write_transaction_descriptor_headers(&mut buf, transaction_descriptor);
    write_utf16_string(&mut buf, sql);
    buf.freeze()
}

/// SQL batch builder, for callers that want to hold a descriptor alongside
/// the text rather than thread it through a free function.
#[derive(Debug, Clone)]
pub struct SqlBatch {
    sql: String,
    transaction_descriptor: u64,
}

impl SqlBatch {
    /// Create a new auto-commit SQL batch.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), transaction_descriptor: 0 }
    }

    /// Run this batch under the given transaction descriptor.
    #[must_use]
    pub fn with_transaction_descriptor(mut self, transaction_descriptor: u64) -> Self {
        self.transaction_descriptor = transaction_descriptor;
        self
    }

    /// Get the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Encode the SQL batch to bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        encode_sql_batch_with_transaction(&self.sql, self.transaction_descriptor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn all_headers_section_precedes_the_utf16_sql_text() {
        let payload = encode_sql_batch("SELECT 1");

        // ALL_HEADERS (22 bytes) + "SELECT 1" UTF-16LE (16 bytes) = 38 bytes
        assert_eq!(payload.len(), 38);
        assert_eq!(&payload[0..4], &[22, 0, 0, 0]); // TotalLength
        assert_eq!(&payload[4..8], &[18, 0, 0, 0]); // HeaderLength
        assert_eq!(&payload[8..10], &[0x02, 0x00]); // header type: transaction descriptor

        assert_eq!(payload[22], b'S');
        assert_eq!(payload[23], 0);
        assert_eq!(payload[24], b'E');
        assert_eq!(payload[25], 0);
    }

    #[test]
    fn transaction_descriptor_is_carried_into_the_header() {
        let payload = encode_sql_batch_with_transaction("SELECT 1", 0x1234_5678_9ABC_DEF0);
        assert_eq!(&payload[10..18], &0x1234_5678_9ABC_DEF0_u64.to_le_bytes());
    }

    #[test]
    fn builder_defaults_to_auto_commit() {
        let batch = SqlBatch::new("SELECT @@VERSION");
        assert_eq!(batch.sql(), "SELECT @@VERSION");
        assert_eq!(batch.encode(), encode_sql_batch("SELECT @@VERSION"));
    }

    #[test]
    fn builder_with_transaction_descriptor_matches_the_free_function() {
        let batch = SqlBatch::new("SELECT 1").with_transaction_descriptor(42);
        assert_eq!(batch.encode(), encode_sql_batch_with_transaction("SELECT 1", 42));
    }

    #[test]
    fn empty_sql_still_carries_all_headers() {
        let payload = encode_sql_batch("");
        assert_eq!(payload.len(), 22);
    }
}
