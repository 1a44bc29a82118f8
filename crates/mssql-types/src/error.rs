//! Errors surfaced while converting between [`crate::value::SqlValue`] and
//! Rust types, or while encoding/decoding a value's TDS wire form.

use thiserror::Error;

/// Something went wrong converting a SQL value.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("unexpected null value")]
    UnexpectedNull,

    /// The decoded [`SqlValue`](crate::value::SqlValue) variant doesn't match
    /// what the caller asked `FromSql::from_sql` to produce.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("value out of range for {target_type}")]
    OutOfRange { target_type: &'static str },

    #[error("invalid string encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid binary data: {0}")]
    InvalidBinary(String),

    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("value truncated: {0}")]
    Truncation(String),

    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: &'static str },

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl TypeError {
    /// Whether this error stems from an unexpected NULL, as opposed to a
    /// mismatched or malformed non-null value. Callers retrying a column as
    /// `Option<T>` after an initial non-optional read only need to do so for
    /// this case — any other variant will fail again regardless.
    #[must_use]
    pub fn is_unexpected_null(&self) -> bool {
        matches!(self, Self::UnexpectedNull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_unexpected_null_only_matches_that_variant() {
        assert!(TypeError::UnexpectedNull.is_unexpected_null());
        assert!(!TypeError::OutOfRange { target_type: "INT" }.is_unexpected_null());
    }

    #[test]
    fn type_mismatch_formats_both_sides() {
        let err = TypeError::TypeMismatch { expected: "i32", actual: "NVARCHAR".to_string() };
        assert_eq!(err.to_string(), "type mismatch: expected i32, got NVARCHAR");
    }
}
