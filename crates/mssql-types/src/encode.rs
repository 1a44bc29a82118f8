//! Encoding a [`SqlValue`] into its TDS wire representation.
//!
//! This is the byte-level counterpart to [`crate::decode`]: each branch here
//! writes exactly what the matching `decode_*` function in that module reads
//! back, using the same [`tds_protocol::TypeId`] vocabulary for the type byte
//! instead of re-deriving it from scratch.

use bytes::{BufMut, BytesMut};
use tds_protocol::TypeId;

use crate::error::TypeError;
use crate::value::SqlValue;

/// A value that can be written in TDS wire format.
pub trait TdsEncode {
    /// Encode this value into `buf`.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), TypeError>;

    /// The TDS type ID this value would be sent as.
    fn type_id(&self) -> TypeId;
}

impl TdsEncode for SqlValue {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), TypeError> {
        match self {
            SqlValue::Null => {}
            SqlValue::Bool(v) => buf.put_u8(u8::from(*v)),
            SqlValue::TinyInt(v) => buf.put_u8(*v),
            SqlValue::SmallInt(v) => buf.put_i16_le(*v),
            SqlValue::Int(v) => buf.put_i32_le(*v),
            SqlValue::BigInt(v) => buf.put_i64_le(*v),
            SqlValue::Float(v) => buf.put_f32_le(*v),
            SqlValue::Double(v) => buf.put_f64_le(*v),
            SqlValue::String(s) | SqlValue::Xml(s) => encode_utf16_string(s, buf),
            SqlValue::Binary(b) => {
                let len = u16::try_from(b.len()).map_err(|_| TypeError::BufferTooSmall {
                    needed: b.len(),
                    available: usize::from(u16::MAX),
                })?;
                buf.put_u16_le(len);
                buf.put_slice(b);
            }
            #[cfg(feature = "decimal")]
            SqlValue::Decimal(d) => encode_decimal(*d, buf),
            #[cfg(feature = "uuid")]
            SqlValue::Uuid(u) => encode_uuid(*u, buf),
            #[cfg(feature = "chrono")]
            SqlValue::Date(d) => encode_date(*d, buf),
            #[cfg(feature = "chrono")]
            SqlValue::Time(t) => encode_time(*t, buf),
            #[cfg(feature = "chrono")]
            SqlValue::DateTime(dt) => encode_datetime2(*dt, buf),
            #[cfg(feature = "chrono")]
            SqlValue::DateTimeOffset(dto) => encode_datetimeoffset(*dto, buf),
            #[cfg(feature = "json")]
            SqlValue::Json(j) => encode_utf16_string(&j.to_string(), buf),
        }
        Ok(())
    }

    fn type_id(&self) -> TypeId {
        match self {
            SqlValue::Null => TypeId::Null,
            SqlValue::Bool(_) => TypeId::Bit,
            SqlValue::TinyInt(_) => TypeId::Int1,
            SqlValue::SmallInt(_) => TypeId::Int2,
            SqlValue::Int(_) => TypeId::Int4,
            SqlValue::BigInt(_) => TypeId::Int8,
            SqlValue::Float(_) => TypeId::Float4,
            SqlValue::Double(_) => TypeId::Float8,
            SqlValue::String(_) => TypeId::NVarChar,
            SqlValue::Binary(_) => TypeId::BigVarBinary,
            #[cfg(feature = "decimal")]
            SqlValue::Decimal(_) => TypeId::DecimalN,
            #[cfg(feature = "uuid")]
            SqlValue::Uuid(_) => TypeId::Guid,
            #[cfg(feature = "chrono")]
            SqlValue::Date(_) => TypeId::Date,
            #[cfg(feature = "chrono")]
            SqlValue::Time(_) => TypeId::Time,
            #[cfg(feature = "chrono")]
            SqlValue::DateTime(_) => TypeId::DateTime2,
            #[cfg(feature = "chrono")]
            SqlValue::DateTimeOffset(_) => TypeId::DateTimeOffset,
            #[cfg(feature = "json")]
            SqlValue::Json(_) => TypeId::NVarChar, // sent as a string
            SqlValue::Xml(_) => TypeId::Xml,
        }
    }
}

/// Encode a string as length-prefixed UTF-16LE (the `NVARCHAR` wire form).
pub fn encode_utf16_string(s: &str, buf: &mut BytesMut) {
    let utf16: Vec<u16> = s.encode_utf16().collect();
    buf.put_u16_le((utf16.len() * 2) as u16);
    utf16.iter().for_each(|unit| buf.put_u16_le(*unit));
}

/// Encode a string as UTF-16LE with no length prefix, for fixed-length fields.
pub fn encode_utf16_string_no_len(s: &str, buf: &mut BytesMut) {
    s.encode_utf16().for_each(|unit| buf.put_u16_le(unit));
}

/// Encode a UUID in SQL Server's mixed-endian `GUID` format: the first three
/// groups are byte-swapped to little-endian, the last two are left as-is.
#[cfg(feature = "uuid")]
pub fn encode_uuid(uuid: uuid::Uuid, buf: &mut BytesMut) {
    let b = uuid.as_bytes();
    buf.put_slice(&[b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6]]);
    buf.put_slice(&b[8..16]);
}

/// Encode a `DECIMAL`/`NUMERIC` value as `[length][sign][mantissa]`, the
/// form [`crate::decode::decode_decimal`] reads back. The mantissa is
/// written in the smallest of the four TDS-legal widths (4/8/12/16 bytes)
/// that holds it, matching the set of lengths real servers send.
#[cfg(feature = "decimal")]
pub fn encode_decimal(decimal: rust_decimal::Decimal, buf: &mut BytesMut) {
    let sign = u8::from(!decimal.is_sign_negative());
    let mantissa = decimal.mantissa().unsigned_abs();
    let mantissa_len = [4u8, 8, 12, 16]
        .into_iter()
        .find(|&len| mantissa < 1u128 << (len * 8 - 1).min(127))
        .unwrap_or(16);

    buf.put_u8(1 + mantissa_len);
    buf.put_u8(sign);
    buf.put_slice(&mantissa.to_le_bytes()[..mantissa_len as usize]);
}

/// Encode a `DATE` as the 3-byte little-endian day count since `0001-01-01`.
#[cfg(feature = "chrono")]
pub fn encode_date(date: chrono::NaiveDate, buf: &mut BytesMut) {
    let base = chrono::NaiveDate::from_ymd_opt(1, 1, 1).expect("0001-01-01 is a valid date");
    let days = date.signed_duration_since(base).num_days() as u32;
    buf.put_slice(&days.to_le_bytes()[..3]);
}

/// Encode a `TIME` as 5 bytes of 100-nanosecond ticks since midnight
/// (scale-7 precision, the widest `TIME` the wire format supports).
#[cfg(feature = "chrono")]
pub fn encode_time(time: chrono::NaiveTime, buf: &mut BytesMut) {
    use chrono::Timelike;

    let nanos = u64::from(time.num_seconds_from_midnight()) * 1_000_000_000 + u64::from(time.nanosecond());
    let ticks = nanos / 100;
    buf.put_slice(&ticks.to_le_bytes()[..5]);
}

/// Encode a `DATETIME2` as `TIME` followed by `DATE`.
#[cfg(feature = "chrono")]
pub fn encode_datetime2(datetime: chrono::NaiveDateTime, buf: &mut BytesMut) {
    encode_time(datetime.time(), buf);
    encode_date(datetime.date(), buf);
}

/// Encode a `DATETIMEOFFSET` as `TIME` + `DATE` + a signed 16-bit UTC offset
/// in minutes.
#[cfg(feature = "chrono")]
pub fn encode_datetimeoffset(datetime: chrono::DateTime<chrono::FixedOffset>, buf: &mut BytesMut) {
    use chrono::Offset;

    encode_time(datetime.time(), buf);
    encode_date(datetime.date_naive(), buf);
    let offset_minutes = (datetime.offset().fix().local_minus_utc() / 60) as i16;
    buf.put_i16_le(offset_minutes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_encodes_as_four_little_endian_bytes() {
        let mut buf = BytesMut::new();
        SqlValue::Int(42).encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[42, 0, 0, 0]);
        assert_eq!(SqlValue::Int(0).type_id(), TypeId::Int4);
    }

    #[test]
    fn bigint_encodes_as_eight_little_endian_bytes() {
        let mut buf = BytesMut::new();
        SqlValue::BigInt(0x0102_0304_0506_0708).encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn string_encodes_with_a_byte_length_prefix_not_a_char_count() {
        let mut buf = BytesMut::new();
        encode_utf16_string("AB", &mut buf);
        assert_eq!(&buf[..], &[4, 0, 0x41, 0, 0x42, 0]);
    }

    #[test]
    fn xml_and_string_share_the_same_wire_encoding() {
        let mut xml_buf = BytesMut::new();
        let mut str_buf = BytesMut::new();
        SqlValue::Xml("<a/>".into()).encode(&mut xml_buf).unwrap();
        SqlValue::String("<a/>".into()).encode(&mut str_buf).unwrap();
        assert_eq!(xml_buf, str_buf);
    }

    #[cfg(feature = "uuid")]
    #[test]
    fn uuid_swaps_the_first_three_groups_to_little_endian() {
        let mut buf = BytesMut::new();
        let uuid = uuid::Uuid::parse_str("12345678-1234-5678-1234-567812345678").unwrap();
        encode_uuid(uuid, &mut buf);
        assert_eq!(
            &buf[..],
            &[0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x12, 0x34, 0x56, 0x78, 0x12, 0x34, 0x56, 0x78]
        );
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn date_encodes_as_three_bytes() {
        let mut buf = BytesMut::new();
        encode_date(chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), &mut buf);
        assert_eq!(buf.len(), 3);
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn decimal_writes_a_length_prefix_decode_can_read_back() {
        use rust_decimal::Decimal;
        let mut buf = BytesMut::new();
        encode_decimal(Decimal::new(12345, 2), &mut buf);

        // length byte + sign byte + mantissa must match what it claims
        let len = buf[0] as usize;
        assert_eq!(buf.len(), 1 + len);
        assert_eq!(buf[1], 1); // positive
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn negative_decimal_writes_a_zero_sign_byte() {
        use rust_decimal::Decimal;
        let mut buf = BytesMut::new();
        encode_decimal(Decimal::new(-500, 1), &mut buf);
        assert_eq!(buf[1], 0);
    }
}
