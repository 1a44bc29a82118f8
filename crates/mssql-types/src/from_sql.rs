//! Converting a decoded [`SqlValue`] into a concrete Rust type.
//!
//! [`FromSql::from_sql`] is the `target_kind` half of the column-codec
//! resolution described for the codec registry: the wire bytes are already
//! decoded into a [`SqlValue`] by the time this trait runs, so each impl
//! only has to say which `SqlValue` variants it accepts for its target type.

use crate::error::TypeError;
use crate::value::SqlValue;

/// Converts a decoded SQL value into `Self`, the caller's chosen target type.
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from a SQL value, mapping NULL to `None` instead of erroring.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() { Ok(None) } else { Self::from_sql(value).map(Some) }
    }
}

fn type_mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    TypeError::TypeMismatch { expected, actual: value.type_name().to_string() }
}

/// Implement [`FromSql`] for `$ty`, matching `$pattern` arms against the
/// value and falling through to `UnexpectedNull`/`TypeMismatch` for
/// anything the caller's match doesn't cover.
macro_rules! from_sql_impl {
    ($ty:ty, $name:literal, $value:ident => $($pattern:pat $(if $guard:expr)? => $result:expr),+ $(,)?) => {
        impl FromSql for $ty {
            fn from_sql($value: &SqlValue) -> Result<Self, TypeError> {
                match $value {
                    $($pattern $(if $guard)? => $result,)+
                    SqlValue::Null => Err(TypeError::UnexpectedNull),
                    _ => Err(type_mismatch($name, $value)),
                }
            }
        }
    };
}

from_sql_impl!(bool, "bool", v =>
    SqlValue::Bool(b) => Ok(*b),
    SqlValue::TinyInt(n) => Ok(*n != 0),
    SqlValue::SmallInt(n) => Ok(*n != 0),
    SqlValue::Int(n) => Ok(*n != 0),
);
from_sql_impl!(u8, "u8", v => SqlValue::TinyInt(n) => Ok(*n));
from_sql_impl!(i16, "i16", v =>
    SqlValue::SmallInt(n) => Ok(*n),
    SqlValue::TinyInt(n) => Ok(*n as i16),
);
from_sql_impl!(i32, "i32", v =>
    SqlValue::Int(n) => Ok(*n),
    SqlValue::SmallInt(n) => Ok(*n as i32),
    SqlValue::TinyInt(n) => Ok(*n as i32),
);
from_sql_impl!(i64, "i64", v =>
    SqlValue::BigInt(n) => Ok(*n),
    SqlValue::Int(n) => Ok(*n as i64),
    SqlValue::SmallInt(n) => Ok(*n as i64),
    SqlValue::TinyInt(n) => Ok(*n as i64),
);
from_sql_impl!(f32, "f32", v => SqlValue::Float(n) => Ok(*n));
from_sql_impl!(f64, "f64", v =>
    SqlValue::Double(n) => Ok(*n),
    SqlValue::Float(n) => Ok(*n as f64),
);
from_sql_impl!(String, "String", v =>
    SqlValue::String(s) => Ok(s.clone()),
    SqlValue::Xml(s) => Ok(s.clone()),
);
from_sql_impl!(Vec<u8>, "Vec<u8>", v => SqlValue::Binary(b) => Ok(b.to_vec()));

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

#[cfg(feature = "uuid")]
from_sql_impl!(uuid::Uuid, "Uuid", v =>
    SqlValue::Uuid(u) => Ok(*u),
    SqlValue::Binary(b) if b.len() == 16 => {
        let bytes: [u8; 16] = b[..].try_into().map_err(|_| TypeError::InvalidUuid("invalid UUID length".to_string()))?;
        Ok(uuid::Uuid::from_bytes(bytes))
    },
    SqlValue::String(s) => s.parse().map_err(|e| TypeError::InvalidUuid(format!("{e}"))),
);

#[cfg(feature = "decimal")]
from_sql_impl!(rust_decimal::Decimal, "Decimal", v =>
    SqlValue::Decimal(d) => Ok(*d),
    SqlValue::Int(n) => Ok(rust_decimal::Decimal::from(*n)),
    SqlValue::BigInt(n) => Ok(rust_decimal::Decimal::from(*n)),
    SqlValue::String(s) => s.parse().map_err(|e| TypeError::InvalidDecimal(format!("{e}"))),
);

#[cfg(feature = "chrono")]
from_sql_impl!(chrono::NaiveDate, "NaiveDate", v =>
    SqlValue::Date(d) => Ok(*d),
    SqlValue::DateTime(dt) => Ok(dt.date()),
);

#[cfg(feature = "chrono")]
from_sql_impl!(chrono::NaiveTime, "NaiveTime", v =>
    SqlValue::Time(t) => Ok(*t),
    SqlValue::DateTime(dt) => Ok(dt.time()),
);

#[cfg(feature = "chrono")]
from_sql_impl!(chrono::NaiveDateTime, "NaiveDateTime", v =>
    SqlValue::DateTime(dt) => Ok(*dt),
    SqlValue::DateTimeOffset(dt) => Ok(dt.naive_utc()),
);

#[cfg(feature = "chrono")]
from_sql_impl!(chrono::DateTime<chrono::FixedOffset>, "DateTime<FixedOffset>", v =>
    SqlValue::DateTimeOffset(dt) => Ok(*dt),
);

#[cfg(feature = "chrono")]
from_sql_impl!(chrono::DateTime<chrono::Utc>, "DateTime<Utc>", v =>
    SqlValue::DateTimeOffset(dt) => Ok(dt.to_utc()),
    SqlValue::DateTime(dt) => Ok(chrono::DateTime::from_naive_utc_and_offset(*dt, chrono::Utc)),
);

#[cfg(feature = "json")]
impl FromSql for serde_json::Value {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::String(s) => {
                serde_json::from_str(s).map_err(|e| TypeError::TypeMismatch {
                    expected: "JSON",
                    actual: format!("invalid JSON: {e}"),
                })
            }
            SqlValue::Null => Ok(serde_json::Value::Null),
            _ => Err(type_mismatch("JSON", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_an_int_variant_into_i32() {
        assert_eq!(i32::from_sql(&SqlValue::Int(42)).unwrap(), 42);
    }

    #[test]
    fn widens_smaller_integer_variants() {
        assert_eq!(i64::from_sql(&SqlValue::TinyInt(7)).unwrap(), 7);
        assert_eq!(i32::from_sql(&SqlValue::SmallInt(-3)).unwrap(), -3);
    }

    #[test]
    fn string_also_accepts_xml() {
        assert_eq!(String::from_sql(&SqlValue::Xml("<a/>".into())).unwrap(), "<a/>");
    }

    #[test]
    fn null_is_an_error_for_a_non_optional_target() {
        assert!(i32::from_sql(&SqlValue::Null).is_err());
    }

    #[test]
    fn null_maps_to_none_for_an_optional_target() {
        assert_eq!(Option::<i32>::from_sql(&SqlValue::Int(42)).unwrap(), Some(42));
        assert_eq!(Option::<i32>::from_sql(&SqlValue::Null).unwrap(), None);
    }

    #[test]
    fn mismatched_variant_reports_the_actual_type_name() {
        let err = i32::from_sql(&SqlValue::String("x".into())).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { expected: "i32", .. }));
    }
}
