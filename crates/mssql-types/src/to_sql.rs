//! Converting a Rust value into a [`SqlValue`] for parameter binding.
//!
//! This is the encode-direction mirror of [`crate::from_sql::FromSql`]: a
//! query parameter declares its own SQL type via [`ToSql::sql_type`] so the
//! RPC parameter encoder can pick the right `TYPE_INFO` without the caller
//! spelling it out separately.

use crate::error::TypeError;
use crate::value::SqlValue;

/// A Rust value that knows how to become a SQL parameter.
pub trait ToSql {
    /// Convert this value to a SQL value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// The SQL type name the server should bind this parameter as.
    fn sql_type(&self) -> &'static str;
}

/// Implement [`ToSql`] for a type that always succeeds and maps directly
/// onto one [`SqlValue`] variant.
macro_rules! to_sql_impl {
    ($ty:ty, $type_name:literal, $self:ident => $value:expr) => {
        impl ToSql for $ty {
            fn to_sql(&$self) -> Result<SqlValue, TypeError> {
                Ok($value)
            }

            fn sql_type(&self) -> &'static str {
                $type_name
            }
        }
    };
}

to_sql_impl!(bool, "BIT", self => SqlValue::Bool(*self));
to_sql_impl!(u8, "TINYINT", self => SqlValue::TinyInt(*self));
to_sql_impl!(i16, "SMALLINT", self => SqlValue::SmallInt(*self));
to_sql_impl!(i32, "INT", self => SqlValue::Int(*self));
to_sql_impl!(i64, "BIGINT", self => SqlValue::BigInt(*self));
to_sql_impl!(f32, "REAL", self => SqlValue::Float(*self));
to_sql_impl!(f64, "FLOAT", self => SqlValue::Double(*self));
to_sql_impl!(str, "NVARCHAR", self => SqlValue::String(self.to_owned()));
to_sql_impl!(String, "NVARCHAR", self => SqlValue::String(self.clone()));
to_sql_impl!([u8], "VARBINARY", self => SqlValue::Binary(bytes::Bytes::copy_from_slice(self)));
to_sql_impl!(Vec<u8>, "VARBINARY", self => SqlValue::Binary(bytes::Bytes::copy_from_slice(self)));

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> &'static str {
        self.as_ref().map_or("NULL", ToSql::sql_type)
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (*self).to_sql()
    }

    fn sql_type(&self) -> &'static str {
        (*self).sql_type()
    }
}

#[cfg(feature = "uuid")]
to_sql_impl!(uuid::Uuid, "UNIQUEIDENTIFIER", self => SqlValue::Uuid(*self));

#[cfg(feature = "decimal")]
to_sql_impl!(rust_decimal::Decimal, "DECIMAL", self => SqlValue::Decimal(*self));

#[cfg(feature = "chrono")]
to_sql_impl!(chrono::NaiveDate, "DATE", self => SqlValue::Date(*self));

#[cfg(feature = "chrono")]
to_sql_impl!(chrono::NaiveTime, "TIME", self => SqlValue::Time(*self));

#[cfg(feature = "chrono")]
to_sql_impl!(chrono::NaiveDateTime, "DATETIME2", self => SqlValue::DateTime(*self));

#[cfg(feature = "chrono")]
to_sql_impl!(chrono::DateTime<chrono::FixedOffset>, "DATETIMEOFFSET", self => SqlValue::DateTimeOffset(*self));

#[cfg(feature = "json")]
to_sql_impl!(serde_json::Value, "NVARCHAR(MAX)", self => SqlValue::Json(self.clone()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_binds_as_int() {
        let value: i32 = 42;
        assert_eq!(value.to_sql().unwrap(), SqlValue::Int(42));
        assert_eq!(value.sql_type(), "INT");
    }

    #[test]
    fn string_binds_as_nvarchar() {
        let value = "hello".to_string();
        assert_eq!(value.to_sql().unwrap(), SqlValue::String("hello".to_string()));
        assert_eq!(value.sql_type(), "NVARCHAR");
    }

    #[test]
    fn option_none_binds_as_null_and_reports_null_type() {
        let none: Option<i32> = None;
        assert_eq!(none.to_sql().unwrap(), SqlValue::Null);
        assert_eq!(none.sql_type(), "NULL");
    }

    #[test]
    fn option_some_defers_to_the_inner_type() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.to_sql().unwrap(), SqlValue::Int(42));
        assert_eq!(some.sql_type(), "INT");
    }

    #[test]
    fn reference_defers_to_the_pointee() {
        let value = 7i64;
        let reference: &i64 = &value;
        assert_eq!(reference.to_sql().unwrap(), SqlValue::BigInt(7));
        assert_eq!(reference.sql_type(), "BIGINT");
    }
}
