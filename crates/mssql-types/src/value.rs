//! The decoded form every TDS column value is normalized into.
//!
//! [`SqlValue`] is the `target_kind` half of the column-codec split described
//! for the registry: a decoder turns wire bytes plus a `TypeInformation` into
//! one of these variants, and [`crate::from_sql::FromSql`] turns a variant
//! into whatever concrete Rust type the caller asked for.

use bytes::Bytes;

/// A decoded SQL Server column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// `BIT`.
    Bool(bool),
    /// `TINYINT`.
    TinyInt(u8),
    /// `SMALLINT`.
    SmallInt(i16),
    /// `INT`.
    Int(i32),
    /// `BIGINT`.
    BigInt(i64),
    /// `REAL`.
    Float(f32),
    /// `FLOAT`.
    Double(f64),
    /// `CHAR`, `VARCHAR`, `NCHAR`, `NVARCHAR`, `TEXT`, `NTEXT`.
    String(String),
    /// `BINARY`, `VARBINARY`, `IMAGE`.
    Binary(Bytes),
    /// `DECIMAL`, `NUMERIC`, `MONEY`, `SMALLMONEY`.
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// `UNIQUEIDENTIFIER`.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    /// `DATE`.
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// `TIME`.
    #[cfg(feature = "chrono")]
    Time(chrono::NaiveTime),
    /// `DATETIME`, `DATETIME2`, `SMALLDATETIME`.
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
    /// `DATETIMEOFFSET`.
    #[cfg(feature = "chrono")]
    DateTimeOffset(chrono::DateTime<chrono::FixedOffset>),
    /// `JSON` (SQL Server 2016+).
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    /// `XML`.
    Xml(String),
}

macro_rules! accessor {
    ($name:ident -> $ret:ty, $($pattern:pat => $result:expr),+ $(,)?) => {
        #[doc = concat!("Get the value as ", stringify!($ret), ", if it holds one.")]
        #[must_use]
        pub fn $name(&self) -> Option<$ret> {
            match self {
                $($pattern => Some($result),)+
                _ => None,
            }
        }
    };
}

impl SqlValue {
    /// Whether this is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    accessor!(as_bool -> bool, Self::Bool(v) => *v);
    accessor!(as_u8 -> u8, Self::TinyInt(v) => *v);
    accessor!(as_i16 -> i16, Self::SmallInt(v) => *v, Self::TinyInt(v) => *v as i16);
    accessor!(as_i32 -> i32,
        Self::Int(v) => *v,
        Self::SmallInt(v) => *v as i32,
        Self::TinyInt(v) => *v as i32,
    );
    accessor!(as_i64 -> i64,
        Self::BigInt(v) => *v,
        Self::Int(v) => *v as i64,
        Self::SmallInt(v) => *v as i64,
        Self::TinyInt(v) => *v as i64,
    );
    accessor!(as_f32 -> f32, Self::Float(v) => *v);
    accessor!(as_f64 -> f64, Self::Double(v) => *v, Self::Float(v) => *v as f64);

    /// Get the value as a string slice, if it holds `String` or `Xml`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Xml(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it holds `Binary`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    #[cfg(feature = "uuid")]
    accessor!(as_uuid -> uuid::Uuid, Self::Uuid(v) => *v);

    #[cfg(feature = "decimal")]
    accessor!(as_decimal -> rust_decimal::Decimal, Self::Decimal(v) => *v);

    #[cfg(feature = "chrono")]
    accessor!(as_date -> chrono::NaiveDate, Self::Date(v) => *v, Self::DateTime(v) => v.date());

    #[cfg(feature = "chrono")]
    accessor!(as_time -> chrono::NaiveTime, Self::Time(v) => *v, Self::DateTime(v) => v.time());

    /// Name of the server type this value most naturally maps back to, for
    /// error messages and logging. Several server types collapse onto the
    /// same variant (e.g. `DATETIME`/`DATETIME2`/`SMALLDATETIME` all decode
    /// to `DateTime`), so this reports the canonical one rather than the
    /// exact wire type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BIT",
            Self::TinyInt(_) => "TINYINT",
            Self::SmallInt(_) => "SMALLINT",
            Self::Int(_) => "INT",
            Self::BigInt(_) => "BIGINT",
            Self::Float(_) => "REAL",
            Self::Double(_) => "FLOAT",
            Self::String(_) => "NVARCHAR",
            Self::Binary(_) => "VARBINARY",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "DECIMAL",
            #[cfg(feature = "uuid")]
            Self::Uuid(_) => "UNIQUEIDENTIFIER",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "DATE",
            #[cfg(feature = "chrono")]
            Self::Time(_) => "TIME",
            #[cfg(feature = "chrono")]
            Self::DateTime(_) => "DATETIME2",
            #[cfg(feature = "chrono")]
            Self::DateTimeOffset(_) => "DATETIMEOFFSET",
            #[cfg(feature = "json")]
            Self::Json(_) => "JSON",
            Self::Xml(_) => "XML",
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

impl core::fmt::Display for SqlValue {
    /// Renders the value for logs and trace spans. Binary payloads print
    /// their length rather than their bytes, so a row full of `VARBINARY`
    /// doesn't flood a log line.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::TinyInt(v) => write!(f, "{v}"),
            Self::SmallInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) | Self::Xml(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            #[cfg(feature = "decimal")]
            Self::Decimal(v) => write!(f, "{v}"),
            #[cfg(feature = "uuid")]
            Self::Uuid(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::Date(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::Time(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::DateTime(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::DateTimeOffset(v) => write!(f, "{v}"),
            #[cfg(feature = "json")]
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for SqlValue {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for SqlValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for SqlValue {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for SqlValue {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accessors_widen_smaller_variants() {
        assert_eq!(SqlValue::TinyInt(7).as_i64(), Some(7));
        assert_eq!(SqlValue::SmallInt(-3).as_i32(), Some(-3));
        assert_eq!(SqlValue::Int(9).as_i16(), None);
    }

    #[test]
    fn string_and_xml_share_as_str() {
        assert_eq!(SqlValue::String("a".into()).as_str(), Some("a"));
        assert_eq!(SqlValue::Xml("<a/>".into()).as_str(), Some("<a/>"));
        assert_eq!(SqlValue::Int(1).as_str(), None);
    }

    #[test]
    fn display_summarizes_binary_by_length_not_content() {
        let value = SqlValue::Binary(Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(value.to_string(), "<4 bytes>");
    }

    #[test]
    fn default_is_null() {
        assert_eq!(SqlValue::default(), SqlValue::Null);
        assert!(SqlValue::default().is_null());
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        let some: SqlValue = Some(5i32).into();
        let none: SqlValue = Option::<i32>::None.into();
        assert_eq!(some, SqlValue::Int(5));
        assert_eq!(none, SqlValue::Null);
    }
}
