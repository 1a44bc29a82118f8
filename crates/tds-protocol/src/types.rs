//! TDS data type definitions.
//!
//! This module defines the SQL Server data types as they appear in the TDS protocol.

/// TDS data type identifiers.
///
/// These correspond to the type bytes sent in column metadata and parameter definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // Fixed-length types (no length prefix)
    /// Null type.
    Null = 0x1F,
    /// 8-bit signed integer.
    Int1 = 0x30,
    /// Bit (boolean).
    Bit = 0x32,
    /// 16-bit signed integer.
    Int2 = 0x34,
    /// 32-bit signed integer.
    Int4 = 0x38,
    /// 64-bit signed integer.
    Int8 = 0x7F,
    /// 4-byte datetime.
    DateTimeN = 0x6F,
    /// 32-bit floating point.
    Float4 = 0x3B,
    /// 64-bit floating point.
    Float8 = 0x3E,
    /// 8-byte money.
    Money = 0x3C,
    /// 4-byte money.
    Money4 = 0x7A,
    /// 4-byte datetime.
    DateTime = 0x3D,
    /// 4-byte small datetime.
    DateTime4 = 0x3A,

    // Variable-length types (with length prefix)
    /// Variable-length GUID.
    Guid = 0x24,
    /// Variable-length integer.
    IntN = 0x26,
    /// Variable-length decimal.
    Decimal = 0x37,
    /// Variable-length numeric.
    Numeric = 0x3F,
    /// Variable-length bit.
    BitN = 0x68,
    /// Variable-length decimal (newer).
    DecimalN = 0x6A,
    /// Variable-length numeric (newer).
    NumericN = 0x6C,
    /// Variable-length float.
    FloatN = 0x6D,
    /// Variable-length money.
    MoneyN = 0x6E,

    // Byte-counted types
    /// Fixed-length character.
    Char = 0x2F,
    /// Variable-length character.
    VarChar = 0x27,
    /// Fixed-length binary.
    Binary = 0x2D,
    /// Variable-length binary.
    VarBinary = 0x25,

    // Counted types with 2-byte length
    /// Large variable-length character.
    BigVarChar = 0xA7,
    /// Large variable-length binary.
    BigVarBinary = 0xA5,
    /// Large fixed-length character.
    BigChar = 0xAF,
    /// Large fixed-length binary.
    BigBinary = 0xAD,

    // Unicode types
    /// Fixed-length Unicode character.
    NChar = 0xEF,
    /// Variable-length Unicode character.
    NVarChar = 0xE7,

    // Large object types (PLP - Partially Length-Prefixed)
    /// Text (deprecated, use varchar(max)).
    Text = 0x23,
    /// Image (deprecated, use varbinary(max)).
    Image = 0x22,
    /// NText (deprecated, use nvarchar(max)).
    NText = 0x63,

    // Date/time types (SQL Server 2008+)
    /// Date (3 bytes).
    Date = 0x28,
    /// Time with variable precision.
    Time = 0x29,
    /// DateTime2 with variable precision.
    DateTime2 = 0x2A,
    /// DateTimeOffset with variable precision.
    DateTimeOffset = 0x2B,

    // Special types
    /// SQL Variant.
    Variant = 0x62,
    /// User-defined type.
    Udt = 0xF0,
    /// XML type.
    Xml = 0xF1,
    /// Table-valued parameter.
    Tvp = 0xF3,
}

impl TypeId {
    /// Create a type ID from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x1F => Some(Self::Null),
            0x30 => Some(Self::Int1),
            0x32 => Some(Self::Bit),
            0x34 => Some(Self::Int2),
            0x38 => Some(Self::Int4),
            0x7F => Some(Self::Int8),
            0x6F => Some(Self::DateTimeN),
            0x3B => Some(Self::Float4),
            0x3E => Some(Self::Float8),
            0x3C => Some(Self::Money),
            0x7A => Some(Self::Money4),
            0x3D => Some(Self::DateTime),
            0x3A => Some(Self::DateTime4),
            0x24 => Some(Self::Guid),
            0x26 => Some(Self::IntN),
            0x37 => Some(Self::Decimal),
            0x3F => Some(Self::Numeric),
            0x68 => Some(Self::BitN),
            0x6A => Some(Self::DecimalN),
            0x6C => Some(Self::NumericN),
            0x6D => Some(Self::FloatN),
            0x6E => Some(Self::MoneyN),
            0x2F => Some(Self::Char),
            0x27 => Some(Self::VarChar),
            0x2D => Some(Self::Binary),
            0x25 => Some(Self::VarBinary),
            0xA7 => Some(Self::BigVarChar),
            0xA5 => Some(Self::BigVarBinary),
            0xAF => Some(Self::BigChar),
            0xAD => Some(Self::BigBinary),
            0xEF => Some(Self::NChar),
            0xE7 => Some(Self::NVarChar),
            0x23 => Some(Self::Text),
            0x22 => Some(Self::Image),
            0x63 => Some(Self::NText),
            0x28 => Some(Self::Date),
            0x29 => Some(Self::Time),
            0x2A => Some(Self::DateTime2),
            0x2B => Some(Self::DateTimeOffset),
            0x62 => Some(Self::Variant),
            0xF0 => Some(Self::Udt),
            0xF1 => Some(Self::Xml),
            0xF3 => Some(Self::Tvp),
            _ => None,
        }
    }

    /// Check if this is a fixed-length type.
    #[must_use]
    pub const fn is_fixed_length(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Int1
                | Self::Bit
                | Self::Int2
                | Self::Int4
                | Self::Int8
                | Self::Float4
                | Self::Float8
                | Self::Money
                | Self::Money4
                | Self::DateTime
                | Self::DateTime4
        )
    }

    /// Check if this is a variable-length type.
    #[must_use]
    pub const fn is_variable_length(&self) -> bool {
        !self.is_fixed_length()
    }

    /// Check if this type uses PLP (Partially Length-Prefixed) encoding.
    #[must_use]
    pub const fn is_plp(&self) -> bool {
        matches!(self, Self::Text | Self::Image | Self::NText | Self::Xml)
    }

    /// Check if this is a Unicode type.
    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::NChar | Self::NVarChar | Self::NText)
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(
            self,
            Self::DateTime
                | Self::DateTime4
                | Self::DateTimeN
                | Self::Date
                | Self::Time
                | Self::DateTime2
                | Self::DateTimeOffset
        )
    }

    /// Get the fixed size of this type in bytes, if applicable.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Int1 => Some(1),
            Self::Bit => Some(1),
            Self::Int2 => Some(2),
            Self::Int4 => Some(4),
            Self::Int8 => Some(8),
            Self::Float4 => Some(4),
            Self::Float8 => Some(8),
            Self::Money => Some(8),
            Self::Money4 => Some(4),
            Self::DateTime => Some(8),
            Self::DateTime4 => Some(4),
            Self::Date => Some(3),
            _ => None,
        }
    }

    /// Get the length-prefix strategy used to frame this type's value(s) on
    /// the wire.
    #[must_use]
    pub const fn length_strategy(&self) -> LengthStrategy {
        match self {
            Self::Null
            | Self::Int1
            | Self::Bit
            | Self::Int2
            | Self::Int4
            | Self::Int8
            | Self::Float4
            | Self::Float8
            | Self::Money
            | Self::Money4
            | Self::DateTime
            | Self::DateTime4
            | Self::Date => LengthStrategy::FixedLen,

            Self::IntN
            | Self::BitN
            | Self::Decimal
            | Self::Numeric
            | Self::DecimalN
            | Self::NumericN
            | Self::FloatN
            | Self::MoneyN
            | Self::DateTimeN
            | Self::Guid
            | Self::Char
            | Self::VarChar
            | Self::Binary
            | Self::VarBinary
            | Self::Time
            | Self::DateTime2
            | Self::DateTimeOffset => LengthStrategy::ByteLen,

            Self::BigVarChar
            | Self::BigVarBinary
            | Self::BigChar
            | Self::BigBinary
            | Self::NChar
            | Self::NVarChar
            | Self::Variant => LengthStrategy::UShortLen,

            Self::Text | Self::Image | Self::NText => LengthStrategy::LongLen,

            Self::Xml | Self::Udt | Self::Tvp => LengthStrategy::PartLen,
        }
    }

    /// True if values of this type carry a `Collation` field in their type
    /// info (narrow character types only — Unicode types are always UTF-16).
    #[must_use]
    pub const fn has_collation(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::BigChar | Self::BigVarChar | Self::Text
        )
    }

    /// True if values of this type carry a precision byte followed by a
    /// scale byte (the decimal/numeric family).
    #[must_use]
    pub const fn has_precision_scale(&self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Numeric | Self::DecimalN | Self::NumericN
        )
    }

    /// True if values of this type carry a single scale byte with no
    /// preceding precision byte (the time family: scale 0-7).
    #[must_use]
    pub const fn has_scale_only(&self) -> bool {
        matches!(self, Self::Time | Self::DateTime2 | Self::DateTimeOffset)
    }

    /// True if values of this type are framed as PLP (Partially
    /// Length-Prefixed) chunks rather than a single length-prefixed blob,
    /// which is how MAX-length large object types are actually sent on the
    /// wire regardless of their nominal length strategy.
    #[must_use]
    pub const fn is_plp_framed(&self) -> bool {
        self.is_plp() || matches!(self, Self::Udt)
    }
}

/// Strategy used to frame a value's length on the wire, per MS-TDS data type
/// grammar (`FIXEDLEN`, `BYTELEN`, `USHORTLEN`, `LONGLEN`, `PARTLEN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthStrategy {
    /// Length is implied by the type; no length byte on the wire.
    FixedLen,
    /// A single length byte precedes the value (0 = NULL for nullable types).
    ByteLen,
    /// A 2-byte little-endian length precedes the value (0xFFFF = NULL).
    UShortLen,
    /// A 4-byte little-endian length precedes the value (0xFFFFFFFF = NULL).
    LongLen,
    /// Partially length-prefixed: a total-length marker followed by a
    /// sequence of chunks, each individually length-prefixed, terminated by
    /// a zero-length chunk.
    PartLen,
}

/// Fully decoded `TYPE_INFO` as it appears in COLMETADATA column
/// definitions, RETURNVALUE tokens, and RPC parameter definitions.
///
/// This is the result of [`TypeBuilder::decode`]: the 1-byte type token plus
/// whatever combination of length, precision/scale, collation, and
/// user-type metadata that type category carries.
#[derive(Debug, Clone)]
pub struct TypeInformation {
    /// The TDS type identifier.
    pub type_id: TypeId,
    /// How this type's value length is framed on the wire.
    pub length_strategy: LengthStrategy,
    /// Maximum length in bytes (or, for MAX types, `None` to mean PLP
    /// unbounded). For fixed-length types this equals [`TypeId::fixed_size`].
    pub max_length: Option<u32>,
    /// Precision, for the decimal/numeric family.
    pub precision: Option<u8>,
    /// Scale, for the decimal/numeric and time families (0-7 for time
    /// types, 0-38 for decimal/numeric).
    pub scale: Option<u8>,
    /// Collation, for narrow character types.
    pub collation: Option<crate::token::Collation>,
    /// Raw per-type flags byte, currently only populated for XML (schema
    /// presence bit) and UDT type info.
    pub flags: u8,
    /// Schema/database-qualified type name, for UDT columns.
    pub udt_type_name: Option<crate::prelude::String>,
}

impl TypeInformation {
    /// Resolve the narrow-character encoding this type's values should be
    /// decoded with, if applicable.
    #[cfg(feature = "encoding")]
    #[must_use]
    pub fn charset(&self) -> Option<&'static encoding_rs::Encoding> {
        let collation = self.collation?;
        if collation.sort_id != 0 {
            return Some(encoding_rs::WINDOWS_1252);
        }
        crate::collation::encoding_for_lcid(collation.lcid)
    }
}

/// Reads a `TYPE_INFO` structure from a TDS byte stream.
///
/// See MS-TDS §2.2.5.4: the 1-byte type token determines which of length,
/// precision/scale, collation, and type-name fields follow.
pub struct TypeBuilder;

impl TypeBuilder {
    /// Decode a `TYPE_INFO` structure.
    ///
    /// `read_flags` controls whether a trailing classification flags byte is
    /// read for XML type info (schema-present bit); column metadata always
    /// sets this, RPC parameter type info never does.
    pub fn decode(
        src: &mut impl bytes::Buf,
        read_flags: bool,
    ) -> Result<TypeInformation, crate::error::ProtocolError> {
        use crate::error::ProtocolError;

        if !src.has_remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        let type_byte = src.get_u8();
        let type_id =
            TypeId::from_u8(type_byte).ok_or(ProtocolError::InvalidTokenType(type_byte))?;

        let length_strategy = type_id.length_strategy();

        let max_length = match length_strategy {
            LengthStrategy::FixedLen => type_id.fixed_size().map(|n| n as u32),
            LengthStrategy::ByteLen => {
                if !src.has_remaining() {
                    return Err(ProtocolError::UnexpectedEof);
                }
                Some(u32::from(src.get_u8()))
            }
            LengthStrategy::UShortLen => {
                if src.remaining() < 2 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                Some(u32::from(src.get_u16_le()))
            }
            LengthStrategy::LongLen | LengthStrategy::PartLen => {
                if src.remaining() < 4 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let raw = src.get_u32_le();
                if raw == 0xFFFF_FFFF { None } else { Some(raw) }
            }
        };

        let (precision, scale) = if type_id.has_precision_scale() {
            if src.remaining() < 2 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let precision = src.get_u8();
            let scale = src.get_u8();
            (Some(precision), Some(scale))
        } else if type_id.has_scale_only() {
            if !src.has_remaining() {
                return Err(ProtocolError::UnexpectedEof);
            }
            let scale = src.get_u8();
            if scale > 7 {
                return Err(ProtocolError::InvalidScale(scale));
            }
            (None, Some(scale))
        } else {
            (None, None)
        };

        let collation = if type_id.has_collation() {
            if src.remaining() < 5 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let lcid = src.get_u32_le();
            let sort_id = src.get_u8();
            Some(crate::token::Collation { lcid, sort_id })
        } else {
            None
        };

        let udt_type_name = if matches!(type_id, TypeId::Udt) {
            if src.remaining() < 3 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let _max_byte_size = src.get_u16_le();
            let db_name = crate::codec::read_b_varchar(src)?;
            let schema_name =
                crate::codec::read_b_varchar(src)?;
            let type_name = crate::codec::read_b_varchar(src)?;
            Some(crate::prelude::format!(
                "{db_name}.{schema_name}.{type_name}"
            ))
        } else {
            None
        };

        let flags = if read_flags && matches!(type_id, TypeId::Xml) {
            if !src.has_remaining() {
                return Err(ProtocolError::UnexpectedEof);
            }
            src.get_u8()
        } else {
            0
        };

        Ok(TypeInformation {
            type_id,
            length_strategy,
            max_length,
            precision,
            scale,
            collation,
            flags,
            udt_type_name,
        })
    }
}

/// Column flags from COLMETADATA.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnFlags {
    /// Column is nullable.
    pub nullable: bool,
    /// Column allows case-sensitive comparison.
    pub case_sensitive: bool,
    /// Column is updateable.
    pub updateable: Updateable,
    /// Column is an identity column.
    pub identity: bool,
    /// Column is computed.
    pub computed: bool,
    /// Column has fixed-length CLR type.
    pub fixed_len_clr_type: bool,
    /// Column is sparse.
    pub sparse_column_set: bool,
    /// Column is encrypted (Always Encrypted).
    pub encrypted: bool,
    /// Column is hidden.
    pub hidden: bool,
    /// Column is a key column.
    pub key: bool,
    /// Column is nullable but unknown at query time.
    pub nullable_unknown: bool,
}

/// Update mode for a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Updateable {
    /// Column is read-only.
    #[default]
    ReadOnly,
    /// Column is read-write.
    ReadWrite,
    /// Updateability unknown.
    Unknown,
}

impl ColumnFlags {
    /// Parse column flags from the 2-byte flags field.
    #[must_use]
    pub fn from_bits(flags: u16) -> Self {
        Self {
            nullable: (flags & 0x0001) != 0,
            case_sensitive: (flags & 0x0002) != 0,
            updateable: match (flags >> 2) & 0x03 {
                0 => Updateable::ReadOnly,
                1 => Updateable::ReadWrite,
                _ => Updateable::Unknown,
            },
            identity: (flags & 0x0010) != 0,
            computed: (flags & 0x0020) != 0,
            fixed_len_clr_type: (flags & 0x0100) != 0,
            sparse_column_set: (flags & 0x0200) != 0,
            encrypted: (flags & 0x0400) != 0,
            hidden: (flags & 0x2000) != 0,
            key: (flags & 0x4000) != 0,
            nullable_unknown: (flags & 0x8000) != 0,
        }
    }

    /// Convert flags back to bits.
    #[must_use]
    pub fn to_bits(&self) -> u16 {
        let mut flags = 0u16;
        if self.nullable {
            flags |= 0x0001;
        }
        if self.case_sensitive {
            flags |= 0x0002;
        }
        flags |= match self.updateable {
            Updateable::ReadOnly => 0,
            Updateable::ReadWrite => 1 << 2,
            Updateable::Unknown => 2 << 2,
        };
        if self.identity {
            flags |= 0x0010;
        }
        if self.computed {
            flags |= 0x0020;
        }
        if self.fixed_len_clr_type {
            flags |= 0x0100;
        }
        if self.sparse_column_set {
            flags |= 0x0200;
        }
        if self.encrypted {
            flags |= 0x0400;
        }
        if self.hidden {
            flags |= 0x2000;
        }
        if self.key {
            flags |= 0x4000;
        }
        if self.nullable_unknown {
            flags |= 0x8000;
        }
        flags
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_from_u8() {
        assert_eq!(TypeId::from_u8(0x38), Some(TypeId::Int4));
        assert_eq!(TypeId::from_u8(0xE7), Some(TypeId::NVarChar));
        assert_eq!(TypeId::from_u8(0x99), None);
    }

    #[test]
    fn test_fixed_length_detection() {
        assert!(TypeId::Int4.is_fixed_length());
        assert!(TypeId::Float8.is_fixed_length());
        assert!(!TypeId::NVarChar.is_fixed_length());
    }

    #[test]
    fn test_column_flags_roundtrip() {
        let flags = ColumnFlags {
            nullable: true,
            identity: true,
            key: true,
            ..Default::default()
        };
        let bits = flags.to_bits();
        let restored = ColumnFlags::from_bits(bits);
        assert_eq!(flags.nullable, restored.nullable);
        assert_eq!(flags.identity, restored.identity);
        assert_eq!(flags.key, restored.key);
    }
}
