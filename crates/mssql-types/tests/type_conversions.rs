//! Edge-case coverage for the `FromSql`/`ToSql` conversion boundary: NULL
//! handling, integer/float boundaries, Unicode, and binary data.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::approx_constant)]

use bytes::Bytes;
use mssql_types::{FromSql, SqlValue, ToSql, TypeError};

mod null_handling {
    use super::*;

    #[test]
    fn null_converts_to_none_for_optional_targets() {
        assert_eq!(Option::<i32>::from_sql(&SqlValue::Null).unwrap(), None);
        assert_eq!(Option::<String>::from_sql(&SqlValue::Null).unwrap(), None);
    }

    #[test]
    fn null_is_rejected_by_non_optional_targets() {
        assert!(matches!(i32::from_sql(&SqlValue::Null), Err(TypeError::UnexpectedNull)));
        assert!(matches!(String::from_sql(&SqlValue::Null), Err(TypeError::UnexpectedNull)));
    }

    #[test]
    fn option_round_trips_through_to_sql() {
        assert!(None::<i32>.to_sql().unwrap().is_null());
        assert_eq!(Some(42i32).to_sql().unwrap(), SqlValue::Int(42));
    }
}

mod integer_boundaries {
    use super::*;

    #[test]
    fn extreme_values_survive_the_round_trip_for_every_integer_width() {
        assert_eq!(i32::from_sql(&SqlValue::Int(i32::MAX)).unwrap(), i32::MAX);
        assert_eq!(i32::from_sql(&SqlValue::Int(i32::MIN)).unwrap(), i32::MIN);
        assert_eq!(i64::from_sql(&SqlValue::BigInt(i64::MAX)).unwrap(), i64::MAX);
        assert_eq!(i64::from_sql(&SqlValue::BigInt(i64::MIN)).unwrap(), i64::MIN);
        assert_eq!(i16::from_sql(&SqlValue::SmallInt(i16::MAX)).unwrap(), i16::MAX);
        assert_eq!(i16::from_sql(&SqlValue::SmallInt(i16::MIN)).unwrap(), i16::MIN);
        assert_eq!(u8::from_sql(&SqlValue::TinyInt(u8::MAX)).unwrap(), u8::MAX);
        assert_eq!(u8::from_sql(&SqlValue::TinyInt(0)).unwrap(), 0);
    }
}

mod float_boundaries {
    use super::*;

    #[test]
    fn f64_carries_extreme_finite_values() {
        assert_eq!(f64::from_sql(&SqlValue::Double(f64::MAX)).unwrap(), f64::MAX);
        assert_eq!(f64::from_sql(&SqlValue::Double(f64::MIN)).unwrap(), f64::MIN);
        assert_eq!(f64::from_sql(&SqlValue::Double(0.0)).unwrap(), 0.0);
        assert_eq!(f64::from_sql(&SqlValue::Double(-0.0)).unwrap(), 0.0);
    }

    #[test]
    fn f64_passes_through_infinities_and_nan_unchanged() {
        assert!(f64::from_sql(&SqlValue::Double(f64::INFINITY)).unwrap().is_infinite());
        let neg_inf = f64::from_sql(&SqlValue::Double(f64::NEG_INFINITY)).unwrap();
        assert!(neg_inf.is_infinite() && neg_inf.is_sign_negative());
        assert!(f64::from_sql(&SqlValue::Double(f64::NAN)).unwrap().is_nan());
    }

    #[test]
    fn f32_widens_to_f64() {
        assert_eq!(f32::from_sql(&SqlValue::Float(f32::MAX)).unwrap(), f32::MAX);
        let widened = f64::from_sql(&SqlValue::Float(3.14)).unwrap();
        assert!((widened - 3.14_f64).abs() < 0.0001);
    }
}

mod unicode_handling {
    use super::*;

    #[test]
    fn strings_pass_through_byte_for_byte_regardless_of_script() {
        let cases = [
            "",
            "Hello, World!",
            "日本語テスト",          // basic multilingual plane
            "😀🎉🚀",                // supplementary plane, surrogate pairs in UTF-16
            "cafe\u{0301}",          // combining acute accent, not normalized away
            "Test\u{200B}String",    // zero-width space
            "שלום",                  // right-to-left
            "Hello世界مرحبا",        // mixed scripts
        ];
        for s in cases {
            let value = SqlValue::String(s.to_string());
            assert_eq!(String::from_sql(&value).unwrap(), s);
        }
    }

    #[test]
    fn embedded_null_byte_is_preserved_not_treated_as_a_terminator() {
        let value = SqlValue::String("before\0after".to_string());
        let s = String::from_sql(&value).unwrap();
        assert!(s.contains('\0'));
        assert_eq!(s.len(), 12);
    }

    #[test]
    fn large_strings_round_trip_without_truncation() {
        let long = "x".repeat(1_000_000);
        let value = SqlValue::String(long.clone());
        assert_eq!(String::from_sql(&value).unwrap().len(), long.len());
    }
}

mod binary_handling {
    use super::*;

    #[test]
    fn binary_round_trips_every_byte_value() {
        let all_bytes: Vec<u8> = (0u8..=255u8).collect();
        let value = SqlValue::Binary(Bytes::from(all_bytes.clone()));
        assert_eq!(Vec::<u8>::from_sql(&value).unwrap(), all_bytes);
    }

    #[test]
    fn empty_and_large_binary_both_round_trip() {
        assert_eq!(Vec::<u8>::from_sql(&SqlValue::Binary(Bytes::new())).unwrap(), Vec::<u8>::new());

        let large = vec![0xABu8; 1_000_000];
        let value = SqlValue::Binary(Bytes::from(large.clone()));
        assert_eq!(Vec::<u8>::from_sql(&value).unwrap(), large);
    }
}

mod boolean_handling {
    use super::*;

    #[test]
    fn bool_round_trips_both_directions() {
        assert!(bool::from_sql(&SqlValue::Bool(true)).unwrap());
        assert!(!bool::from_sql(&SqlValue::Bool(false)).unwrap());
        assert_eq!(true.to_sql().unwrap(), SqlValue::Bool(true));
        assert_eq!(false.to_sql().unwrap(), SqlValue::Bool(false));
    }

    #[test]
    fn narrower_integer_variants_also_coerce_to_bool() {
        assert!(bool::from_sql(&SqlValue::TinyInt(1)).unwrap());
        assert!(!bool::from_sql(&SqlValue::Int(0)).unwrap());
    }
}

mod type_coercion {
    use super::*;

    #[test]
    fn smaller_integer_variants_widen_into_larger_targets() {
        assert_eq!(i64::from_sql(&SqlValue::Int(42)).unwrap(), 42i64);
        assert_eq!(i32::from_sql(&SqlValue::SmallInt(100)).unwrap(), 100i32);
        assert_eq!(i32::from_sql(&SqlValue::TinyInt(255)).unwrap(), 255i32);
    }
}

mod error_cases {
    use super::*;

    #[test]
    fn non_numeric_string_fails_to_decode_as_an_integer() {
        let value = SqlValue::String("not a number".to_string());
        assert!(i32::from_sql(&value).is_err());
    }

    #[test]
    fn integers_do_not_implicitly_convert_to_string() {
        // FromSql<String> only accepts String/Xml variants; callers that want
        // a textual rendering of a number should format the SqlValue itself.
        let value = SqlValue::Int(42);
        let err = String::from_sql(&value).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { expected: "String", .. }));
    }

    #[test]
    fn binary_does_not_implicitly_convert_to_string() {
        let value = SqlValue::Binary(Bytes::from_static(&[0xFF, 0xFE]));
        let err = String::from_sql(&value).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { expected: "String", .. }));
    }
}
