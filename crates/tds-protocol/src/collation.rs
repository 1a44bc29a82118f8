//! Collation-to-encoding mapping for non-UTF-8 `VARCHAR`/`CHAR` columns.
//!
//! A SQL Server collation carries an LCID (locale ID) that pins down which
//! single/double-byte code page narrow-character columns are encoded in.
//! [`code_page_for_lcid`] is the single source of truth mapping a primary
//! language ID to its code page; [`encoding_for_lcid`] and
//! [`encoding_name_for_lcid`] both derive from it rather than repeating the
//! language-ID table, so there is exactly one place that knows "Russian is
//! code page 1251".
//!
//! SQL Server 2019+ also supports `_UTF8`-suffixed collations, flagged by
//! bit 27 of the collation info field; those need no transcoding at all.
//!
//! References: [MS-LCID](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-lcid/),
//! [Code Page Identifiers](https://learn.microsoft.com/en-us/windows/win32/intl/code-page-identifiers).

#[cfg(feature = "encoding")]
use encoding_rs::Encoding;

/// Flag bit indicating a UTF-8 collation (SQL Server 2019+), bit 27
/// (0x0800_0000) of the collation info field.
pub const COLLATION_FLAG_UTF8: u32 = 0x0800_0000;

/// Mask to extract the primary LCID from the collation info (lower 20 bits).
pub const LCID_MASK: u32 = 0x000F_FFFF;

/// Mask to extract the primary language ID (lower 16 bits of LCID).
pub const PRIMARY_LANGUAGE_MASK: u32 = 0x0000_FFFF;

/// Whether the collation is one of the UTF-8 collations introduced in SQL
/// Server 2019.
#[inline]
#[must_use]
pub fn is_utf8_collation(lcid: u32) -> bool {
    lcid & COLLATION_FLAG_UTF8 != 0
}

/// Windows code page for a primary language ID, defaulting to 1252 (Western
/// European) for anything unrecognized — the same default SQL Server itself
/// falls back to for an unmapped LCID.
///
/// This is the single table every other lookup in this module derives from.
#[must_use]
pub fn code_page_for_lcid(lcid: u32) -> u16 {
    if is_utf8_collation(lcid) {
        return 65001;
    }

    match lcid & PRIMARY_LANGUAGE_MASK {
        0x0411 => 932, // Japanese - Shift_JIS
        0x0804 | 0x1004 => 936, // Chinese Simplified (PRC, Singapore) - GBK/GB18030
        0x0404 | 0x0C04 | 0x1404 => 950, // Chinese Traditional (Taiwan, HK, Macao) - Big5
        0x0412 => 949, // Korean - EUC-KR
        0x041E => 874, // Thai
        0x042A => 1258, // Vietnamese

        // Central/Eastern European: Czech, Polish, Hungarian, Croatian, Serbian
        // (Latin), Bosnian (Latin), Slovak, Slovenian, Romanian, Albanian.
        0x0405 | 0x0415 | 0x040E | 0x041A | 0x081A | 0x141A | 0x101A | 0x041B | 0x0424 | 0x0418
        | 0x041C => 1250,

        // Cyrillic: Russian, Ukrainian, Belarusian, Bulgarian, Macedonian,
        // Serbian (Cyrillic), Bosnian (Cyrillic), Kyrgyz, Uzbek (Cyrillic),
        // Tatar, Mongolian (Cyrillic), Sakha.
        0x0419 | 0x0422 | 0x0423 | 0x0402 | 0x042F | 0x0C1A | 0x201A | 0x0440 | 0x0843 | 0x0444
        | 0x0450 | 0x0485 => 1251,

        0x0408 => 1253, // Greek
        0x041F | 0x042C => 1254, // Turkish, Azerbaijani (Latin)
        0x040D => 1255, // Hebrew

        // Arabic, plus Farsi/Persian, Urdu, Dari, Pashto which share code page 1256.
        0x0401 | 0x0801 | 0x0C01 | 0x1001 | 0x1401 | 0x1801 | 0x1C01 | 0x2001 | 0x2401 | 0x2801
        | 0x2C01 | 0x3001 | 0x3401 | 0x3801 | 0x3C01 | 0x4001 | 0x0429 | 0x0420 | 0x048C
        | 0x0463 => 1256,

        0x0425..=0x0427 => 1257, // Baltic: Estonian, Latvian, Lithuanian

        // Western European is the catch-all default: English, French, German,
        // Spanish, Italian, Portuguese, Dutch, Nordic languages, and the rest
        // fall through to it below.
        _ => 1252,
    }
}

/// `encoding_rs` encoding for a given code page number, or `None` for an
/// unrecognized one (callers should fall back to Windows-1252).
#[cfg(feature = "encoding")]
#[must_use]
pub fn encoding_for_code_page(code_page: u16) -> Option<&'static Encoding> {
    match code_page {
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GB18030),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        _ => None,
    }
}

/// Encoding for a collation's LCID, or `None` if it's a UTF-8 collation
/// (no transcoding needed) or an unrecognized code page.
#[cfg(feature = "encoding")]
#[must_use]
pub fn encoding_for_lcid(lcid: u32) -> Option<&'static Encoding> {
    if is_utf8_collation(lcid) {
        return None;
    }
    encoding_for_code_page(code_page_for_lcid(lcid))
}

/// Encoding name for display/logging, defaulting to `"windows-1252"`.
#[cfg(feature = "encoding")]
#[must_use]
pub fn encoding_name_for_lcid(lcid: u32) -> &'static str {
    if is_utf8_collation(lcid) {
        return "UTF-8";
    }
    encoding_for_lcid(lcid).map_or("windows-1252", Encoding::name)
}

#[cfg(all(test, feature = "encoding"))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn utf8_flag_is_detected_independent_of_the_lcid_bits() {
        assert!(is_utf8_collation(0x0800_0409));
        assert!(!is_utf8_collation(0x0409));
    }

    #[test]
    fn japanese_maps_to_shift_jis() {
        let enc = encoding_for_lcid(0x0411).unwrap();
        assert_eq!(enc.name(), "Shift_JIS");
        assert_eq!(code_page_for_lcid(0x0411), 932);
    }

    #[test]
    fn chinese_simplified_maps_to_gb18030() {
        let enc = encoding_for_lcid(0x0804).unwrap();
        assert_eq!(enc.name(), "gb18030");
        assert_eq!(code_page_for_lcid(0x0804), 936);
    }

    #[test]
    fn chinese_traditional_maps_to_big5() {
        let enc = encoding_for_lcid(0x0404).unwrap();
        assert_eq!(enc.name(), "Big5");
        assert_eq!(code_page_for_lcid(0x0404), 950);
    }

    #[test]
    fn korean_maps_to_euc_kr() {
        let enc = encoding_for_lcid(0x0412).unwrap();
        assert_eq!(enc.name(), "EUC-KR");
        assert_eq!(code_page_for_lcid(0x0412), 949);
    }

    #[test]
    fn cyrillic_languages_share_windows_1251() {
        assert_eq!(encoding_for_lcid(0x0419).unwrap().name(), "windows-1251"); // Russian
        assert_eq!(encoding_for_lcid(0x0422).unwrap().name(), "windows-1251"); // Ukrainian
    }

    #[test]
    fn western_european_languages_share_windows_1252() {
        assert_eq!(encoding_for_lcid(0x0409).unwrap().name(), "windows-1252"); // English (US)
        assert_eq!(encoding_for_lcid(0x040C).unwrap().name(), "windows-1252"); // French
        assert_eq!(encoding_for_lcid(0x0407).unwrap().name(), "windows-1252"); // German
        assert_eq!(code_page_for_lcid(0x0409), 1252);
    }

    #[test]
    fn greek_turkish_hebrew_map_to_their_own_code_pages() {
        assert_eq!(code_page_for_lcid(0x0408), 1253);
        assert_eq!(code_page_for_lcid(0x041F), 1254);
        assert_eq!(code_page_for_lcid(0x040D), 1255);
    }

    #[test]
    fn arabic_and_farsi_share_code_page_1256() {
        assert_eq!(code_page_for_lcid(0x0401), 1256); // Arabic (Saudi Arabia)
        assert_eq!(code_page_for_lcid(0x0429), 1256); // Farsi/Persian
    }

    #[test]
    fn baltic_range_maps_to_code_page_1257() {
        assert_eq!(code_page_for_lcid(0x0425), 1257);
        assert_eq!(code_page_for_lcid(0x0427), 1257);
    }

    #[test]
    fn thai_and_vietnamese_have_dedicated_code_pages() {
        assert_eq!(code_page_for_lcid(0x041E), 874);
        assert_eq!(code_page_for_lcid(0x042A), 1258);
    }

    #[test]
    fn unknown_lcid_falls_back_to_windows_1252() {
        assert!(encoding_for_lcid(0x9999).is_none());
        assert_eq!(code_page_for_lcid(0x9999), 1252);
        assert_eq!(encoding_name_for_lcid(0x9999), "windows-1252");
    }

    #[test]
    fn encoding_name_reports_utf8_for_the_utf8_collation_flag() {
        assert_eq!(encoding_name_for_lcid(0x0800_0409), "UTF-8");
    }

    #[test]
    fn decodes_chinese_text_from_gb18030_bytes() {
        let enc = encoding_for_lcid(0x0804).unwrap();
        let (decoded, _, had_errors) = enc.decode(&[0xD6, 0xD0, 0xCE, 0xC4]);
        assert!(!had_errors);
        assert_eq!(decoded, "中文");
    }

    #[test]
    fn decodes_cyrillic_text_from_windows_1251_bytes() {
        let enc = encoding_for_lcid(0x0419).unwrap();
        let (decoded, _, had_errors) = enc.decode(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        assert!(!had_errors);
        assert_eq!(decoded, "Привет");
    }

    #[test]
    fn decodes_japanese_text_from_shift_jis_bytes() {
        let enc = encoding_for_lcid(0x0411).unwrap();
        let (decoded, _, had_errors) = enc.decode(&[0x93, 0xFA, 0x96, 0x7B, 0x8C, 0xEA]);
        assert!(!had_errors);
        assert_eq!(decoded, "日本語");
    }
}
