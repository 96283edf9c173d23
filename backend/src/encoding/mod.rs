//! Text encodings accepted for delimited uploads.
//!
//! The catalog lists WHATWG encoding labels, so every entry resolves through
//! [`encoding_rs::Encoding::for_label`]. `auto` asks chardet to guess.

use encoding_rs::{Encoding, UTF_8};

use crate::error::ParseError;

/// Encoding used when nothing else is chosen.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Pseudo-encoding that triggers detection.
pub const AUTO_ENCODING: &str = "auto";

/// Supported encodings, in display order.
pub const ENCODINGS: &[&str] = &[
    "UTF-8", "IBM866", "ISO-8859-1", "ISO-8859-2", "ISO-8859-3", "ISO-8859-4", "ISO-8859-5",
    "ISO-8859-6", "ISO-8859-7", "ISO-8859-8", "ISO-8859-8-I", "ISO-8859-10",
    "ISO-8859-13", "ISO-8859-14", "ISO-8859-15", "ISO-8859-16", "KOI8-R",
    "KOI8-U", "macintosh", "windows-874", "windows-1250", "windows-1251",
    "windows-1252", "windows-1253", "windows-1254", "windows-1255",
    "windows-1256", "windows-1257", "windows-1258", "x-mac-cyrillic", "GBK",
    "gb18030", "Big5", "EUC-JP", "ISO-2022-JP", "Shift_JIS", "EUC-KR",
    "replacement", "UTF-16BE", "UTF-16LE", "x-user-defined",
];

/// Catalog spelling of `name`, compared case-insensitively.
pub fn catalog_name(name: &str) -> Option<&'static str> {
    ENCODINGS
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
}

/// True for catalog entries and `auto`.
pub fn is_supported(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(AUTO_ENCODING) || catalog_name(name).is_some()
}

/// Guess the encoding of raw bytes, answered with a catalog name.
pub fn detect_encoding(bytes: &[u8]) -> &'static str {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => DEFAULT_ENCODING,
        other => Encoding::for_label(other.as_bytes())
            .and_then(|detected| {
                ENCODINGS
                    .iter()
                    .copied()
                    .find(|name| Encoding::for_label(name.as_bytes()) == Some(detected))
            })
            .unwrap_or(DEFAULT_ENCODING),
    }
}

/// Decode `bytes` with the named encoding.
///
/// Returns the text and the catalog name actually used (the detected one
/// for `auto`). A byte order mark overrides the requested encoding.
pub fn decode_content(bytes: &[u8], name: &str) -> Result<(String, &'static str), ParseError> {
    let resolved = if name.trim().eq_ignore_ascii_case(AUTO_ENCODING) {
        detect_encoding(bytes)
    } else {
        catalog_name(name).ok_or_else(|| ParseError::UnsupportedEncoding(name.to_string()))?
    };

    let encoding = Encoding::for_label(resolved.as_bytes()).unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);

    Ok((text.into_owned(), resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_entry_resolves() {
        for name in ENCODINGS {
            assert!(Encoding::for_label(name.as_bytes()).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_catalog_lookup_is_case_insensitive() {
        assert_eq!(catalog_name("utf-8"), Some("UTF-8"));
        assert_eq!(catalog_name("WINDOWS-1252"), Some("windows-1252"));
        assert_eq!(catalog_name("utf-7"), None);
        assert!(is_supported("Auto"));
        assert!(!is_supported("latin-9"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let (text, used) = decode_content(bytes, "ISO-8859-1").unwrap();
        assert_eq!(text, "Société");
        assert_eq!(used, "ISO-8859-1");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFDate,Amount";
        let (text, _) = decode_content(bytes, "UTF-8").unwrap();
        assert_eq!(text, "Date,Amount");
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = decode_content(b"abc", "klingon").unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn test_auto_detects_plain_ascii_as_utf8() {
        let (text, used) = decode_content(b"Date,Payee\n2024-01-01,Shop", "auto").unwrap();
        assert_eq!(used, "UTF-8");
        assert!(text.starts_with("Date"));
    }
}
