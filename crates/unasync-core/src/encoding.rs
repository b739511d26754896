/*!
# Source Encoding

Python source files default to UTF-8 but may declare another encoding with a
coding cookie on one of their first two lines, or start with a UTF-8 byte
order mark. Rewritten files are encoded back with the same encoding so
non-ASCII content survives byte for byte.
*/

use std::borrow::Cow;

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8, X_USER_DEFINED};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Python's names for the 7-bit ASCII codec, after normalization
const ASCII_LABELS: &[&str] = &[
    "ascii",
    "646",
    "us",
    "us-ascii",
    "csascii",
    "cp367",
    "ibm367",
    "iso646-us",
    "iso-ir-6",
    "ansi-x3.4-1968",
    "ansi-x3-4-1968",
    "ansi-x3.4-1986",
    "iso-646.irv-1991",
];

static CODING_COOKIE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\x0C]*#.*?coding[:=][ \t]*([-\w.]+)").expect("valid regex"));

static BLANK_OR_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\x0C]*(?:[#\r\n]|$)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    /// Strict 7-bit ASCII; WHATWG has no such encoding
    Ascii,
    Whatwg(&'static Encoding),
}

/// Encoding of one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding {
    codec: Codec,
    bom: bool,
}

impl SourceEncoding {
    /// Determine the encoding of raw source bytes.
    ///
    /// Returns a human readable message on failure; callers attach the path.
    pub fn detect(bytes: &[u8]) -> Result<Self, String> {
        let bom = bytes.starts_with(UTF8_BOM);
        let body = if bom { &bytes[UTF8_BOM.len()..] } else { bytes };

        let mut lines = body.split_inclusive(|&b| b == b'\n');
        let first = lines.next().unwrap_or_default();
        let mut label = cookie(first);
        if label.is_none() && BLANK_OR_COMMENT.is_match(first) {
            label = lines.next().and_then(cookie);
        }

        let codec = match label {
            Some(label) => lookup(&label).ok_or_else(|| format!("unknown encoding: {label}"))?,
            None => Codec::Whatwg(UTF_8),
        };

        let encoding = Self { codec, bom };
        if bom && codec != Codec::Whatwg(UTF_8) {
            return Err(format!("encoding problem: {} with BOM", encoding.name()));
        }

        Ok(encoding)
    }

    pub fn name(&self) -> &'static str {
        match self.codec {
            Codec::Ascii => "ascii",
            Codec::Whatwg(encoding) => encoding.name(),
        }
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Decode source bytes, refusing malformed input.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, String> {
        let body = if self.bom { &bytes[UTF8_BOM.len()..] } else { bytes };
        match self.codec {
            Codec::Ascii => match body.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(format!(
                    "byte 0x{:02X} at offset {offset} is not valid ascii",
                    body[offset]
                )),
                None => std::str::from_utf8(body)
                    .map(Cow::Borrowed)
                    .map_err(|err| err.to_string()),
            },
            Codec::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(body)
                .ok_or_else(|| format!("source is not valid {}", encoding.name())),
        }
    }

    /// Encode text back, refusing characters the encoding cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, String> {
        let encoded = match self.codec {
            Codec::Ascii if text.is_ascii() => Some(Cow::Borrowed(text.as_bytes())),
            Codec::Ascii => None,
            Codec::Whatwg(encoding) => match encoding.encode(text) {
                (_, _, true) => None,
                (encoded, _, false) => Some(encoded),
            },
        }
        .ok_or_else(|| format!("output contains characters not representable in {}", self.name()))?;

        let mut out = Vec::with_capacity(encoded.len() + UTF8_BOM.len());
        if self.bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(&encoded);
        Ok(out)
    }
}

impl Default for SourceEncoding {
    fn default() -> Self {
        Self {
            codec: Codec::Whatwg(UTF_8),
            bom: false,
        }
    }
}

fn cookie(line: &[u8]) -> Option<String> {
    CODING_COOKIE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Resolve a Python codec name
///
/// WHATWG labels that name something other than Python's codec of the same
/// name are refused rather than silently reinterpreted.
fn lookup(label: &str) -> Option<Codec> {
    let normalized = label.to_ascii_lowercase().replace('_', "-");
    if ASCII_LABELS.contains(&normalized.as_str()) {
        return Some(Codec::Ascii);
    }

    let canonical = match normalized.as_str() {
        "utf-8" | "utf8" => "utf-8",
        n if n.starts_with("utf-8-") => "utf-8",
        "latin-1" | "iso-latin-1" | "latin1" | "l1" => "iso-8859-1",
        "iso-8859-1-windows-3.1-latin-1" => "iso-8859-1",
        n => n,
    };
    Encoding::for_label(canonical.as_bytes())
        .filter(|encoding| ![UTF_16LE, UTF_16BE, REPLACEMENT, X_USER_DEFINED].contains(encoding))
        .map(Codec::Whatwg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn defaults_to_utf8() {
        let enc = SourceEncoding::detect(b"x = 1\n").unwrap();
        assert_eq!(enc, SourceEncoding::default());
    }

    #[test]
    fn reads_cookie_on_first_line() {
        let enc = SourceEncoding::detect(b"# -*- coding: latin-1 -*-\nx = 1\n").unwrap();
        // encoding_rs follows WHATWG, where latin-1 labels resolve to windows-1252
        assert_eq!(enc.codec, Codec::Whatwg(WINDOWS_1252));
    }

    #[test]
    fn reads_cookie_on_second_line() {
        let enc =
            SourceEncoding::detect(b"#!/usr/bin/env python\n# vim: set fileencoding=cp1252 :\n")
                .unwrap();
        assert_eq!(enc.codec, Codec::Whatwg(WINDOWS_1252));
    }

    #[test]
    fn ignores_cookie_after_code() {
        let enc = SourceEncoding::detect(b"x = 1\n# coding: latin-1\n").unwrap();
        assert_eq!(enc.codec, Codec::Whatwg(UTF_8));
    }

    #[test]
    fn rejects_unknown_label() {
        let err = SourceEncoding::detect(b"# coding: klingon\n").unwrap_err();
        assert!(err.contains("klingon"));
    }

    #[test]
    fn bom_round_trips() {
        let source = b"\xEF\xBB\xBFx = '\xC3\xA9'\n";
        let enc = SourceEncoding::detect(source).unwrap();
        assert!(enc.has_bom());
        let text = enc.decode(source).unwrap();
        assert_eq!(text, "x = 'é'\n");
        assert_eq!(enc.encode(&text).unwrap(), source.to_vec());
    }

    #[test]
    fn bom_with_foreign_cookie_is_rejected() {
        assert!(SourceEncoding::detect(b"\xEF\xBB\xBF# coding: latin-1\n").is_err());
    }

    #[test]
    fn latin1_round_trips() {
        let source = b"# coding: latin-1\ns = '\xE9t\xE9'\n";
        let enc = SourceEncoding::detect(source).unwrap();
        let text = enc.decode(source).unwrap();
        assert!(text.contains("été"));
        assert_eq!(enc.encode(&text).unwrap(), source.to_vec());
    }

    #[test]
    fn ascii_cookie_is_strict() {
        let source = b"# coding: ascii\ns = '\xE9'\n";
        let enc = SourceEncoding::detect(source).unwrap();
        assert_eq!(enc.name(), "ascii");
        let err = enc.decode(source).unwrap_err();
        assert!(err.contains("0xE9"));

        let enc = SourceEncoding::detect(b"# -*- coding: US_ASCII -*-\n").unwrap();
        assert_eq!(enc.codec, Codec::Ascii);
        assert_eq!(enc.decode(b"x = 1\n").unwrap(), "x = 1\n");
        assert!(enc.encode("caf\u{e9}").is_err());
    }

    #[test]
    fn labels_python_reads_differently_are_rejected() {
        for label in ["utf-16", "unicode", "x-user-defined", "iso-2022-kr"] {
            let source = format!("# coding: {label}\n");
            assert!(SourceEncoding::detect(source.as_bytes()).is_err(), "{label}");
        }
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let enc = SourceEncoding::default();
        assert!(enc.decode(b"x = '\xFF'\n").is_err());
    }

    #[test]
    fn unmappable_output_is_rejected() {
        let enc = SourceEncoding::detect(b"# coding: latin-1\n").unwrap();
        assert!(enc.encode("snowman \u{2603}").is_err());
    }
}
