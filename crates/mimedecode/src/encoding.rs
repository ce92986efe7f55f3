//! Transfer-encoding utilities.
//!
//! Decoding here is best-effort: malformed escapes are left as literal text
//! and stray characters in Base64 input are skipped, so none of these
//! functions can fail.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;
use std::fmt::Write as _;

/// Base64 engine that accepts missing padding and non-canonical trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` token.
    ///
    /// Unrecognized tokens fall back to `7bit`, which decodes as a passthrough.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Decodes a body according to its transfer encoding.
#[must_use]
pub fn decode_body(body: &str, encoding: TransferEncoding) -> Vec<u8> {
    match encoding {
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        TransferEncoding::Base64 => decode_base64(body),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            body.as_bytes().to_vec()
        }
    }
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// Whitespace, padding and any other byte outside the Base64 alphabet is
/// skipped. A dangling final character that cannot form a byte is dropped.
#[must_use]
pub fn decode_base64(data: &str) -> Vec<u8> {
    let mut cleaned: Vec<u8> = data
        .bytes()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }
    LENIENT.decode(&cleaned).unwrap_or_default()
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Encodes bytes that are not printable ASCII or would interfere
/// with email transmission.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();
    let mut line_length = 0;

    for byte in text.as_bytes() {
        if line_length >= MAX_LINE_LENGTH - 3 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        match byte {
            b'!'..=b'<' | b'>'..=b'~' | b' ' => {
                result.push(char::from(*byte));
                line_length += 1;
            }
            _ => {
                let _ = write!(result, "={byte:02X}");
                line_length += 3;
            }
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Soft line breaks (`=CRLF` and `=LF`) are removed first, then every
/// `=XX` hex escape is replaced by its byte. An `=` that does not start a
/// valid escape is kept literally.
#[must_use]
pub fn decode_quoted_printable(text: &str) -> Vec<u8> {
    decode_hex_escapes(&strip_soft_breaks(text.as_bytes()))
}

fn strip_soft_breaks(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' {
            match (input.get(i + 1), input.get(i + 2)) {
                (Some(b'\n'), _) => {
                    i += 2;
                    continue;
                }
                (Some(b'\r'), Some(b'\n')) => {
                    i += 3;
                    continue;
                }
                _ => {}
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

/// Replaces each `=XX` hex escape (either case) with the byte it encodes.
pub(crate) fn decode_hex_escapes(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' {
            if let (Some(hi), Some(lo)) = (
                input.get(i + 1).and_then(|b| hex_value(*b)),
                input.get(i + 2).and_then(|b| hex_value(*b)),
            ) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded), data);
    }

    #[test]
    fn test_base64_decode_wrapped_lines() {
        let decoded = decode_base64("SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n");
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_missing_padding() {
        assert_eq!(decode_base64("VGVzdA"), b"Test");
    }

    #[test]
    fn test_base64_decode_garbage_is_skipped() {
        assert_eq!(decode_base64("VG*Vz%dA=="), b"Test");
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
        assert!(encode_quoted_printable("Héllo").contains("=C3=A9"));
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("Hello, World!"), b"Hello, World!");
        assert_eq!(decode_quoted_printable("H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("h=c3=a9llo"), "héllo".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable("Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_malformed_escape_is_literal() {
        assert_eq!(decode_quoted_printable("100=ZZ%"), b"100=ZZ%");
        assert_eq!(decode_quoted_printable("trailing="), b"trailing=");
        assert_eq!(decode_quoted_printable("half=4"), b"half=4");
    }

    #[test]
    fn test_soft_break_removed_before_escapes() {
        // "=4=\n1" becomes "=41" once the soft break is gone.
        assert_eq!(decode_quoted_printable("=4=\n1"), b"A");
    }

    #[test]
    fn test_decode_body_dispatch() {
        assert_eq!(
            decode_body("Caf=C3=A9", TransferEncoding::QuotedPrintable),
            "Café".as_bytes()
        );
        assert_eq!(decode_body("VGVzdA==", TransferEncoding::Base64), b"Test");
        assert_eq!(decode_body("VGVzdA==", TransferEncoding::SevenBit), b"VGVzdA==");
        assert_eq!(decode_body("=41", TransferEncoding::EightBit), b"=41");
    }

    proptest! {
        #[test]
        fn quoted_printable_round_trip(text in "[^=]{0,200}") {
            let first = decode_body(&text, TransferEncoding::QuotedPrintable);
            let first = String::from_utf8(first).unwrap();
            let encoded = encode_quoted_printable(&first);
            let second = decode_body(&encoded, TransferEncoding::QuotedPrintable);
            prop_assert_eq!(second, first.into_bytes());
        }

        #[test]
        fn base64_round_trip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode_base64(&encode_base64(&data)), data);
        }
    }
}
