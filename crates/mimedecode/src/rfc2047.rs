//! RFC 2047 encoded-word decoding for header values.
//!
//! Tokens of the form `=?charset?Q|B?text?=` are replaced in place by their
//! decoded bytes. The charset label is not used for transcoding; the decoded
//! bytes are read back as UTF-8, lossily.

use crate::encoding::{decode_base64, decode_hex_escapes};

/// An encoded-word found in a header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: u8,
    text: &'a str,
    len: usize,
}

impl EncodedWord<'_> {
    fn decode(&self) -> Vec<u8> {
        match self.encoding {
            b'b' | b'B' => decode_base64(self.text),
            _ => {
                let spaced: Vec<u8> = self
                    .text
                    .bytes()
                    .map(|b| if b == b'_' { b' ' } else { b })
                    .collect();
                decode_hex_escapes(&spaced)
            }
        }
    }
}

/// Decodes every encoded-word in `input`.
///
/// Whitespace separating two adjacent encoded-words is dropped. Text that is
/// not a well-formed encoded-word, including words with an encoding other
/// than `Q` or `B`, is copied unchanged.
#[must_use]
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }

    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some((start, word)) = find_encoded_word(rest) {
        let between = &rest[..start];
        if !(after_word && between.chars().all(char::is_whitespace)) {
            out.extend_from_slice(between.as_bytes());
        }
        tracing::trace!(charset = word.charset, "decoding encoded-word");
        out.extend(word.decode());
        rest = &rest[start + word.len..];
        after_word = true;
    }
    out.extend_from_slice(rest.as_bytes());

    String::from_utf8_lossy(&out).into_owned()
}

/// Finds the leftmost well-formed encoded-word in `s`.
fn find_encoded_word(s: &str) -> Option<(usize, EncodedWord<'_>)> {
    s.match_indices("=?")
        .find_map(|(idx, _)| parse_encoded_word(&s[idx..]).map(|word| (idx, word)))
}

fn parse_encoded_word(s: &str) -> Option<EncodedWord<'_>> {
    let body = s.strip_prefix("=?")?;

    let charset_end = body.find('?')?;
    if charset_end == 0 {
        return None;
    }
    let charset = &body[..charset_end];

    let after_charset = &body[charset_end + 1..];
    let encoding = *after_charset.as_bytes().first()?;
    if !matches!(encoding, b'q' | b'Q' | b'b' | b'B') {
        return None;
    }
    let text_region = after_charset[1..].strip_prefix('?')?;

    let text_end = text_region.find('?')?;
    if !text_region[text_end..].starts_with("?=") {
        return None;
    }

    Some(EncodedWord {
        charset,
        encoding,
        text: &text_region[..text_end],
        len: 2 + charset_end + 1 + 2 + text_end + 2,
    })
}
