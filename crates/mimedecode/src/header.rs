//! Header block handling: header/body separation, unfolding, and the
//! ordered header map.

use crate::error::{Error, Result};

/// Splits raw input at the first blank line into `(header, body)`.
///
/// The blank line may use any mix of CRLF and LF terminators. When there is
/// no blank line the whole input is treated as the header block and the body
/// is empty.
#[must_use]
pub fn split_header_body(input: &str) -> (&str, &str) {
    let bytes = input.as_bytes();
    for i in 0..bytes.len() {
        let mut pos = i;
        if bytes[pos] == b'\r' {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'\n') {
            continue;
        }
        pos += 1;
        if bytes.get(pos) == Some(&b'\r') {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'\n') {
            return (&input[..i], &input[pos + 1..]);
        }
    }
    (input, "")
}

/// Splits a raw header block into ordered `(name, value)` fields.
///
/// Line terminators are normalized to CRLF and continuation lines are
/// unfolded: folding whitespace after a trailing `=` (a wrapped encoded-word)
/// is removed, any other folding collapses to a single space. Exactly one
/// space after the `:` is dropped from each value. Duplicate names are kept
/// in their original order.
///
/// # Errors
///
/// Returns [`Error::MalformedHeader`] if a logical line has no `:`.
pub fn split_fields(input: &str) -> Result<Vec<(String, String)>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let unfolded = unfold(input);
    let unfolded = unfolded.trim_matches(PHP_TRIM);
    if unfolded.is_empty() {
        return Ok(Vec::new());
    }

    let fields = unfolded
        .split("\r\n")
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
            let value = value.strip_prefix(' ').unwrap_or(value);
            Ok((name.to_string(), value.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(count = fields.len(), "split header fields");
    Ok(fields)
}

/// Characters stripped from both ends of a header block.
const PHP_TRIM: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

fn unfold(input: &str) -> String {
    let mut lines: Vec<&str> = input.split('\n').collect();
    for line in &mut lines {
        *line = line.strip_suffix('\r').unwrap_or(line);
    }

    let mut out = String::with_capacity(input.len());
    for (idx, line) in lines.iter().enumerate() {
        let folded = line.trim_start_matches([' ', '\t']);
        if idx > 0 && folded.len() < line.len() {
            if out.ends_with('=') {
                out.push_str(folded);
            } else {
                out.push(' ');
                out.push_str(folded);
            }
        } else {
            if idx > 0 {
                out.push_str("\r\n");
            }
            out.push_str(line);
        }
    }
    out
}

/// A header value: a single string, or every occurrence of a repeated field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum HeaderValue {
    /// The field occurred once.
    Single(String),
    /// The field occurred more than once, in original order.
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Returns the first occurrence.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(value) => value,
            Self::Multiple(values) => values.first().map_or("", String::as_str),
        }
    }

    /// Returns the last occurrence.
    #[must_use]
    pub fn last(&self) -> &str {
        match self {
            Self::Single(value) => value,
            Self::Multiple(values) => values.last().map_or("", String::as_str),
        }
    }

    /// Returns every occurrence in order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

/// Ordered header collection keyed by lower-cased field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: Vec<(String, HeaderValue)>,
}

impl HeaderMap {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    ///
    /// The first occurrence of a name is stored as a single value; a second
    /// occurrence promotes it to a sequence.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.push(value),
            None => self.headers.push((name, HeaderValue::Single(value))),
        }
    }

    /// Gets the value stored under a name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Gets the first occurrence of a header.
    #[must_use]
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    /// Gets every occurrence of a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.get(name).map(HeaderValue::all).unwrap_or_default()
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over names and values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HeaderMap {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_split_header_body_crlf() {
        let (header, body) = split_header_body("Subject: Hi\r\nTo: a@b\r\n\r\nBody\r\n");
        assert_eq!(header, "Subject: Hi\r\nTo: a@b");
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_split_header_body_mixed_terminators() {
        assert_eq!(split_header_body("A: 1\n\nB"), ("A: 1", "B"));
        assert_eq!(split_header_body("A: 1\r\n\nB"), ("A: 1", "B"));
        assert_eq!(split_header_body("A: 1\n\r\nB"), ("A: 1", "B"));
    }

    #[test]
    fn test_split_header_body_no_blank_line() {
        assert_eq!(split_header_body("A: 1\r\nB: 2"), ("A: 1\r\nB: 2", ""));
    }

    #[test]
    fn test_split_header_body_leading_newline() {
        // A boundary segment starts with the line break after the delimiter.
        let (header, body) = split_header_body("\r\nContent-Type: text/plain\r\n\r\nPart");
        assert_eq!(header, "\r\nContent-Type: text/plain");
        assert_eq!(body, "Part");

        assert_eq!(split_header_body("\r\n\r\nPart"), ("", "Part"));
    }

    #[test]
    fn test_split_fields() {
        let fields = split_fields("From: sender@example.com\r\nSubject: Test Message").unwrap();
        assert_eq!(
            fields,
            vec![
                field("From", "sender@example.com"),
                field("Subject", "Test Message")
            ]
        );
    }

    #[test]
    fn test_split_fields_unfolds_continuation() {
        let fields = split_fields("Content-Type: text/plain;\r\n\t charset=utf-8\nX: y").unwrap();
        assert_eq!(fields[0], field("Content-Type", "text/plain; charset=utf-8"));
        assert_eq!(fields[1], field("X", "y"));
    }

    #[test]
    fn test_split_fields_joins_wrapped_encoded_word() {
        let fields = split_fields("Subject: =?utf-8?Q?abc=\r\n =3D?=").unwrap();
        assert_eq!(fields[0], field("Subject", "=?utf-8?Q?abc==3D?="));
    }

    #[test]
    fn test_split_fields_drops_exactly_one_space() {
        let fields = split_fields("A:  two\r\nB:none\r\nC:").unwrap();
        assert_eq!(fields[0], field("A", " two"));
        assert_eq!(fields[1], field("B", "none"));
        assert_eq!(fields[2], field("C", ""));
    }

    #[test]
    fn test_split_fields_value_keeps_colons() {
        let fields = split_fields("Date: Wed, 20 Jun 2012 10:46:01 +0200").unwrap();
        assert_eq!(fields[0], field("Date", "Wed, 20 Jun 2012 10:46:01 +0200"));
    }

    #[test]
    fn test_split_fields_missing_colon() {
        let err = split_fields("Subject: ok\r\nnot a header").unwrap_err();
        assert_eq!(err, Error::MalformedHeader("not a header".to_string()));
    }

    #[test]
    fn test_split_fields_empty() {
        assert!(split_fields("").unwrap().is_empty());
        assert!(split_fields("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_header_map_promotes_duplicates() {
        let mut headers = HeaderMap::new();
        headers.append("Received", "from a");
        assert_eq!(
            headers.get("received"),
            Some(&HeaderValue::Single("from a".to_string()))
        );

        headers.append("RECEIVED", "from b");
        headers.append("received", "from c");
        assert_eq!(
            headers.get("Received"),
            Some(&HeaderValue::Multiple(vec![
                "from a".to_string(),
                "from b".to_string(),
                "from c".to_string()
            ]))
        );
        assert_eq!(headers.get_first("received"), Some("from a"));
        assert_eq!(headers.get("received").unwrap().last(), "from c");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_header_map_iter_order() {
        let mut headers = HeaderMap::new();
        headers.append("To", "x");
        headers.append("From", "y");
        headers.append("To", "z");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["to", "from"]);
        assert_eq!(headers.get_all("to"), vec!["x", "z"]);
        assert!(headers.get_all("cc").is_empty());
        assert!(!headers.contains("cc"));
    }

    proptest! {
        #[test]
        fn header_value_survives_split(
            name in "[A-Za-z][A-Za-z0-9-]{0,20}",
            value in "[!-~]([ -~]{0,40}[!-~])?",
        ) {
            let raw = format!("{name}: {value}");
            let fields = split_fields(&raw).unwrap();
            prop_assert_eq!(fields, vec![(name, value)]);
        }
    }
}
