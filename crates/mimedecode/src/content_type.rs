//! MIME content type handling.

use crate::params::{Parameters, parse_header_value};
use std::fmt;

/// Multipart types whose bodies are split on their boundary.
const MULTIPART_TYPES: &[&str] = &[
    "multipart/parallel",
    "multipart/appledouble",
    "multipart/report",
    "multipart/signed",
    "multipart/digest",
    "multipart/alternative",
    "multipart/related",
    "multipart/mixed",
    "application/vnd.wap.multipart.related",
];

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentType {
    /// Primary type (e.g., "text", "multipart"), as written.
    pub primary: String,
    /// Subtype (e.g., "plain", "mixed"), as written.
    pub secondary: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Parameters,
}

/// How a node's body is handled once its type is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Body kept as a leaf.
    Leaf,
    /// Body split on the boundary and each part decoded.
    Multipart,
    /// Body decoded as a nested message.
    Rfc822,
}

impl ContentType {
    /// Creates a content type without parameters.
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            parameters: Parameters::new(),
        }
    }

    /// Creates the `text/plain` default.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Creates the `message/rfc822` default used inside `multipart/digest`.
    #[must_use]
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822")
    }

    /// Parses a `Content-Type` header value.
    ///
    /// Returns the parsed type, or `None` for the type when the primary
    /// value holds no `type/subtype` token. Parameters are returned either
    /// way.
    #[must_use]
    pub fn parse(value: &str, decode_headers: bool) -> (Option<Self>, Parameters) {
        let parsed = parse_header_value(value, decode_headers);
        let content_type = split_mime_type(&parsed.value).map(|(primary, secondary)| Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            parameters: parsed.parameters.clone(),
        });
        (content_type, parsed.parameters)
    }

    /// Returns the lower-cased `type/subtype`.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.primary, self.secondary).to_lowercase()
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary")
    }

    /// Checks if this is one of the multipart types that get split.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        MULTIPART_TYPES.contains(&self.mime_type().as_str())
    }

    /// Checks if this is `multipart/digest`.
    #[must_use]
    pub fn is_digest(&self) -> bool {
        self.mime_type() == "multipart/digest"
    }

    /// Checks if this is `message/rfc822`.
    #[must_use]
    pub fn is_rfc822(&self) -> bool {
        self.mime_type() == "message/rfc822"
    }

    pub(crate) fn dispatch(&self) -> Dispatch {
        if self.is_multipart() {
            Dispatch::Multipart
        } else if self.is_rfc822() {
            Dispatch::Rfc822
        } else {
            Dispatch::Leaf
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.secondary)
    }
}

/// Finds the first `type/subtype` token in `value`.
///
/// Both halves are runs of ASCII alphanumerics and `+ . -`.
fn split_mime_type(value: &str) -> Option<(&str, &str)> {
    let is_token = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-');

    value.match_indices('/').find_map(|(slash, _)| {
        let before = &value[..slash];
        let primary_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_token(*c))
            .last()
            .map(|(idx, _)| idx)?;

        let after = &value[slash + 1..];
        let secondary_len = after
            .char_indices()
            .find(|(_, c)| !is_token(*c))
            .map_or(after.len(), |(idx, _)| idx);
        if secondary_len == 0 {
            return None;
        }

        Some((&value[primary_start..slash], &after[..secondary_len]))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.primary, "text");
        assert_eq!(ct.secondary, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let (ct, params) = ContentType::parse("text/plain; charset=utf-8", false);
        let ct = ct.unwrap();
        assert_eq!(ct.primary, "text");
        assert_eq!(ct.secondary, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(params.get("charset"), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted_boundary() {
        let (ct, _) = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"", false);
        let ct = ct.unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_keeps_case() {
        let (ct, _) = ContentType::parse("Multipart/Mixed; boundary=x", false);
        let ct = ct.unwrap();
        assert_eq!(ct.primary, "Multipart");
        assert_eq!(ct.mime_type(), "multipart/mixed");
        assert_eq!(ct.dispatch(), Dispatch::Multipart);
    }

    #[test]
    fn test_content_type_unparseable() {
        let (ct, params) = ContentType::parse("garbage; charset=us-ascii", false);
        assert!(ct.is_none());
        assert_eq!(params.get("charset"), Some("us-ascii"));
    }

    #[test]
    fn test_split_mime_type_skips_surrounding_text() {
        assert_eq!(
            split_mime_type(" x-foo: application/vnd.ms-excel "),
            Some(("application", "vnd.ms-excel"))
        );
        assert_eq!(split_mime_type("/plain text/html"), Some(("text", "html")));
        assert_eq!(split_mime_type("text/"), None);
    }

    #[test]
    fn test_dispatch() {
        assert_eq!(ContentType::new("text", "html").dispatch(), Dispatch::Leaf);
        assert_eq!(ContentType::new("image", "png").dispatch(), Dispatch::Leaf);
        assert_eq!(
            ContentType::new("multipart", "encrypted").dispatch(),
            Dispatch::Leaf
        );
        assert_eq!(
            ContentType::new("application", "vnd.wap.multipart.related").dispatch(),
            Dispatch::Multipart
        );
        assert_eq!(ContentType::message_rfc822().dispatch(), Dispatch::Rfc822);
        assert!(ContentType::new("multipart", "digest").is_digest());
    }

    #[test]
    fn test_content_type_display() {
        assert_eq!(ContentType::text_plain().to_string(), "text/plain");
    }
}
