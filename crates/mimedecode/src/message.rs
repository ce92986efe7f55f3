//! The decoded message tree and the recursive decoder that builds it.

use crate::boundary::split_parts;
use crate::content_type::{ContentType, Dispatch};
use crate::encoding::{TransferEncoding, decode_body};
use crate::error::{Error, Result};
use crate::header::{HeaderMap, split_fields, split_header_body};
use crate::options::DecodeOptions;
use crate::params::{Parameters, parse_header_value};
use crate::rfc2047::decode_encoded_words;
use crate::uuencode::{UuFile, uudecode};

/// One node of a decoded message.
///
/// Leaves carry a `body`; multipart and `message/rfc822` nodes carry
/// `parts`. A `message/rfc822` node may carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MimeNode {
    /// Headers keyed by lower-cased name.
    pub headers: HeaderMap,
    /// Content type, or the inherited default when none was declared.
    pub content_type: ContentType,
    /// `Content-Disposition` value, if present.
    pub disposition: Option<String>,
    /// `Content-Disposition` parameters.
    pub disposition_parameters: Parameters,
    /// Declared transfer encoding (`7bit` when absent).
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_display"))]
    pub transfer_encoding: TransferEncoding,
    /// Body bytes, transfer-decoded when `decode_bodies` is set.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_body"))]
    pub body: Option<Vec<u8>>,
    /// Child parts in order.
    pub parts: Option<Vec<Part>>,
}

/// A child of a multipart or `message/rfc822` node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Part {
    /// A decoded child.
    Node(MimeNode),
    /// A child whose subtree could not be decoded.
    Failed {
        /// Why decoding stopped.
        error: Error,
    },
}

impl Part {
    /// Returns the decoded node, if decoding succeeded.
    #[must_use]
    pub const fn node(&self) -> Option<&MimeNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the error, if decoding failed.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Node(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    fn from_result(result: Result<MimeNode>) -> Self {
        match result {
            Ok(node) => Self::Node(node),
            Err(error) => {
                tracing::warn!(%error, "part could not be decoded");
                Self::Failed { error }
            }
        }
    }
}

/// Decodes a raw message into a tree.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if `raw` is empty.
/// - [`Error::MalformedMessage`] if there is no blank line and the first
///   line is not a header field.
/// - [`Error::MalformedHeader`] if a top-level header line has no `:`.
/// - [`Error::MissingBoundary`] if the top-level type is multipart without
///   a boundary.
///
/// Errors inside child parts do not fail the decode; they are recorded as
/// [`Part::Failed`].
pub fn decode(raw: &str, options: &DecodeOptions) -> Result<MimeNode> {
    if raw.is_empty() {
        return Err(Error::EmptyInput);
    }

    let (header, body) = split_header_body(raw);
    if header.len() == raw.len() {
        let first_line = raw.lines().next().unwrap_or_default();
        if !first_line.contains(':') {
            return Err(Error::MalformedMessage);
        }
    }

    MimeNode::decode(header, body, &ContentType::text_plain(), options)
}

impl MimeNode {
    /// Decodes one node from its header block and body.
    ///
    /// `default_type` applies when the node declares no `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] or [`Error::MissingBoundary`] for
    /// structural problems at this node.
    pub fn decode(
        header: &str,
        body: &str,
        default_type: &ContentType,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let fields = split_fields(header)?;

        let mut headers = HeaderMap::new();
        let mut content_type_value = None;
        let mut disposition_value = None;
        let mut encoding_value = None;
        for (name, value) in &fields {
            if options.decode_headers {
                headers.append(name, decode_encoded_words(value));
            } else {
                headers.append(name, value.as_str());
            }
            match name.to_lowercase().as_str() {
                "content-type" => content_type_value = Some(value.as_str()),
                "content-disposition" => disposition_value = Some(value.as_str()),
                "content-transfer-encoding" => encoding_value = Some(value.as_str()),
                _ => {}
            }
        }

        let (content_type, dispatch) = match content_type_value {
            Some(value) => match ContentType::parse(value, options.decode_headers) {
                (Some(content_type), _) => {
                    let dispatch = content_type.dispatch();
                    (content_type, dispatch)
                }
                (None, parameters) => {
                    let content_type = ContentType {
                        parameters,
                        ..default_type.clone()
                    };
                    (content_type, Dispatch::Leaf)
                }
            },
            None => (default_type.clone(), Dispatch::Leaf),
        };

        let (disposition, disposition_parameters) = disposition_value
            .map(|value| parse_header_value(value, options.decode_headers))
            .map_or((None, Parameters::new()), |parsed| {
                (Some(parsed.value), parsed.parameters)
            });

        let transfer_encoding = encoding_value.map_or(TransferEncoding::SevenBit, |value| {
            TransferEncoding::parse(&parse_header_value(value, options.decode_headers).value)
        });

        tracing::debug!(
            content_type = %content_type,
            ?dispatch,
            %transfer_encoding,
            "resolved part type"
        );

        let mut node = Self {
            headers,
            content_type,
            disposition,
            disposition_parameters,
            transfer_encoding,
            body: None,
            parts: None,
        };

        match dispatch {
            Dispatch::Leaf => {
                if options.include_bodies {
                    node.body = Some(node.body_bytes(body, options));
                }
            }
            Dispatch::Multipart => {
                node.parts = Some(node.decode_multipart(body, options)?);
            }
            Dispatch::Rfc822 => {
                if options.rfc822_bodies {
                    node.body = Some(node.body_bytes(body, options));
                }
                let (nested_header, nested_body) = split_header_body(body);
                let nested = Self::decode(
                    nested_header,
                    nested_body,
                    &ContentType::text_plain(),
                    options,
                );
                node.parts = Some(vec![Part::from_result(nested)]);
            }
        }

        Ok(node)
    }

    fn body_bytes(&self, body: &str, options: &DecodeOptions) -> Vec<u8> {
        if options.decode_bodies {
            decode_body(body, self.transfer_encoding)
        } else {
            body.as_bytes().to_vec()
        }
    }

    fn decode_multipart(&self, body: &str, options: &DecodeOptions) -> Result<Vec<Part>> {
        let boundary = self
            .content_type
            .boundary()
            .filter(|boundary| !boundary.is_empty())
            .ok_or_else(|| Error::MissingBoundary(self.content_type.mime_type()))?;

        let child_default = if self.content_type.is_digest() {
            ContentType::message_rfc822()
        } else {
            ContentType::text_plain()
        };

        let parts = split_parts(body, boundary)
            .into_iter()
            .map(|raw| {
                let (header, body) = split_header_body(raw);
                Part::from_result(Self::decode(header, body, &child_default, options))
            })
            .collect();
        Ok(parts)
    }

    /// Gets the first value of a header, trimmed.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_first(name).map(str::trim)
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// Returns the child parts, or an empty slice for leaves.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        self.parts.as_deref().unwrap_or_default()
    }

    /// Checks if this node was split into parts.
    #[must_use]
    pub const fn has_parts(&self) -> bool {
        self.parts.is_some()
    }

    /// Finds uuencoded files in this node's body.
    #[must_use]
    pub fn uuencoded_files(&self) -> Vec<UuFile> {
        self.body_text()
            .map(|text| uudecode(&text))
            .unwrap_or_default()
    }
}

#[cfg(feature = "serde")]
fn serialize_display<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

#[cfg(feature = "serde")]
#[allow(clippy::ref_option)] // Signature fixed by serde's serialize_with
fn serialize_body<S>(body: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match body {
        Some(bytes) => serializer.serialize_some(&String::from_utf8_lossy(bytes)),
        None => serializer.serialize_none(),
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

    fn decode_default(raw: &str) -> MimeNode {
        decode(raw, &DecodeOptions::default()).unwrap()
    }

    #[test]
    fn test_single_part() {
        let node = decode_default(concat!(
            "From: sender@example.com\r\n",
            "Subject: Test\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "Hello, World!"
        ));

        assert_eq!(node.header("subject"), Some("Test"));
        assert_eq!(node.content_type.primary, "text");
        assert_eq!(node.content_type.secondary, "plain");
        assert_eq!(node.content_type.charset(), Some("utf-8"));
        assert_eq!(node.body_text().as_deref(), Some("Hello, World!"));
        assert!(node.parts.is_none());
    }

    #[test]
    fn test_missing_content_type_defaults_to_text_plain() {
        let node = decode_default("Subject: x\n\nbody");
        assert_eq!(node.content_type, ContentType::text_plain());
        assert_eq!(node.body.as_deref(), Some(&b"body"[..]));
    }

    #[test]
    fn test_unparseable_content_type_is_a_leaf() {
        let node = decode_default("Content-Type: nonsense; charset=latin1\n\nbody");
        assert_eq!(node.content_type.mime_type(), "text/plain");
        assert_eq!(node.content_type.charset(), Some("latin1"));
        assert_eq!(node.body_text().as_deref(), Some("body"));
    }

    #[test]
    fn test_body_decoding_flags() {
        let raw = "Content-Transfer-Encoding: base64\n\nVGVzdA==";

        let decoded = decode(raw, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.body.as_deref(), Some(&b"Test"[..]));

        let raw_kept = decode(raw, &DecodeOptions::new().with_decode_bodies(false)).unwrap();
        assert_eq!(raw_kept.body.as_deref(), Some(&b"VGVzdA=="[..]));

        let omitted = decode(raw, &DecodeOptions::new().with_include_bodies(false)).unwrap();
        assert!(omitted.body.is_none());
    }

    #[test]
    fn test_transfer_encoding_header_is_parsed() {
        let node = decode_default("Content-Transfer-Encoding: Quoted-Printable ; x=y\n\nA=3DB");
        assert_eq!(node.transfer_encoding, TransferEncoding::QuotedPrintable);
        assert_eq!(node.body_text().as_deref(), Some("A=B"));
    }

    #[test]
    fn test_disposition() {
        let node = decode_default(concat!(
            "Content-Type: application/pdf\n",
            "Content-Disposition: attachment; filename=\"report.pdf\"\n",
            "\n",
            "%PDF"
        ));
        assert_eq!(node.disposition.as_deref(), Some("attachment"));
        assert_eq!(node.disposition_parameters.get("filename"), Some("report.pdf"));
        assert_eq!(node.body_text().as_deref(), Some("%PDF"));
    }

    #[test]
    fn test_multipart() {
        let node = decode_default(concat!(
            "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
            "\r\n",
            "preamble\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "<p>caf=C3=A9</p>\r\n",
            "--b1--\r\n"
        ));

        assert!(node.body.is_none());
        let parts = node.parts();
        assert_eq!(parts.len(), 2);

        let plain = parts[0].node().unwrap();
        assert_eq!(plain.content_type.mime_type(), "text/plain");
        assert_eq!(plain.body_text().as_deref(), Some("plain\r\n"));

        let html = parts[1].node().unwrap();
        assert_eq!(html.content_type.mime_type(), "text/html");
        assert_eq!(html.body_text().as_deref(), Some("<p>café</p>\r\n"));
    }

    #[test]
    fn test_multipart_child_without_headers() {
        let node = decode_default("Content-Type: multipart/mixed; boundary=x\n\n--x\n\nbare\n--x--\n");
        let child = node.parts()[0].node().unwrap();
        assert!(child.headers.is_empty());
        assert_eq!(child.content_type, ContentType::text_plain());
        assert_eq!(child.body_text().as_deref(), Some("bare\n"));
    }

    #[test]
    fn test_digest_children_default_to_rfc822() {
        let node = decode_default(concat!(
            "Content-Type: multipart/digest; boundary=d\n",
            "\n",
            "--d\n",
            "\n",
            "Subject: inner\n",
            "\n",
            "inner body\n",
            "--d--\n"
        ));
        let child = node.parts()[0].node().unwrap();
        assert_eq!(child.content_type, ContentType::message_rfc822());
        // Without a Content-Type header the inherited type is kept as a leaf.
        assert!(child.parts.is_none());
        assert_eq!(child.body_text().as_deref(), Some("Subject: inner\n\ninner body\n"));
    }

    #[test]
    fn test_missing_boundary_at_top_level() {
        let err = decode("Content-Type: multipart/mixed\n\nbody", &DecodeOptions::new())
            .unwrap_err();
        assert_eq!(err, Error::MissingBoundary("multipart/mixed".to_string()));
    }

    #[test]
    fn test_missing_boundary_in_child_is_localized() {
        let node = decode_default(concat!(
            "Content-Type: multipart/mixed; boundary=outer\n",
            "\n",
            "--outer\n",
            "Content-Type: multipart/alternative\n",
            "\n",
            "broken\n",
            "--outer\n",
            "Content-Type: text/plain\n",
            "\n",
            "fine\n",
            "--outer--\n"
        ));

        let parts = node.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0].error(),
            Some(&Error::MissingBoundary("multipart/alternative".to_string()))
        );
        assert_eq!(parts[1].node().unwrap().body_text().as_deref(), Some("fine\n"));
    }

    #[test]
    fn test_malformed_header_in_child_is_localized() {
        let node = decode_default(concat!(
            "Content-Type: multipart/mixed; boundary=z\n",
            "\n",
            "--z\n",
            "no colon here\n",
            "\n",
            "x\n",
            "--z--\n"
        ));
        assert!(matches!(
            node.parts()[0].error(),
            Some(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_rfc822_nested_message() {
        let raw = concat!(
            "Content-Type: message/rfc822\n",
            "\n",
            "Subject: =?utf-8?Q?nested?=\n",
            "Content-Type: text/plain\n",
            "\n",
            "inner"
        );

        let node = decode_default(raw);
        assert!(node.body.is_none());
        let nested = node.parts()[0].node().unwrap();
        assert_eq!(nested.header("subject"), Some("nested"));
        assert_eq!(nested.body_text().as_deref(), Some("inner"));

        let with_body = decode(raw, &DecodeOptions::new().with_rfc822_bodies(true)).unwrap();
        assert_eq!(
            with_body.body_text().as_deref(),
            Some("Subject: =?utf-8?Q?nested?=\nContent-Type: text/plain\n\ninner")
        );
        assert_eq!(with_body.parts().len(), 1);
    }

    #[test]
    fn test_rfc822_body_kept_even_without_include_bodies() {
        let options = DecodeOptions::new()
            .with_include_bodies(false)
            .with_rfc822_bodies(true);
        let node = decode("Content-Type: message/rfc822\n\nSubject: a\n\nb", &options).unwrap();
        assert!(node.body.is_some());
        let nested = node.parts()[0].node().unwrap();
        assert!(nested.body.is_none());
    }

    #[test]
    fn test_header_decoding_flag() {
        let raw = "Subject: =?utf-8?B?VGVzdA==?=\n\nx";
        assert_eq!(decode_default(raw).header("subject"), Some("Test"));

        let kept = decode(raw, &DecodeOptions::new().with_decode_headers(false)).unwrap();
        assert_eq!(kept.header("subject"), Some("=?utf-8?B?VGVzdA==?="));
    }

    #[test]
    fn test_top_level_errors() {
        let options = DecodeOptions::new();
        assert_eq!(decode("", &options).unwrap_err(), Error::EmptyInput);
        assert_eq!(
            decode("just some text", &options).unwrap_err(),
            Error::MalformedMessage
        );
        assert_eq!(
            decode("Subject: ok\nbroken line\n\nbody", &options).unwrap_err(),
            Error::MalformedHeader("broken line".to_string())
        );
    }

    #[test]
    fn test_headers_only_message() {
        let node = decode_default("Subject: only headers");
        assert_eq!(node.header("subject"), Some("only headers"));
        assert_eq!(node.body.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn test_uuencoded_files_in_body() {
        let node = decode_default("Subject: uu\n\nsee attached\nbegin 644 cat.txt\n#0V%T\n`\nend\n");
        let files = node.uuencoded_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].data, b"Cat");
    }
}
