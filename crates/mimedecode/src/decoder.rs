//! Stateful decoder with convenience accessors over the decoded tree.
//!
//! ```
//! use mimedecode::{MailDecoder, MimeDecoder};
//!
//! let mut decoder = MimeDecoder::new();
//! decoder.parse("Subject: Hello\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nHi")?;
//!
//! assert_eq!(decoder.subject()?, "Hello");
//! assert_eq!(decoder.character_set()?, "utf-8");
//! assert_eq!(decoder.body()?.as_deref(), Some("Hi"));
//! # Ok::<(), mimedecode::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::header::HeaderMap;
use crate::message::{MimeNode, decode};
use crate::options::DecodeOptions;
use crate::uuencode::UuFile;

/// Read access to a parsed message.
///
/// Implementors provide [`parse`](MailDecoder::parse) and
/// [`structure`](MailDecoder::structure); the accessors are derived from the
/// top-level node. Every accessor fails with [`Error::NotParsed`] until a
/// parse has succeeded.
pub trait MailDecoder {
    /// Decodes a raw message and keeps the result.
    ///
    /// # Errors
    ///
    /// Returns the decode error; the previous result is discarded either way.
    fn parse(&mut self, raw: &str) -> Result<&MimeNode>;

    /// Returns the last decoded tree, if any.
    fn structure(&self) -> Option<&MimeNode>;

    /// Returns the top-level headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn headers(&self) -> Result<&HeaderMap> {
        Ok(&parsed(self)?.headers)
    }

    /// Returns the trimmed `Subject`, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn subject(&self) -> Result<String> {
        first_header(self, "subject")
    }

    /// Returns the trimmed `To`, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn to(&self) -> Result<String> {
        first_header(self, "to")
    }

    /// Returns the trimmed `From`, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn from(&self) -> Result<String> {
        first_header(self, "from")
    }

    /// Returns the trimmed `Message-ID`, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn message_id(&self) -> Result<String> {
        first_header(self, "message-id")
    }

    /// Returns the trimmed `Date`, or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn date(&self) -> Result<String> {
        first_header(self, "date")
    }

    /// Returns the trimmed raw `Content-Type` header, or an empty string.
    ///
    /// When the header is repeated the last occurrence is used, matching
    /// the one that decided the message type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn content_type(&self) -> Result<String> {
        Ok(parsed(self)?
            .headers
            .get("content-type")
            .map(|value| value.last().trim().to_string())
            .unwrap_or_default())
    }

    /// Returns the `charset=` value of the `Content-Type` header, or an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn character_set(&self) -> Result<String> {
        let content_type = self.content_type()?;
        Ok(extract_charset(&content_type).to_string())
    }

    /// Returns the top-level body as text, if one was kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    fn body(&self) -> Result<Option<String>> {
        Ok(parsed(self)?.body_text())
    }

    /// Extracts attachments from the message.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotImplemented`].
    fn attachments(&self) -> Result<Vec<MimeNode>> {
        Err(Error::NotImplemented("attachment extraction"))
    }
}

/// Returns the parsed tree or [`Error::NotParsed`].
fn parsed<D: MailDecoder + ?Sized>(decoder: &D) -> Result<&MimeNode> {
    decoder.structure().ok_or(Error::NotParsed)
}

/// Returns the first occurrence of a top-level header, trimmed, or an empty
/// string.
fn first_header<D: MailDecoder + ?Sized>(decoder: &D, name: &str) -> Result<String> {
    Ok(parsed(decoder)?.header(name).unwrap_or_default().to_string())
}

/// Finds `charset=` (any case) and returns the run of `[0-9A-Za-z-]` after
/// it, skipping one opening quote.
fn extract_charset(content_type: &str) -> &str {
    const KEY: &str = "charset=";

    let lower = content_type.to_ascii_lowercase();
    let Some(at) = lower.find(KEY) else {
        return "";
    };
    let rest = &content_type[at + KEY.len()..];
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    &rest[..len]
}

/// Decoder that owns its options and the last decoded tree.
#[derive(Debug, Clone, Default)]
pub struct MimeDecoder {
    options: DecodeOptions,
    structure: Option<MimeNode>,
}

impl MimeDecoder {
    /// Creates a decoder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with the given options.
    #[must_use]
    pub const fn with_options(options: DecodeOptions) -> Self {
        Self {
            options,
            structure: None,
        }
    }

    /// Returns the options used for every parse.
    #[must_use]
    pub const fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes raw bytes, replacing invalid UTF-8 sequences first.
    ///
    /// # Errors
    ///
    /// Same as [`MailDecoder::parse`].
    pub fn parse_bytes(&mut self, raw: &[u8]) -> Result<&MimeNode> {
        let text = String::from_utf8_lossy(raw);
        self.parse(&text)
    }

    /// Returns the decoded tree, leaving the decoder unparsed.
    #[must_use]
    pub fn into_structure(self) -> Option<MimeNode> {
        self.structure
    }

    /// Finds uuencoded files in the top-level body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotParsed`] before a successful parse.
    pub fn uuencoded_files(&self) -> Result<Vec<UuFile>> {
        Ok(parsed(self)?.uuencoded_files())
    }
}

impl MailDecoder for MimeDecoder {
    fn parse(&mut self, raw: &str) -> Result<&MimeNode> {
        self.structure = None;
        let node = decode(raw, &self.options)?;
        tracing::debug!(
            content_type = %node.content_type,
            parts = node.parts().len(),
            "decoded message"
        );
        Ok(&*self.structure.insert(node))
    }

    fn structure(&self) -> Option<&MimeNode> {
        self.structure.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MESSAGE: &str = concat!(
        "From: Sender <sender@example.com>\r\n",
        "To:   recipient@example.com  \r\n",
        "Subject: =?ISO-8859-1?Q?Caf=E9?= menu\r\n",
        "Message-ID: <abc@example.com>\r\n",
        "Date: Wed, 20 Jun 2012 10:46:01 +0200\r\n",
        "Content-Type: text/plain; charset=\"ISO-8859-1\"\r\n",
        "\r\n",
        "Body text\r\n"
    );

    #[test]
    fn test_accessors_before_parse() {
        let decoder = MimeDecoder::new();
        assert!(decoder.structure().is_none());
        assert_eq!(decoder.subject().unwrap_err(), Error::NotParsed);
        assert_eq!(decoder.headers().unwrap_err(), Error::NotParsed);
        assert_eq!(decoder.body().unwrap_err(), Error::NotParsed);
        assert_eq!(decoder.character_set().unwrap_err(), Error::NotParsed);
    }

    #[test]
    fn test_accessors_after_parse() {
        let mut decoder = MimeDecoder::new();
        decoder.parse(MESSAGE).unwrap();

        assert_eq!(decoder.from().unwrap(), "Sender <sender@example.com>");
        assert_eq!(decoder.to().unwrap(), "recipient@example.com");
        assert_eq!(decoder.subject().unwrap(), "Caf\u{fffd} menu");
        assert_eq!(decoder.message_id().unwrap(), "<abc@example.com>");
        assert_eq!(decoder.date().unwrap(), "Wed, 20 Jun 2012 10:46:01 +0200");
        assert_eq!(
            decoder.content_type().unwrap(),
            "text/plain; charset=\"ISO-8859-1\""
        );
        assert_eq!(decoder.character_set().unwrap(), "ISO-8859-1");
        assert_eq!(decoder.body().unwrap().as_deref(), Some("Body text\r\n"));
    }

    #[test]
    fn test_missing_headers_are_empty() {
        let mut decoder = MimeDecoder::new();
        decoder.parse("X-Other: 1\n\nbody").unwrap();
        assert_eq!(decoder.subject().unwrap(), "");
        assert_eq!(decoder.content_type().unwrap(), "");
        assert_eq!(decoder.character_set().unwrap(), "");
    }

    #[test]
    fn test_failed_parse_clears_previous_result() {
        let mut decoder = MimeDecoder::new();
        decoder.parse(MESSAGE).unwrap();
        assert_eq!(decoder.parse("").unwrap_err(), Error::EmptyInput);
        assert!(decoder.structure().is_none());
        assert_eq!(decoder.subject().unwrap_err(), Error::NotParsed);
    }

    #[test]
    fn test_attachments_not_implemented() {
        let mut decoder = MimeDecoder::new();
        decoder.parse(MESSAGE).unwrap();
        assert!(matches!(
            decoder.attachments(),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_parse_bytes_replaces_invalid_utf8() {
        let mut decoder = MimeDecoder::new();
        decoder.parse_bytes(b"Subject: caf\xe9\n\nx").unwrap();
        assert_eq!(decoder.subject().unwrap(), "caf\u{fffd}");
    }

    #[test]
    fn test_options_are_applied() {
        let mut decoder =
            MimeDecoder::with_options(DecodeOptions::new().with_include_bodies(false));
        decoder.parse(MESSAGE).unwrap();
        assert_eq!(decoder.body().unwrap(), None);
        assert!(!decoder.options().include_bodies);
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(extract_charset("text/plain; CHARSET=utf-8"), "utf-8");
        assert_eq!(extract_charset("text/plain; charset=\"koi8-r\"; x=y"), "koi8-r");
        assert_eq!(extract_charset("text/plain; charset=utf_8"), "utf");
        assert_eq!(extract_charset("text/plain"), "");
    }

    /// Implements only the two required methods.
    #[derive(Default)]
    struct TreeOnly {
        tree: Option<MimeNode>,
    }

    impl MailDecoder for TreeOnly {
        fn parse(&mut self, raw: &str) -> Result<&MimeNode> {
            self.tree = None;
            let node = decode(raw, &DecodeOptions::default())?;
            Ok(&*self.tree.insert(node))
        }

        fn structure(&self) -> Option<&MimeNode> {
            self.tree.as_ref()
        }
    }

    #[test]
    fn test_accessors_on_minimal_implementor() {
        let mut decoder = TreeOnly::default();
        assert_eq!(decoder.date().unwrap_err(), Error::NotParsed);
        assert_eq!(decoder.content_type().unwrap_err(), Error::NotParsed);

        decoder.parse(MESSAGE).unwrap();
        assert_eq!(decoder.to().unwrap(), "recipient@example.com");
        assert_eq!(decoder.character_set().unwrap(), "ISO-8859-1");
        assert_eq!(decoder.headers().unwrap().len(), 6);

        let boxed: Box<dyn MailDecoder> = Box::new(decoder);
        assert_eq!(boxed.message_id().unwrap(), "<abc@example.com>");
    }

    #[test]
    fn test_uuencoded_files() {
        let mut decoder = MimeDecoder::new();
        assert_eq!(decoder.uuencoded_files().unwrap_err(), Error::NotParsed);
        decoder
            .parse("Subject: f\n\nbegin 644 cat.txt\n#0V%T\n`\nend\n")
            .unwrap();
        let files = decoder.uuencoded_files().unwrap();
        assert_eq!(files[0].filename, "cat.txt");
    }
}
