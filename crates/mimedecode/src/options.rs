//! Decoding policy flags.

/// Flags that control what the decoder keeps and decodes.
///
/// Fixed for the lifetime of a decode; every node in the tree is built with
/// the same options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[allow(clippy::struct_excessive_bools)] // Independent switches, not a state machine
pub struct DecodeOptions {
    /// Apply the transfer encoding to bodies. When off, bodies hold the raw
    /// encoded text.
    pub decode_bodies: bool,
    /// Store leaf bodies in the tree.
    pub include_bodies: bool,
    /// Decode RFC 2047 encoded-words in header values and parameters.
    pub decode_headers: bool,
    /// Also store the raw body of `message/rfc822` parts alongside the
    /// nested message.
    pub rfc822_bodies: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_bodies: true,
            include_bodies: true,
            decode_headers: true,
            rfc822_bodies: false,
        }
    }
}

impl DecodeOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bodies are transfer-decoded.
    #[must_use]
    pub const fn with_decode_bodies(mut self, value: bool) -> Self {
        self.decode_bodies = value;
        self
    }

    /// Sets whether leaf bodies are stored.
    #[must_use]
    pub const fn with_include_bodies(mut self, value: bool) -> Self {
        self.include_bodies = value;
        self
    }

    /// Sets whether encoded-words in headers are decoded.
    #[must_use]
    pub const fn with_decode_headers(mut self, value: bool) -> Self {
        self.decode_headers = value;
        self
    }

    /// Sets whether `message/rfc822` parts keep their raw body.
    #[must_use]
    pub const fn with_rfc822_bodies(mut self, value: bool) -> Self {
        self.rfc822_bodies = value;
        self
    }
}
