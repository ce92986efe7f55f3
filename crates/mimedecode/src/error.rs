//! Error types for MIME decoding.

/// Result type alias for MIME decoding.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME decoding errors.
///
/// Transfer-encoding and encoded-word decoding never produce an error;
/// malformed input there is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No input was given.
    #[error("No input given")]
    EmptyInput,

    /// The header block could not be separated from the body.
    #[error("Could not split header and body")]
    MalformedMessage,

    /// A header line has no `:` separator.
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    /// A multipart content type declared no boundary parameter.
    #[error("No boundary found for {0} part")]
    MissingBoundary(String),

    /// An accessor was called before a successful parse.
    #[error("Message has not been parsed; call parse() first")]
    NotParsed,

    /// The requested operation has no implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
