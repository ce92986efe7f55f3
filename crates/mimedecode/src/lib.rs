//! # mimedecode
//!
//! Recursive decoder that turns a raw RFC 5322 / MIME message into a tree of
//! headers, content types, and decoded bodies.
//!
//! ## Features
//!
//! - **Header parsing**: Unfolding, duplicate fields, RFC 2047 encoded-words
//! - **Parameters**: Quoted values, escapes, RFC 2231 continuations
//! - **Multipart**: Boundary splitting with per-part error isolation
//! - **Nested messages**: `message/rfc822` and `multipart/digest`
//! - **Transfer encodings**: Base64 and Quoted-Printable bodies
//! - **Uuencode**: Extraction of legacy uuencoded blocks
//!
//! ## Quick Start
//!
//! ```
//! use mimedecode::{DecodeOptions, decode};
//!
//! let raw = "From: sender@example.com\r\n\
//!            Subject: =?utf-8?Q?Caf=C3=A9?=\r\n\
//!            Content-Type: multipart/alternative; boundary=\"b\"\r\n\
//!            \r\n\
//!            --b\r\n\
//!            Content-Type: text/plain\r\n\
//!            \r\n\
//!            Hello\r\n\
//!            --b--\r\n";
//!
//! let message = decode(raw, &DecodeOptions::default())?;
//! assert_eq!(message.header("subject"), Some("Café"));
//!
//! let part = message.parts()[0].node().unwrap();
//! assert_eq!(part.content_type.mime_type(), "text/plain");
//! assert_eq!(part.body_text().as_deref(), Some("Hello\r\n"));
//! # Ok::<(), mimedecode::Error>(())
//! ```
//!
//! ## Stateful Decoding
//!
//! [`MimeDecoder`] keeps the last result and offers header accessors through
//! the [`MailDecoder`] trait:
//!
//! ```
//! use mimedecode::{MailDecoder, MimeDecoder};
//!
//! let mut decoder = MimeDecoder::new();
//! decoder.parse("Subject:  Weekly report \r\n\r\nSee attached.")?;
//! assert_eq!(decoder.subject()?, "Weekly report");
//! # Ok::<(), mimedecode::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod boundary;
mod content_type;
mod decoder;
mod error;
mod header;
mod message;
mod options;
mod params;
mod rfc2047;
mod uuencode;

pub mod encoding;

pub use boundary::split_parts;
pub use content_type::ContentType;
pub use decoder::{MailDecoder, MimeDecoder};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::{HeaderMap, HeaderValue, split_fields, split_header_body};
pub use message::{MimeNode, Part, decode};
pub use options::DecodeOptions;
pub use params::{Parameters, ParsedValue, parse_header_value};
pub use rfc2047::decode_encoded_words;
pub use uuencode::{UuFile, uudecode};
