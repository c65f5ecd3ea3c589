//! # mailledger-decode
//!
//! MIME decoding engine for email.
//!
//! Turns a raw RFC 5322 message into an [`Email`]: typed headers, the
//! plain, enriched and HTML bodies, inline files and attached files.
//!
//! ## Features
//!
//! - **Headers**: typed parsing of dates, addresses, message ids and text
//!   fields, with RFC 2047 encoded-word decoding
//! - **Bodies**: base64 and quoted-printable transfer decoding, charset
//!   transcoding to UTF-8
//! - **Multipart**: recursive traversal of mixed, alternative, related and
//!   parallel messages
//! - **Configuration**: body and file filters, per-header parser overrides
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailledger_decode::parse;
//!
//! let raw = b"From: Alice <alice@example.com>\r\n\
//!             Subject: Test\r\n\
//!             Content-Type: text/plain; charset=utf-8\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let email = parse(raw)?;
//! println!("From: {}", email.headers.from[0]);
//! println!("Body: {}", email.text);
//! ```
//!
//! ### Configuring the Parser
//!
//! ```ignore
//! use mailledger_decode::{BodyFilter, Config, FileFilter, Parser};
//!
//! let config = Config::builder()
//!     .body_filter(BodyFilter(|ct| ct.sub_type == "plain"))
//!     .file_filter(FileFilter::NO_FILES)
//!     .build();
//!
//! let email = Parser::new(config).parse(raw)?;
//! ```
//!
//! ## Limits
//!
//! Multipart recursion follows the nesting of the input with no depth cap,
//! and every body is read fully into memory. Bound the size of untrusted
//! input before parsing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod classify;
mod config;
mod content_type;
mod disposition;
mod error;
mod header;
mod message;
mod multipart;
mod walker;

pub mod decode;
pub mod fields;

pub use classify::{Classification, classify};
pub use config::{
    AddressListParser, AddressParser, BodyFilter, Config, ConfigBuilder, ContentTypeParser,
    DateParser, DispositionParser, ExtraHeaderParser, FieldParsers, FileFilter,
    MessageIdListParser, MessageIdParser, StringListParser, StringParser,
};
pub use content_type::{ContentType, TextKind};
pub use decode::TransferEncoding;
pub use disposition::{ContentDisposition, DispositionKind};
pub use error::{Error, Result};
pub use fields::{Address, Headers, MessageId};
pub use header::{HeaderMap, MessageSource, RawMessage};
pub use message::{AttachedFile, Email, InlineFile, Parser};
pub use multipart::{MultipartReader, PartReader};

/// Decodes a raw message with the default configuration.
///
/// # Errors
///
/// Returns the first header, part or decoding error encountered.
pub fn parse(raw: &[u8]) -> Result<Email> {
    Parser::default().parse(raw)
}

/// Decodes only the headers of a message with the default parsers.
///
/// # Errors
///
/// Returns the first field parser error, wrapped with the header name.
pub fn parse_headers(source: &impl MessageSource) -> Result<Headers> {
    Parser::default().parse_headers(source)
}
