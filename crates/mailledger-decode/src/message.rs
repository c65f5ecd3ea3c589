//! Decoded email and the parser that produces it.

use std::io::Read;

use crate::config::Config;
use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::error::Result;
use crate::fields::{self, Headers};
use crate::header::{MessageSource, RawMessage};
use crate::walker::{Bodies, Walker, trim_blank_lines};

/// File shown within the message, usually referenced from the HTML body
/// through its Content-ID.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InlineFile {
    /// Content-ID without angle brackets.
    pub content_id: String,
    /// Content type of the file.
    pub content_type: ContentType,
    /// Content disposition of the file.
    pub content_disposition: ContentDisposition,
    /// Decoded content.
    pub data: Vec<u8>,
}

impl InlineFile {
    /// Returns the file name from the disposition, else from the
    /// content-type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        filename(&self.content_type, &self.content_disposition)
    }
}

/// Downloadable file attached to the message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttachedFile {
    /// Content type of the file.
    pub content_type: ContentType,
    /// Content disposition of the file.
    pub content_disposition: ContentDisposition,
    /// Decoded content.
    pub data: Vec<u8>,
}

impl AttachedFile {
    /// Returns the file name from the disposition, else from the
    /// content-type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        filename(&self.content_type, &self.content_disposition)
    }
}

fn filename(content_type: &ContentType, disposition: &ContentDisposition) -> Option<String> {
    disposition
        .filename()
        .or_else(|| content_type.parameter("name"))
        .map(fields::decode_leniently)
}

/// Fully decoded email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Email {
    /// Decoded headers.
    pub headers: Headers,
    /// Concatenated `text/plain` bodies.
    pub text: String,
    /// Concatenated `text/enriched` bodies.
    pub enriched_text: String,
    /// Concatenated `text/html` bodies.
    pub html: String,
    /// Files shown within the message, in document order.
    pub inline_files: Vec<InlineFile>,
    /// Attached files, in document order.
    pub attached_files: Vec<AttachedFile>,
}

impl Email {
    fn new(headers: Headers, bodies: Bodies) -> Self {
        Self {
            headers,
            text: normalize(&bodies.text),
            enriched_text: normalize(&bodies.enriched_text),
            html: normalize(&bodies.html),
            inline_files: bodies.inline_files,
            attached_files: bodies.attached_files,
        }
    }
}

fn normalize(text: &str) -> String {
    trim_blank_lines(&text.replace("\r\n", "\n")).to_string()
}

/// MIME decoding engine.
///
/// A parser holds no state besides its configuration and can be reused
/// for any number of messages.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: Config,
}

impl Parser {
    /// Creates a parser with the given configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the parser configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes a raw message.
    ///
    /// # Errors
    ///
    /// Returns the first header, part or decoding error encountered.
    pub fn parse(&self, raw: &[u8]) -> Result<Email> {
        self.parse_message(&RawMessage::parse(raw))
    }

    /// Reads a raw message to the end and decodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or decoding fails.
    pub fn parse_reader(&self, reader: impl Read) -> Result<Email> {
        self.parse_message(&RawMessage::from_reader(reader)?)
    }

    /// Decodes an already split message.
    ///
    /// # Errors
    ///
    /// Returns the first header, part or decoding error encountered.
    pub fn parse_message(&self, message: &impl MessageSource) -> Result<Email> {
        let headers = self.parse_headers(message)?;
        tracing::debug!(
            content_type = %headers.content_type.media_type(),
            subject = %headers.subject,
            "Decoding message"
        );

        let bodies = Walker::new(&self.config).walk_message(
            message,
            &headers.content_type,
            &headers.content_disposition,
        )?;

        let email = Email::new(headers, bodies);
        tracing::debug!(
            inline_files = email.inline_files.len(),
            attached_files = email.attached_files.len(),
            "Decoded message"
        );
        Ok(email)
    }

    /// Decodes only the headers of a message.
    ///
    /// # Errors
    ///
    /// Returns the first field parser error, wrapped with the header name.
    pub fn parse_headers(&self, source: &impl MessageSource) -> Result<Headers> {
        fields::parse_headers_with(source, &self.config)
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
    use crate::config::{BodyFilter, FileFilter};
    use crate::disposition::DispositionKind;
    use crate::error::Error;

    #[test]
    fn test_single_part_text() {
        let email = Parser::default()
            .parse(b"Subject: Hi\r\nContent-Type: text/plain\r\n\r\nHello, World!\r\n\r\n")
            .unwrap();
        assert_eq!(email.headers.subject, "Hi");
        assert_eq!(email.text, "Hello, World!");
        assert!(email.html.is_empty());
        assert!(email.attached_files.is_empty());
    }

    #[test]
    fn test_missing_content_type_is_plain_text() {
        let email = Parser::default().parse(b"From: a@b.c\n\nbody line\n").unwrap();
        assert_eq!(email.text, "body line");
    }

    #[test]
    fn test_single_part_html_quoted_printable() {
        let email = Parser::default()
            .parse(concat!(
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "<p>caf=C3=A9</p>\r\n",
            ).as_bytes())
            .unwrap();
        assert_eq!(email.html, "<p>café</p>");
        assert!(email.text.is_empty());
    }

    #[test]
    fn test_single_part_attachment_disposition() {
        let email = Parser::default()
            .parse(concat!(
                "Content-Type: text/plain\r\n",
                "Content-Disposition: attachment; filename=notes.txt\r\n",
                "\r\n",
                "remember the milk\r\n",
            ).as_bytes())
            .unwrap();
        assert!(email.text.is_empty());
        assert_eq!(email.attached_files.len(), 1);
        let file = &email.attached_files[0];
        assert_eq!(file.filename().as_deref(), Some("notes.txt"));
        assert_eq!(
            file.content_disposition.kind,
            Some(DispositionKind::Attachment)
        );
    }

    #[test]
    fn test_single_part_binary_is_attachment() {
        let email = Parser::default()
            .parse(concat!(
                "Content-Type: application/octet-stream; name=\"blob.bin\"\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "AAECAw==\r\n",
            ).as_bytes())
            .unwrap();
        assert_eq!(email.attached_files.len(), 1);
        assert_eq!(email.attached_files[0].data, vec![0, 1, 2, 3]);
        assert_eq!(email.attached_files[0].filename().as_deref(), Some("blob.bin"));
    }

    #[test]
    fn test_filters_apply_to_single_part() {
        let parser = Parser::new(
            Config::builder()
                .body_filter(BodyFilter::NO_BODIES)
                .file_filter(FileFilter::NO_FILES)
                .build(),
        );
        let email = parser.parse(b"Content-Type: text/plain\r\n\r\nhidden").unwrap();
        assert!(email.text.is_empty());

        let email = parser
            .parse(b"Content-Type: image/png\r\n\r\n\x89PNG")
            .unwrap();
        assert!(email.attached_files.is_empty());
    }

    #[test]
    fn test_header_error_propagates() {
        let err = Parser::default()
            .parse(b"Content-Type: nonsense\r\n\r\nbody")
            .unwrap_err();
        assert!(matches!(err, Error::Header { ref name, .. } if name == "Content-Type"));
        assert!(matches!(err.root_cause(), Error::InvalidMediaType { .. }));
    }

    #[test]
    fn test_parse_reader() {
        let raw: &[u8] = b"Subject: read\r\n\r\nfrom a reader";
        let email = Parser::default().parse_reader(raw).unwrap();
        assert_eq!(email.headers.subject, "read");
        assert_eq!(email.text, "from a reader");
    }

    #[test]
    fn test_filename_decodes_encoded_words() {
        let file = AttachedFile {
            content_type: ContentType::new("application", "pdf")
                .with_parameter("name", "=?utf-8?Q?r=C3=A9sum=C3=A9.pdf?="),
            content_disposition: ContentDisposition::new(DispositionKind::Attachment),
            data: Vec::new(),
        };
        assert_eq!(file.filename().as_deref(), Some("résumé.pdf"));
    }
}
