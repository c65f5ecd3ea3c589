//! Typed header fields.
//!
//! Every known header has a parser with its own fallback policy; unknown
//! headers are kept as decoded strings in [`Headers::extra_headers`].

mod address;
mod date;
mod message_id;

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

pub use address::{Address, parse_address, parse_address_list};
pub use date::{parse_date, zero_date};
pub use message_id::{MessageId, parse_message_id, parse_message_id_list};

use crate::config::{Config, FieldParsers};
use crate::content_type::ContentType;
use crate::decode::decode_header_value;
use crate::disposition::ContentDisposition;
use crate::error::Result;
use crate::header::{MessageSource, canonical_name};

/// Lowercase names of the headers with a dedicated field in [`Headers`].
pub static KNOWN_HEADERS: &[&str] = &[
    "date",
    "sender",
    "from",
    "reply-to",
    "to",
    "cc",
    "bcc",
    "message-id",
    "in-reply-to",
    "references",
    "subject",
    "comments",
    "keywords",
    "resent-date",
    "resent-from",
    "resent-sender",
    "resent-to",
    "resent-cc",
    "resent-bcc",
    "resent-message-id",
    "content-type",
    "content-disposition",
];

/// Checks whether a header name (any case) has a dedicated field.
#[must_use]
pub fn is_known_header(name: &str) -> bool {
    KNOWN_HEADERS.iter().any(|known| known.eq_ignore_ascii_case(name))
}

/// Decoded message headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Headers {
    /// Date, or [`zero_date`] if absent or unparseable.
    pub date: DateTime<FixedOffset>,
    /// Sender.
    pub sender: Option<Address>,
    /// From.
    pub from: Vec<Address>,
    /// Reply-To.
    pub reply_to: Vec<Address>,
    /// To.
    pub to: Vec<Address>,
    /// Cc.
    pub cc: Vec<Address>,
    /// Bcc.
    pub bcc: Vec<Address>,
    /// Message-ID.
    pub message_id: MessageId,
    /// In-Reply-To.
    pub in_reply_to: Vec<MessageId>,
    /// References.
    pub references: Vec<MessageId>,
    /// Subject.
    pub subject: String,
    /// Comments.
    pub comments: String,
    /// Keywords.
    pub keywords: Vec<String>,
    /// Resent-Date.
    pub resent_date: DateTime<FixedOffset>,
    /// Resent-From.
    pub resent_from: Vec<Address>,
    /// Resent-Sender.
    pub resent_sender: Option<Address>,
    /// Resent-To.
    pub resent_to: Vec<Address>,
    /// Resent-Cc.
    pub resent_cc: Vec<Address>,
    /// Resent-Bcc.
    pub resent_bcc: Vec<Address>,
    /// Resent-Message-ID.
    pub resent_message_id: MessageId,
    /// Content-Type, `text/plain` if absent.
    pub content_type: ContentType,
    /// Content-Disposition.
    pub content_disposition: ContentDisposition,
    /// Every other header by canonical name, values decoded, in declaration order.
    pub extra_headers: BTreeMap<String, Vec<String>>,
}

/// Parses a plain text header such as Subject.
///
/// # Errors
///
/// Returns an error if an encoded-word cannot be decoded.
pub fn parse_string(value: &str) -> Result<String> {
    Ok(decode_header_value(value)?.trim().to_string())
}

/// Parses a comma-separated list such as Keywords. Never fails.
///
/// Segments that cannot be decoded are kept as written.
#[must_use]
pub fn parse_string_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|segment| decode_leniently(segment).trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Decodes an unknown header value, keeping the raw text on failure.
#[must_use]
pub fn decode_leniently(value: &str) -> String {
    decode_header_value(value).unwrap_or_else(|err| {
        tracing::warn!(value, %err, "Keeping undecodable header value as written");
        value.to_string()
    })
}

/// Parses a Content-Type value. Empty means `text/plain`.
///
/// # Errors
///
/// Returns an error if the media type is malformed.
pub fn parse_content_type(value: &str) -> Result<ContentType> {
    ContentType::parse(value)
}

/// Parses a Content-Disposition value. Empty means no disposition.
///
/// # Errors
///
/// Returns an error for an unknown label or malformed syntax.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition> {
    ContentDisposition::parse(value)
}

/// Runs one field parser over the joined values of a header.
fn field<T>(source: &impl MessageSource, name: &str, parser: fn(&str) -> Result<T>) -> Result<T> {
    parser(&source.joined_header(name)).map_err(|err| err.in_header(canonical_name(name)))
}

/// Like [`field`], but an absent or blank header yields the default
/// without running the parser.
fn present_field<T: Default>(
    source: &impl MessageSource,
    name: &str,
    parser: fn(&str) -> Result<T>,
) -> Result<T> {
    let value = source.joined_header(name);
    if value.trim().is_empty() {
        return Ok(T::default());
    }
    parser(&value).map_err(|err| err.in_header(canonical_name(name)))
}

fn optional_field<T>(
    source: &impl MessageSource,
    name: &str,
    parser: fn(&str) -> Result<T>,
) -> Result<Option<T>> {
    let value = source.joined_header(name);
    if value.trim().is_empty() {
        return Ok(None);
    }
    parser(&value)
        .map(Some)
        .map_err(|err| err.in_header(canonical_name(name)))
}

/// Parses every header of `source` using the parsers in `config`.
///
/// # Errors
///
/// Returns the first field parser error, wrapped with the header name.
pub fn parse_headers_with(source: &impl MessageSource, config: &Config) -> Result<Headers> {
    let p: &FieldParsers = &config.parsers;

    let mut extra_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in source.header_names() {
        if is_known_header(name) {
            continue;
        }
        let parser = config.extra_parser(name);
        let values = source
            .header_values(name)
            .into_iter()
            .map(|value| parser(value).map_err(|err| err.in_header(canonical_name(name))))
            .collect::<Result<Vec<_>>>()?;
        extra_headers
            .entry(canonical_name(name))
            .or_default()
            .extend(values);
    }

    Ok(Headers {
        date: present_field(source, "date", p.date)?,
        sender: optional_field(source, "sender", p.sender)?,
        from: present_field(source, "from", p.from)?,
        reply_to: present_field(source, "reply-to", p.reply_to)?,
        to: present_field(source, "to", p.to)?,
        cc: present_field(source, "cc", p.cc)?,
        bcc: present_field(source, "bcc", p.bcc)?,
        message_id: field(source, "message-id", p.message_id)?,
        in_reply_to: field(source, "in-reply-to", p.in_reply_to)?,
        references: field(source, "references", p.references)?,
        subject: field(source, "subject", p.subject)?,
        comments: field(source, "comments", p.comments)?,
        keywords: field(source, "keywords", p.keywords)?,
        resent_date: present_field(source, "resent-date", p.resent_date)?,
        resent_from: present_field(source, "resent-from", p.resent_from)?,
        resent_sender: optional_field(source, "resent-sender", p.resent_sender)?,
        resent_to: present_field(source, "resent-to", p.resent_to)?,
        resent_cc: present_field(source, "resent-cc", p.resent_cc)?,
        resent_bcc: present_field(source, "resent-bcc", p.resent_bcc)?,
        resent_message_id: field(source, "resent-message-id", p.resent_message_id)?,
        content_type: field(source, "content-type", p.content_type)?,
        content_disposition: field(source, "content-disposition", p.content_disposition)?,
        extra_headers,
    })
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
    use crate::error::Error;
    use crate::header::RawMessage;

    fn headers(raw: &str) -> Result<Headers> {
        parse_headers_with(&RawMessage::parse(raw.as_bytes()), &Config::default())
    }

    #[test]
    fn test_known_headers() {
        let parsed = headers(concat!(
            "Date: Mon, 2 Jan 2006 15:04:05 -0700\r\n",
            "From: Alice <alice@example.com>\r\n",
            "To: bob@example.com\r\n",
            "To: carol@example.com\r\n",
            "Message-ID: <id-1@example.com>\r\n",
            "References: <a@x> <b@x>\r\n",
            "Subject: =?UTF-8?B?8J+TjSBUZXN0?=\r\n",
            "Keywords: one, =?utf-8?Q?tw=C3=B6?=, ,three\r\n",
            "\r\n",
        ))
        .unwrap();

        assert_eq!(parsed.date.to_rfc3339(), "2006-01-02T15:04:05-07:00");
        assert_eq!(parsed.from, vec![Address::with_name("Alice", "alice@example.com")]);
        assert_eq!(parsed.to.len(), 2);
        assert_eq!(parsed.message_id.as_str(), "id-1@example.com");
        assert_eq!(parsed.references.len(), 2);
        assert_eq!(parsed.subject, "\u{1f4cd} Test");
        assert_eq!(parsed.keywords, vec!["one", "twö", "three"]);
        assert_eq!(parsed.content_type, ContentType::text_plain());
        assert_eq!(parsed.content_disposition, ContentDisposition::default());
    }

    #[test]
    fn test_absent_headers_default() {
        let parsed = headers("X-Nothing: here\r\n\r\n").unwrap();
        assert_eq!(parsed.date, zero_date());
        assert!(parsed.sender.is_none());
        assert!(parsed.from.is_empty());
        assert!(parsed.message_id.is_empty());
        assert!(parsed.keywords.is_empty());
        assert_eq!(parsed.subject, "");
    }

    #[test]
    fn test_bad_date_does_not_fail() {
        let parsed = headers("Date: sometime last week\r\n\r\n").unwrap();
        assert_eq!(parsed.date, zero_date());
    }

    #[test]
    fn test_extra_headers_never_duplicate_known() {
        let parsed = headers(concat!(
            "Subject: hi\r\n",
            "x-mailer: Tool 1.0\r\n",
            "X-Mailer: Tool 2.0\r\n",
            "MIME-Version: 1.0\r\n",
            "X-Tag: =?utf-8?Q?caf=C3=A9?=\r\n",
            "\r\n",
        ))
        .unwrap();

        assert_eq!(
            parsed.extra_headers.get("X-Mailer"),
            Some(&vec!["Tool 1.0".to_string(), "Tool 2.0".to_string()])
        );
        assert_eq!(parsed.extra_headers["X-Tag"], vec!["café"]);
        assert!(parsed.extra_headers.contains_key("Mime-Version"));
        assert!(
            parsed
                .extra_headers
                .keys()
                .all(|name| !is_known_header(name))
        );
    }

    #[test]
    fn test_errors_carry_header_name() {
        let err = headers("Subject: =?bogus-9999?Q?x?=\r\n\r\n").unwrap_err();
        match &err {
            Error::Header { name, .. } => assert_eq!(name, "Subject"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.root_cause(), Error::UnknownCharset { .. }));

        let err = headers("To: nobody here\r\n\r\n").unwrap_err();
        assert!(matches!(err.root_cause(), Error::InvalidAddressList { .. }));

        let err = headers("Content-Disposition: sideways\r\n\r\n").unwrap_err();
        assert!(matches!(err.root_cause(), Error::UnknownDisposition(_)));
    }

    #[test]
    fn test_string_list() {
        assert!(parse_string_list("").is_empty());
        assert_eq!(parse_string_list("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(
            parse_string_list("=?bogus-9999?Q?x?=, ok"),
            vec!["=?bogus-9999?Q?x?=", "ok"]
        );
    }
}
