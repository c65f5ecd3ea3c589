//! Raw header handling and the header/body split.

use std::fmt;
use std::io::Read;

use crate::error::Result;

/// Access to one message or part: its raw headers and its body bytes.
///
/// Header folding is already resolved by the time values are returned.
pub trait MessageSource {
    /// Returns every raw value of a header, in declaration order.
    fn header_values(&self, name: &str) -> Vec<&str>;

    /// Returns the distinct header names, in order of first declaration.
    fn header_names(&self) -> Vec<&str>;

    /// Returns the body, positioned after the blank line ending the headers.
    fn body(&self) -> &[u8];

    /// Returns all values of a header joined with `", "`, or `""` if absent.
    fn joined_header(&self, name: &str) -> String {
        self.header_values(name).join(", ")
    }
}

/// Ordered, case-insensitive collection of unfolded header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping the name as written.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header in declaration order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns the number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no header fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///   continuation
    /// ```
    ///
    /// Continuation lines are joined to the previous value with a single
    /// space. Parsing stops at the first empty line. Lines without a colon
    /// are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
    }
}

/// Returns a header name in canonical capitalization (`x-mailer` -> `X-Mailer`).
#[must_use]
pub fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// A message or part split into unfolded headers and raw body bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Parsed header fields.
    pub headers: HeaderMap,
    /// Body bytes, still transfer-encoded.
    pub body: Vec<u8>,
}

impl RawMessage {
    /// Splits raw bytes at the first empty line into headers and body.
    ///
    /// Both CRLF and bare LF line endings are accepted. Header bytes that
    /// are not valid UTF-8 are replaced lossily. Input without a blank line
    /// is all headers and has an empty body, unless it begins with a blank
    /// line, in which case it is all body.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let (head, body) = split_at_blank_line(raw);
        let headers = HeaderMap::parse(&String::from_utf8_lossy(head));
        Self {
            headers,
            body: body.to_vec(),
        }
    }

    /// Reads a whole message from a reader and splits it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Ok(Self::parse(&raw))
    }
}

impl MessageSource for RawMessage {
    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    fn header_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in self.headers.iter() {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Finds the end of the header block and the start of the body.
fn split_at_blank_line(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&raw[..0], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&raw[..0], &raw[1..]);
    }

    let mut pos = 0;
    while let Some(offset) = raw[pos..].iter().position(|&b| b == b'\n') {
        let line_end = pos + offset + 1;
        let rest = &raw[line_end..];
        if rest.starts_with(b"\r\n") {
            return (&raw[..line_end], &rest[2..]);
        }
        if rest.starts_with(b"\n") {
            return (&raw[..line_end], &rest[1..]);
        }
        pos = line_end;
    }

    (raw, &raw[raw.len()..])
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

    #[test]
    fn test_headers_add_get() {
        let mut headers = HeaderMap::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_keep_declaration_order() {
        let mut headers = HeaderMap::new();
        headers.add("Received", "first");
        headers.add("To", "alice@example.com");
        headers.add("received", "second");
        assert_eq!(headers.get_all("RECEIVED"), vec!["first", "second"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_headers_parse_unfolds() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test\r\n",
            "\tMessage\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Ignored: body\r\n"
        );

        let headers = HeaderMap::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(headers.get("Ignored"), None);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("x-mailer"), "X-Mailer");
        assert_eq!(canonical_name("MESSAGE-ID"), "Message-Id");
        assert_eq!(canonical_name("x-ms-has-attach"), "X-Ms-Has-Attach");
    }

    #[test]
    fn test_raw_message_split_crlf() {
        let raw = b"Subject: Hi\r\nTo: a@example.com\r\n\r\nLine one\r\n\r\nLine two";
        let message = RawMessage::parse(raw);
        assert_eq!(message.headers.get("subject"), Some("Hi"));
        assert_eq!(message.body, b"Line one\r\n\r\nLine two");
    }

    #[test]
    fn test_raw_message_split_lf() {
        let message = RawMessage::parse(b"Subject: Hi\n\nBody\n");
        assert_eq!(message.headers.get("Subject"), Some("Hi"));
        assert_eq!(message.body, b"Body\n");
    }

    #[test]
    fn test_raw_message_without_body() {
        let message = RawMessage::parse(b"Subject: Hi\r\n");
        assert_eq!(message.headers.get("Subject"), Some("Hi"));
        assert!(message.body.is_empty());

        let message = RawMessage::parse(b"\r\nonly body");
        assert!(message.headers.is_empty());
        assert_eq!(message.body, b"only body");
    }

    #[test]
    fn test_header_names_distinct() {
        let message = RawMessage::parse(b"X-A: 1\r\nx-a: 2\r\nX-B: 3\r\n\r\n");
        assert_eq!(message.header_names(), vec!["X-A", "X-B"]);
        assert_eq!(message.joined_header("x-a"), "1, 2");
        assert_eq!(message.joined_header("missing"), "");
    }
}
