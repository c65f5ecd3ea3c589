//! Address header parsing (From, To, Cc, Sender, ...).
//!
//! Parsing degrades in three steps: a strict RFC 5322 address list, a
//! single mailbox, and finally a scan for anything shaped like
//! `local-part@domain`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::decode::decode_header_value;
use crate::error::{Error, Result};

/// A mailbox: optional display name plus address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Address {
    /// Display name, if any.
    pub name: Option<String>,
    /// The `local-part@domain` address.
    pub address: String,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if name.bytes().all(|b| is_atext(b) || b == b' ') => {
                write!(f, "{name} <{}>", self.address)
            }
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            None => write!(f, "{}", self.address),
        }
    }
}

#[allow(clippy::expect_used)]
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*",
    )
    .expect("address pattern is valid")
});

/// Parses an address-list header value.
///
/// # Errors
///
/// Returns [`Error::UnknownCharset`] if encoded-words cannot be decoded,
/// or [`Error::InvalidAddressList`] if no address can be recovered.
pub fn parse_address_list(value: &str) -> Result<Vec<Address>> {
    let decoded = decode_header_value(value)?;

    let reason = match AddressParser::new(&decoded).parse_list() {
        Ok(addresses) => return Ok(addresses),
        Err(reason) => reason,
    };
    tracing::trace!(value, %reason, "Strict address list parse failed");

    if let Ok(address) = AddressParser::new(&decoded).parse_single() {
        return Ok(vec![address]);
    }

    let found = extract_addresses(&decoded);
    if found.is_empty() {
        return Err(invalid_list(value, reason));
    }
    tracing::warn!(value, count = found.len(), "Recovered addresses by pattern");
    Ok(found)
}

/// Parses a single-address header value such as Sender.
///
/// Uses the same fallbacks as [`parse_address_list`] and keeps the first
/// address found.
///
/// # Errors
///
/// Returns [`Error::UnknownCharset`] if encoded-words cannot be decoded,
/// or [`Error::InvalidAddressList`] if no address can be recovered.
pub fn parse_address(value: &str) -> Result<Address> {
    let decoded = decode_header_value(value)?;

    let reason = match AddressParser::new(&decoded).parse_single() {
        Ok(address) => return Ok(address),
        Err(reason) => reason,
    };
    tracing::trace!(value, %reason, "Strict address parse failed");

    AddressParser::new(&decoded)
        .parse_list()
        .ok()
        .and_then(|list| list.into_iter().next())
        .or_else(|| extract_addresses(&decoded).into_iter().next())
        .ok_or_else(|| invalid_list(value, reason))
}

fn invalid_list(value: &str, reason: String) -> Error {
    Error::InvalidAddressList {
        header: value.to_string(),
        reason,
    }
}

fn extract_addresses(text: &str) -> Vec<Address> {
    ADDRESS_PATTERN
        .find_iter(text)
        .map(|m| Address::new(m.as_str()))
        .collect()
}

fn is_atext(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~".contains(&b) || b >= 0x80
}

type ParseResult<T> = std::result::Result<T, String>;

/// Strict RFC 5322 address parser over one decoded header value.
struct AddressParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> AddressParser<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> String {
        format!("{message} at position {}", self.pos)
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Skips whitespace and (nested) comments.
    fn skip_cfws(&mut self) -> ParseResult<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'(') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                b'\\' => self.pos += 1,
                _ => {}
            }
        }
        Err(self.error("unterminated comment"))
    }

    /// `mailbox` followed by end of input.
    fn parse_single(&mut self) -> ParseResult<Address> {
        let address = self.parse_mailbox()?;
        self.skip_cfws()?;
        if self.peek().is_some() {
            return Err(self.error("trailing characters"));
        }
        Ok(address)
    }

    /// `address *("," address)`, tolerating empty list elements.
    fn parse_list(&mut self) -> ParseResult<Vec<Address>> {
        let mut addresses = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                None => break,
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => addresses.extend(self.parse_address()?),
            }
            self.skip_cfws()?;
            match self.peek() {
                None => break,
                Some(b',') => self.pos += 1,
                Some(_) => return Err(self.error("expected ','")),
            }
        }
        if addresses.is_empty() {
            return Err(self.error("no addresses"));
        }
        Ok(addresses)
    }

    /// `mailbox / group`. A group yields its members.
    fn parse_address(&mut self) -> ParseResult<Vec<Address>> {
        let start = self.pos;
        if self.parse_phrase().is_ok() {
            self.skip_cfws()?;
            if self.peek() == Some(b':') {
                self.pos += 1;
                return self.parse_group_members();
            }
        }
        self.pos = start;
        Ok(vec![self.parse_mailbox()?])
    }

    fn parse_group_members(&mut self) -> ParseResult<Vec<Address>> {
        let mut members = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                Some(b';') => {
                    self.pos += 1;
                    return Ok(members);
                }
                Some(b',') => self.pos += 1,
                None => return Err(self.error("unterminated group")),
                Some(_) => members.push(self.parse_mailbox()?),
            }
        }
    }

    /// `name-addr / addr-spec`.
    fn parse_mailbox(&mut self) -> ParseResult<Address> {
        self.skip_cfws()?;
        let start = self.pos;

        let name = if self.peek() == Some(b'<') {
            None
        } else {
            self.parse_phrase().ok()
        };
        self.skip_cfws()?;

        if self.peek() == Some(b'<') {
            self.pos += 1;
            self.skip_cfws()?;
            let address = self.parse_addr_spec()?;
            self.skip_cfws()?;
            self.expect(b'>')?;
            return Ok(Address {
                name: name.filter(|n| !n.is_empty()),
                address,
            });
        }

        self.pos = start;
        let address = self.parse_addr_spec()?;
        Ok(Address::new(address))
    }

    /// One or more words (atoms, quoted strings, obsolete dots).
    fn parse_phrase(&mut self) -> ParseResult<String> {
        let mut words = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                Some(b'"') => words.push(self.parse_quoted_string()?),
                Some(b) if is_atext(b) || b == b'.' => {
                    let start = self.pos;
                    while self.peek().is_some_and(|b| is_atext(b) || b == b'.') {
                        self.pos += 1;
                    }
                    words.push(self.text(start));
                }
                _ => break,
            }
        }
        if words.is_empty() {
            return Err(self.error("expected phrase"));
        }
        Ok(words.join(" "))
    }

    /// `local-part "@" domain`.
    fn parse_addr_spec(&mut self) -> ParseResult<String> {
        let local = if self.peek() == Some(b'"') {
            let quoted = self.parse_quoted_string()?;
            if quoted.bytes().all(|b| is_atext(b) || b == b'.') && !quoted.is_empty() {
                quoted
            } else {
                format!("\"{}\"", quoted.replace('\\', "\\\\").replace('"', "\\\""))
            }
        } else {
            self.parse_dot_atom()?
        };

        self.skip_cfws()?;
        self.expect(b'@')?;
        self.skip_cfws()?;

        let domain = if self.peek() == Some(b'[') {
            self.parse_domain_literal()?
        } else {
            self.parse_dot_atom()?
        };
        Ok(format!("{local}@{domain}"))
    }

    fn parse_dot_atom(&mut self) -> ParseResult<String> {
        let start = self.pos;
        loop {
            let atom_start = self.pos;
            while self.peek().is_some_and(is_atext) {
                self.pos += 1;
            }
            if self.pos == atom_start {
                return Err(self.error("expected atom"));
            }
            if self.peek() == Some(b'.') {
                self.pos += 1;
            } else {
                return Ok(self.text(start));
            }
        }
    }

    fn parse_domain_literal(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.expect(b'[')?;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b']' => return Ok(self.text(start)),
                b'[' | b'\\' => return Err(self.error("invalid domain literal")),
                _ => {}
            }
        }
        Err(self.error("unterminated domain literal"))
    }

    /// Returns the unescaped content of a quoted string.
    fn parse_quoted_string(&mut self) -> ParseResult<String> {
        self.expect(b'"')?;
        let mut content = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'"' => return Ok(String::from_utf8_lossy(&content).into_owned()),
                b'\\' => {
                    if let Some(escaped) = self.peek() {
                        content.push(escaped);
                        self.pos += 1;
                    }
                }
                b'\r' | b'\n' => {}
                _ => content.push(b),
            }
        }
        Err(self.error("unterminated quoted string"))
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

    fn addresses(list: &[Address]) -> Vec<&str> {
        list.iter().map(|a| a.address.as_str()).collect()
    }

    #[test]
    fn test_simple_list() {
        let list = parse_address_list("alice@example.com, Bob <bob@example.com>").unwrap();
        assert_eq!(list[0], Address::new("alice@example.com"));
        assert_eq!(list[1], Address::with_name("Bob", "bob@example.com"));
    }

    #[test]
    fn test_quoted_names_and_comments() {
        let list = parse_address_list(
            "\"Doe, John\" <john@example.com> (work), Jane Q. Public <jane@[192.0.2.1]>",
        )
        .unwrap();
        assert_eq!(list[0].name.as_deref(), Some("Doe, John"));
        assert_eq!(list[0].address, "john@example.com");
        assert_eq!(list[1].name.as_deref(), Some("Jane Q. Public"));
        assert_eq!(list[1].address, "jane@[192.0.2.1]");
    }

    #[test]
    fn test_group_members() {
        let list = parse_address_list("Team: a@example.com, b@example.com;, c@example.com").unwrap();
        assert_eq!(
            addresses(&list),
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
        assert!(parse_address_list("undisclosed-recipients:;, d@example.com").is_ok());
    }

    #[test]
    fn test_encoded_display_name() {
        let list = parse_address_list("=?utf-8?Q?Ren=C3=A9?= <rene@example.com>").unwrap();
        assert_eq!(list[0].name.as_deref(), Some("René"));
    }

    #[test]
    fn test_pattern_fallback() {
        let list =
            parse_address_list("Bad Name <not-an-address>, Good Person <good@example.com>").unwrap();
        assert!(addresses(&list).contains(&"good@example.com"));
        assert!(list.iter().all(|a| a.name.is_none()));
    }

    #[test]
    fn test_unrecoverable_is_error() {
        let err = parse_address_list("nobody here").unwrap_err();
        match err {
            Error::InvalidAddressList { header, .. } => assert_eq!(header, "nobody here"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_charset_propagates() {
        assert!(matches!(
            parse_address_list("=?bogus-9999?Q?x?= <x@example.com>"),
            Err(Error::UnknownCharset { .. })
        ));
    }

    #[test]
    fn test_single_address() {
        let address = parse_address("Sender <sender@example.com>").unwrap();
        assert_eq!(address, Address::with_name("Sender", "sender@example.com"));

        let address = parse_address("a@example.com, b@example.com").unwrap();
        assert_eq!(address.address, "a@example.com");

        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_quoted_local_part() {
        let list = parse_address_list("\"john doe\"@example.com").unwrap();
        assert_eq!(list[0].address, "\"john doe\"@example.com");
        let list = parse_address_list("\"john\"@example.com").unwrap();
        assert_eq!(list[0].address, "john@example.com");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Address::with_name("Bob", "bob@example.com").to_string(),
            "Bob <bob@example.com>"
        );
        assert_eq!(
            Address::with_name("Doe, John", "j@example.com").to_string(),
            "\"Doe, John\" <j@example.com>"
        );
        assert_eq!(Address::new("x@example.com").to_string(), "x@example.com");
    }
}
