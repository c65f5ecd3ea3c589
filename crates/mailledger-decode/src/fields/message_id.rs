//! Message identifier parsing (Message-ID, In-Reply-To, References).

use std::fmt;

/// Message identifier with angle brackets and whitespace stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MessageId(String);

impl MessageId {
    /// Creates an identifier, stripping surrounding `<>` and whitespace.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(strip(id).to_string())
    }

    /// Returns the identifier without brackets.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

fn strip(id: &str) -> &str {
    id.trim_matches(|c: char| c == '<' || c == '>' || c.is_whitespace())
}

/// Parses a single message identifier. Never fails.
#[must_use]
pub fn parse_message_id(value: &str) -> MessageId {
    MessageId::new(value)
}

/// Parses a list of identifiers separated by commas and/or whitespace.
///
/// Identifiers written back to back (`<a@x><b@x>`) are split as well.
/// Empty tokens are dropped. Never fails.
#[must_use]
pub fn parse_message_id_list(value: &str) -> Vec<MessageId> {
    value
        .replace("><", "> <")
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(strip)
        .filter(|token| !token.is_empty())
        .map(|token| MessageId(token.to_string()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_brackets_and_whitespace() {
        let id = parse_message_id("  <abc123@example.com>\t");
        assert_eq!(id.as_str(), "abc123@example.com");
        assert_eq!(id.to_string(), "<abc123@example.com>");
        assert_eq!(id, MessageId::new("abc123@example.com"));
    }

    #[test]
    fn test_empty_id() {
        assert!(parse_message_id("").is_empty());
        assert!(parse_message_id("<>").is_empty());
    }

    #[test]
    fn test_list_separators() {
        let ids = parse_message_id_list("<a@x>, <b@x>\r\n <c@x><d@x>,,");
        let ids: Vec<&str> = ids.iter().map(MessageId::as_str).collect();
        assert_eq!(ids, vec!["a@x", "b@x", "c@x", "d@x"]);
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_message_id_list("").is_empty());
        assert!(parse_message_id_list(" , <> ").is_empty());
    }
}
