//! MIME content type handling.

use std::collections::HashMap;
use std::fmt;

use crate::decode::transcode;
use crate::error::{Error, Result};

/// Parameters whose values are trimmed and lowercased on parse.
const NORMALIZED_PARAMETERS: &[&str] = &["charset", "micalg", "protocol"];

/// Text body kinds collected into the decoded email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// `text/plain`.
    Plain,
    /// `text/enriched`.
    Enriched,
    /// `text/html`.
    Html,
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lowercase.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lowercase.
    pub sub_type: String,
    /// Parameters keyed by lowercase name (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Creates the default `text/plain` content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter value by lowercase name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Returns the charset parameter if present and non-empty.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset").filter(|c| !c.is_empty())
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn media_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks the type and subtype.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type == main_type && self.sub_type == sub_type
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Returns the text body kind, if this is one of the collected text types.
    #[must_use]
    pub fn text_kind(&self) -> Option<TextKind> {
        if !self.is_text() {
            return None;
        }
        match self.sub_type.as_str() {
            "plain" => Some(TextKind::Plain),
            "enriched" => Some(TextKind::Enriched),
            "html" => Some(TextKind::Html),
            _ => None,
        }
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// An empty value yields `text/plain`. `charset`, `micalg` and `protocol`
    /// values are trimmed and lowercased. RFC 2231 extended and continued
    /// parameters are reassembled.
    ///
    /// # Errors
    ///
    /// Returns an error if the media type is not `type/subtype` made of
    /// valid tokens.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::text_plain());
        }

        let (media, mut parameters) = parse_media(s)?;
        let Some((main_type, sub_type)) = media.split_once('/') else {
            return Err(invalid(s, "missing subtype"));
        };
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());
        if !is_token(main_type) || !is_token(sub_type) {
            return Err(invalid(s, "expected token/token"));
        }

        for name in NORMALIZED_PARAMETERS {
            if let Some(value) = parameters.get_mut(*name) {
                *value = value.trim().to_lowercase();
            }
        }

        Ok(Self {
            main_type: main_type.to_string(),
            sub_type: sub_type.to_string(),
            parameters,
        })
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::text_plain()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        let mut parameters: Vec<_> = self.parameters.iter().collect();
        parameters.sort();
        for (key, value) in parameters {
            if value.is_empty() || !is_token(value) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

pub(crate) fn invalid(value: &str, reason: &str) -> Error {
    Error::InvalidMediaType {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Checks RFC 2045 token syntax.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b))
}

/// Splits `media; k=v; ...` into the lowercased media part and parameters.
///
/// # Errors
///
/// Returns an error if the media part is empty.
pub(crate) fn parse_media(s: &str) -> Result<(String, HashMap<String, String>)> {
    let (media, rest) = s.split_once(';').unwrap_or((s, ""));
    let media = media.trim().to_ascii_lowercase();
    if media.is_empty() {
        return Err(invalid(s, "empty media type"));
    }
    Ok((media, parse_parameters(rest)))
}

/// Parses `; key=value` pairs. Malformed pairs are skipped; the first
/// occurrence of a key wins.
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut raw: Vec<(String, String)> = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ';').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ';') {
            key.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            tracing::warn!(parameter = key.trim(), "Skipping parameter without value");
            continue;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => value.extend(chars.next()),
                    _ => value.push(c),
                }
            }
            if !closed {
                tracing::warn!(parameter = key.trim(), "Unterminated quoted parameter value");
            }
            while chars.next_if(|c| *c != ';').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ';') {
                value.push(c);
            }
            value = value.trim_end().to_string();
        }

        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() || raw.iter().any(|(k, _)| *k == key) {
            continue;
        }
        raw.push((key, value));
    }

    combine_extended(raw)
}

/// One RFC 2231 section of a parameter: `name*N` or `name*N*`.
struct Section {
    index: u32,
    extended: bool,
    value: String,
}

/// Reassembles RFC 2231 parameters (`name*=`, `name*0=`, `name*1*=`).
fn combine_extended(raw: Vec<(String, String)>) -> HashMap<String, String> {
    let mut plain = HashMap::new();
    let mut sections: HashMap<String, Vec<Section>> = HashMap::new();

    for (key, value) in raw {
        let Some((name, suffix)) = key.split_once('*') else {
            plain.insert(key, value);
            continue;
        };
        let section = if suffix.is_empty() {
            Section {
                index: 0,
                extended: true,
                value,
            }
        } else {
            let (digits, extended) = suffix
                .strip_suffix('*')
                .map_or((suffix, false), |d| (d, true));
            let Ok(index) = digits.parse() else {
                plain.insert(key, value);
                continue;
            };
            Section {
                index,
                extended,
                value,
            }
        };
        sections.entry(name.to_string()).or_default().push(section);
    }

    for (name, mut parts) in sections {
        parts.sort_by_key(|p| p.index);
        plain.insert(name, decode_sections(&parts));
    }

    plain
}

fn decode_sections(parts: &[Section]) -> String {
    let mut charset = None;
    let mut bytes = Vec::new();

    for (i, part) in parts.iter().enumerate() {
        if !part.extended {
            bytes.extend_from_slice(part.value.as_bytes());
            continue;
        }
        let mut value = part.value.as_str();
        if i == 0 {
            let mut fields = value.splitn(3, '\'');
            if let (Some(cs), Some(_lang), Some(rest)) = (fields.next(), fields.next(), fields.next())
            {
                charset = Some(cs).filter(|c| !c.is_empty());
                value = rest;
            }
        }
        bytes.extend(percent_decode(value));
    }

    charset
        .and_then(|label| transcode(&bytes, label))
        .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned())
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
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
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/HTML; Charset=\" UTF-8 \"").unwrap();
        assert_eq!(ct.media_type(), "text/html");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.text_kind(), Some(TextKind::Html));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123;x\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123;x"));
    }

    #[test]
    fn test_normalized_parameters() {
        let ct = ContentType::parse(
            "multipart/signed; micalg=PGP-SHA256; protocol=\"Application/PGP-Signature\"; boundary=AbC",
        )
        .unwrap();
        assert_eq!(ct.parameter("micalg"), Some("pgp-sha256"));
        assert_eq!(ct.parameter("protocol"), Some("application/pgp-signature"));
        assert_eq!(ct.boundary(), Some("AbC"));
    }

    #[test]
    fn test_empty_defaults_to_text_plain() {
        assert_eq!(ContentType::parse("").unwrap(), ContentType::text_plain());
        assert_eq!(ContentType::parse("   ").unwrap().media_type(), "text/plain");
    }

    #[test]
    fn test_malformed_media_type() {
        assert!(matches!(
            ContentType::parse("text"),
            Err(Error::InvalidMediaType { .. })
        ));
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("te xt/plain").is_err());
        assert!(ContentType::parse("; charset=utf-8").is_err());
    }

    #[test]
    fn test_malformed_parameter_skipped() {
        let ct = ContentType::parse("text/plain; format; charset=us-ascii").unwrap();
        assert_eq!(ct.charset(), Some("us-ascii"));
        assert!(ct.parameter("format").is_none());
    }

    #[test]
    fn test_unterminated_quote_keeps_rest() {
        let ct = ContentType::parse("text/plain; charset=utf-8; name=\"open ended").unwrap();
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.parameter("name"), Some("open ended"));
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let ct = ContentType::parse("application/pdf; name*=utf-8''na%C3%AFve%20file.pdf").unwrap();
        assert_eq!(ct.parameter("name"), Some("naïve file.pdf"));
    }

    #[test]
    fn test_rfc2231_continuations() {
        let ct = ContentType::parse(
            "application/x-stuff; title*1*=%2A%2A%2Afun%2A%2A%2A%20; title*2=\"isn't it!\"; title*0*=us-ascii'en'This%20is%20even%20more%20",
        )
        .unwrap();
        assert_eq!(
            ct.parameter("title"),
            Some("This is even more ***fun*** isn't it!")
        );
    }

    #[test]
    fn test_text_kind() {
        assert_eq!(
            ContentType::new("text", "enriched").text_kind(),
            Some(TextKind::Enriched)
        );
        assert_eq!(ContentType::new("text", "calendar").text_kind(), None);
        assert_eq!(ContentType::new("image", "png").text_kind(), None);
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "utf-8")
            .with_parameter("name", "my file.txt");
        assert_eq!(
            ct.to_string(),
            "text/plain; charset=utf-8; name=\"my file.txt\""
        );
    }
}
