//! Content-Disposition handling.

use std::collections::HashMap;
use std::fmt;

use crate::content_type::{invalid, is_token, parse_media};
use crate::error::{Error, Result};

/// Declared presentation of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DispositionKind {
    /// Offered as a separate download.
    Attachment,
    /// Displayed as part of the message.
    Inline,
}

impl fmt::Display for DispositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attachment => write!(f, "attachment"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

/// Parsed Content-Disposition header.
///
/// The default value (no header, or an empty one) has no kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentDisposition {
    /// Disposition kind, `None` when the header was absent or empty.
    pub kind: Option<DispositionKind>,
    /// Parameters keyed by lowercase name (e.g., filename).
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Creates a disposition of the given kind without parameters.
    #[must_use]
    pub fn new(kind: DispositionKind) -> Self {
        Self {
            kind: Some(kind),
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Checks for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == Some(DispositionKind::Attachment)
    }

    /// Checks for `inline`.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.kind == Some(DispositionKind::Inline)
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }

    /// Parses a Content-Disposition value.
    ///
    /// Format: `attachment; filename="report.pdf"`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDisposition`] for a label other than
    /// `attachment` or `inline`, and [`Error::InvalidMediaType`] for
    /// malformed syntax.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }

        let (label, parameters) = parse_media(s)?;
        if !is_token(&label) {
            return Err(invalid(s, "expected disposition token"));
        }
        let kind = match label.as_str() {
            "attachment" => DispositionKind::Attachment,
            "inline" => DispositionKind::Inline,
            _ => return Err(Error::UnknownDisposition(label)),
        };

        Ok(Self {
            kind: Some(kind),
            parameters,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attachment_with_filename() {
        let cd = ContentDisposition::parse("Attachment; filename=\"report 2024.pdf\"").unwrap();
        assert!(cd.is_attachment());
        assert!(!cd.is_inline());
        assert_eq!(cd.filename(), Some("report 2024.pdf"));
    }

    #[test]
    fn test_parse_inline() {
        let cd = ContentDisposition::parse("inline").unwrap();
        assert_eq!(cd, ContentDisposition::new(DispositionKind::Inline));
    }

    #[test]
    fn test_empty_is_default() {
        let cd = ContentDisposition::parse("  ").unwrap();
        assert_eq!(cd.kind, None);
        assert!(cd.parameters.is_empty());
    }

    #[test]
    fn test_unknown_label_is_error() {
        assert!(matches!(
            ContentDisposition::parse("form-data; name=x"),
            Err(Error::UnknownDisposition(label)) if label == "form-data"
        ));
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(matches!(
            ContentDisposition::parse("attach ment"),
            Err(Error::InvalidMediaType { .. })
        ));
        assert!(ContentDisposition::parse("; filename=a.txt").is_err());
    }

    #[test]
    fn test_rfc2231_filename() {
        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''%E2%82%AC%20rates.txt")
            .unwrap();
        assert_eq!(cd.filename(), Some("€ rates.txt"));
    }
}
