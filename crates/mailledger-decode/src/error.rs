//! Error types for MIME decoding.

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding a message.
///
/// Leaf variants describe what went wrong; [`Error::Header`] and
/// [`Error::Part`] wrap them with the header name or the position in the
/// multipart tree where the failure happened.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An encoded-word names a charset no decoder exists for.
    #[error("Unknown charset {charset:?} in header value {header:?}")]
    UnknownCharset {
        /// The charset label as written in the header.
        charset: String,
        /// The original header text.
        header: String,
    },

    /// Media type syntax could not be parsed.
    #[error("Invalid media type {value:?}: {reason}")]
    InvalidMediaType {
        /// The header value that failed to parse.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Content-Disposition label is neither `attachment` nor `inline`.
    #[error("Unknown content disposition: {0:?}")]
    UnknownDisposition(String),

    /// No address could be recovered from an address header.
    #[error("Invalid address list {header:?}: {reason}")]
    InvalidAddressList {
        /// The original header text.
        header: String,
        /// Why the strict parse failed.
        reason: String,
    },

    /// A part could not be classified as body, inline file or attachment.
    #[error("Unknown content type {content_type:?} under {parent:?}")]
    UnknownContentType {
        /// The part's media type.
        content_type: String,
        /// The parent's media type.
        parent: String,
    },

    /// Multipart content type without a boundary parameter.
    #[error("Missing boundary in {0:?}")]
    MissingBoundary(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Quoted-printable decode error.
    #[error("Quoted-printable decode error: {0}")]
    QuotedPrintable(#[from] quoted_printable::QuotedPrintableError),

    /// Failure while parsing a header field.
    #[error("Failed to parse header {name}: {source}")]
    Header {
        /// Header field name.
        name: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Failure inside a multipart part.
    #[error("Failed to decode part {index} (depth {depth}) of {parent}: {source}")]
    Part {
        /// Zero-based index of the part within its parent.
        index: usize,
        /// Multipart nesting depth, 1 for top-level parts.
        depth: usize,
        /// The parent's media type.
        parent: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error with the name of the header being parsed.
    #[must_use]
    pub fn in_header(self, name: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Header { source, .. } | Self::Part { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_context() {
        let err = Error::UnknownDisposition("bogus".into()).in_header("Content-Disposition");
        let err = Error::Part {
            index: 1,
            depth: 2,
            parent: "multipart/mixed".into(),
            source: Box::new(err),
        };
        assert!(matches!(err.root_cause(), Error::UnknownDisposition(label) if label == "bogus"));
        assert!(err.to_string().contains("part 1 (depth 2) of multipart/mixed"));
    }
}
