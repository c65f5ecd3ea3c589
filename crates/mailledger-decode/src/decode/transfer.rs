//! Content-Transfer-Encoding removal.
//!
//! Supports Base64 (lenient about line breaks and padding) and
//! Quoted-Printable. The identity encodings pass bytes through.

use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::Result;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from a header value.
    ///
    /// An empty value means 7bit. Unrecognized tokens are treated as 7bit
    /// so the content is passed through rather than lost.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            other => {
                tracing::warn!(encoding = other, "Unknown transfer encoding, passing through");
                Self::SevenBit
            }
        }
    }

    /// Removes this transfer encoding from `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 or Quoted-Printable data is malformed.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(data),
            Self::QuotedPrintable => decode_quoted_printable(data),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Standard alphabet, no padding required, trailing bits tolerated.
const UNPADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64 data as found in message bodies.
///
/// Whitespace is removed first, and padding may be missing or excessive, so
/// `"SGVs\r\nbG8"` and `"SGVsbG8="` decode to the same bytes. Padding
/// inside the stream ends a chunk: each padded chunk is decoded on its own
/// and the results are concatenated.
///
/// # Errors
///
/// Returns an error if a chunk is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let canonical: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let mut decoded = Vec::with_capacity(canonical.len() / 4 * 3);
    for chunk in canonical.split(|b| *b == b'=').filter(|c| !c.is_empty()) {
        UNPADDED.decode_vec(chunk, &mut decoded)?;
    }
    Ok(decoded)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks are removed; malformed escapes are kept literally.
///
/// # Errors
///
/// Returns an error if the decoder rejects the input.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    quoted_printable::decode(data, quoted_printable::ParseMode::Robust).map_err(Into::into)
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
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(""), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_base64_decode() {
        let decoded = decode_base64(b"SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_missing_padding_across_lines() {
        let payload = b"The quick brown fox jumps over the lazy dog.";
        let padded = STANDARD.encode(payload);
        assert!(padded.ends_with('='));

        let unpadded = padded.trim_end_matches('=');
        let (first, second) = unpadded.split_at(20);
        let folded = format!("{first}\r\n {second}\r\n");

        assert_eq!(
            decode_base64(folded.as_bytes()).unwrap(),
            decode_base64(padded.as_bytes()).unwrap()
        );
        assert_eq!(decode_base64(folded.as_bytes()).unwrap(), payload);
    }

    #[test]
    fn test_base64_extra_padding() {
        assert_eq!(decode_base64(b"SGk===\n").unwrap(), b"Hi");
    }

    #[test]
    fn test_base64_padded_chunks() {
        assert_eq!(decode_base64(b"SGk=\r\nSGk=\r\n").unwrap(), b"HiHi");
        assert_eq!(
            decode_base64(b"SGVsbG8=\r\nLCA=\r\nV29ybGQh").unwrap(),
            b"Hello, World!"
        );
    }

    #[test]
    fn test_base64_invalid() {
        assert!(decode_base64(b"not*base64").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"H=C3=A9llo").unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable(b"Hello=\r\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    #[test]
    fn test_identity_encodings_pass_through() {
        let data = b"\x00\xffraw";
        assert_eq!(TransferEncoding::Binary.decode(data).unwrap(), data);
        assert_eq!(TransferEncoding::EightBit.decode(data).unwrap(), data);
        assert_eq!(TransferEncoding::SevenBit.decode(data).unwrap(), data);
    }
}
