//! RFC 2047 encoded-word decoding for header values.
//!
//! Format: `=?charset?encoding?encoded-text?=`, where encoding is `B`
//! (Base64) or `Q` (Quoted-Printable with `_` for space).

use super::charset::resolve_charset;
use super::transfer::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};

/// One encoded-word split into its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: u8,
    text: &'a str,
}

impl EncodedWord<'_> {
    /// Decodes the word. `header` is the full value, used for error context.
    fn decode(&self, header: &str) -> Result<String> {
        let charset = resolve_charset(self.charset).ok_or_else(|| Error::UnknownCharset {
            charset: self.charset.to_string(),
            header: header.to_string(),
        })?;

        let bytes = if self.encoding.eq_ignore_ascii_case(&b'b') {
            decode_base64(self.text.as_bytes())?
        } else {
            decode_quoted_printable(self.text.replace('_', " ").as_bytes())?
        };

        let (decoded, _malformed) = charset.decode_without_bom_handling(&bytes);
        Ok(decoded.into_owned())
    }
}

/// Parses an encoded-word at the start of `s`, returning it and the rest.
fn parse_encoded_word(s: &str) -> Option<(EncodedWord<'_>, &str)> {
    let inner = s.strip_prefix("=?")?;

    let charset_end = inner.find('?')?;
    let charset = &inner[..charset_end];
    // RFC 2231 language suffix: =?utf-8*en?Q?...?=
    let charset = charset.split_once('*').map_or(charset, |(name, _)| name);
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let after = &inner[charset_end + 1..];
    let encoding = *after.as_bytes().first()?;
    if !matches!(encoding, b'B' | b'b' | b'Q' | b'q') {
        return None;
    }
    let payload = after[1..].strip_prefix('?')?;

    let end = payload.find("?=")?;
    let text = &payload[..end];
    if text.contains(char::is_whitespace) {
        return None;
    }

    Some((
        EncodedWord {
            charset,
            encoding,
            text,
        },
        &payload[end + 2..],
    ))
}

/// Decodes every encoded-word in a header value.
///
/// Text outside encoded-words is kept as is. Whitespace between two
/// adjacent encoded-words is dropped. Tokens that only resemble an
/// encoded-word are kept verbatim.
///
/// # Errors
///
/// Returns [`Error::UnknownCharset`] if an encoded-word names a charset
/// that cannot be resolved, or a decode error for malformed payloads.
pub fn decode_header_value(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    loop {
        let Some(start) = rest.find("=?") else {
            out.push_str(rest);
            break;
        };
        let (literal, candidate) = rest.split_at(start);

        if let Some((word, remainder)) = parse_encoded_word(candidate) {
            if !(after_word && literal.chars().all(char::is_whitespace)) {
                out.push_str(literal);
            }
            out.push_str(&word.decode(value)?);
            after_word = true;
            rest = remainder;
        } else {
            out.push_str(literal);
            out.push_str("=?");
            after_word = false;
            rest = &candidate[2..];
        }
    }

    Ok(out)
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
    fn test_plain_text_unchanged() {
        assert_eq!(decode_header_value("Hello").unwrap(), "Hello");
        assert_eq!(decode_header_value("").unwrap(), "");
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_header_value("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(
            decode_header_value("=?UTF-8?B?8J+TjSBUZXN0?=").unwrap(),
            "\u{1f4cd} Test"
        );
    }

    #[test]
    fn test_quoted_printable_word() {
        assert_eq!(decode_header_value("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
        assert_eq!(
            decode_header_value("=?iso-8859-1?q?caf=E9_cr=E8me?=").unwrap(),
            "café crème"
        );
    }

    #[test]
    fn test_mixed_text_and_words() {
        assert_eq!(
            decode_header_value("Re: =?utf-8?Q?caf=C3=A9?= meeting").unwrap(),
            "Re: café meeting"
        );
    }

    #[test]
    fn test_adjacent_words_joined() {
        assert_eq!(
            decode_header_value("=?utf-8?Q?a?= =?utf-8?Q?b?=\r\n =?utf-8?Q?c?=").unwrap(),
            "abc"
        );
        assert_eq!(decode_header_value("=?utf-8?Q?a?= b").unwrap(), "a b");
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(decode_header_value("=?US-ASCII*EN?Q?Keith?=").unwrap(), "Keith");
    }

    #[test]
    fn test_windows_label() {
        assert_eq!(
            decode_header_value("=?windows-1252?Q?=93hi=94?=").unwrap(),
            "\u{201c}hi\u{201d}"
        );
    }

    #[test]
    fn test_unknown_charset() {
        let err = decode_header_value("=?bogus-9999?Q?x?=").unwrap_err();
        match err {
            Error::UnknownCharset { charset, header } => {
                assert_eq!(charset, "bogus-9999");
                assert_eq!(header, "=?bogus-9999?Q?x?=");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_word_kept_verbatim() {
        assert_eq!(decode_header_value("=?utf-8?X?abc?=").unwrap(), "=?utf-8?X?abc?=");
        assert_eq!(decode_header_value("a =? b").unwrap(), "a =? b");
        assert_eq!(decode_header_value("=?utf-8?Q?no end").unwrap(), "=?utf-8?Q?no end");
    }
}
