//! Body content decoding pipeline.

use std::io::Read;

use super::charset::transcode;
use super::transfer::TransferEncoding;
use crate::error::Result;

/// Deferred decoder for one body: transfer decoding, then charset transcoding.
///
/// Nothing is read from the source until [`ContentDecoder::into_bytes`] or
/// [`ContentDecoder::into_string`] is called.
#[derive(Debug)]
pub struct ContentDecoder<R> {
    reader: R,
    encoding: TransferEncoding,
    charset: Option<String>,
}

impl<R: Read> ContentDecoder<R> {
    /// Creates a decoder over raw, still transfer-encoded content.
    pub fn new(reader: R, encoding: TransferEncoding, charset: Option<&str>) -> Self {
        Self {
            reader,
            encoding,
            charset: charset.map(str::to_string),
        }
    }

    /// Reads and fully decodes the content.
    ///
    /// With a resolvable charset the result is UTF-8. Without a charset, or
    /// with a label that does not resolve, the transfer-decoded bytes are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the transfer encoding is malformed.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut raw = Vec::new();
        self.reader.read_to_end(&mut raw)?;
        let decoded = self.encoding.decode(&raw)?;

        let Some(label) = self.charset.as_deref() else {
            return Ok(decoded);
        };
        match transcode(&decoded, label) {
            Some(text) => Ok(text.into_bytes()),
            None => {
                tracing::warn!(charset = label, "Unknown content charset, passing bytes through");
                Ok(decoded)
            }
        }
    }

    /// Decodes the content as text, replacing invalid UTF-8 lossily.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the transfer encoding is malformed.
    pub fn into_string(self) -> Result<String> {
        let bytes = self.into_bytes()?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
    }
}

/// Decodes content in one call. See [`ContentDecoder`].
///
/// # Errors
///
/// Returns an error if reading fails or the transfer encoding is malformed.
pub fn decode_content(
    reader: impl Read,
    encoding: TransferEncoding,
    charset: Option<&str>,
) -> Result<Vec<u8>> {
    ContentDecoder::new(reader, encoding, charset).into_bytes()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_then_charset() {
        // "café" in ISO-8859-1, base64 encoded
        let decoded = decode_content(&b"Y2Fm6Q=="[..], TransferEncoding::Base64, Some("iso-8859-1"));
        assert_eq!(decoded.unwrap(), "café".as_bytes());
    }

    #[test]
    fn test_quoted_printable_then_charset() {
        let decoder = ContentDecoder::new(
            &b"caf=E9 cr=E8me=\r\n br=FBl=E9e"[..],
            TransferEncoding::QuotedPrintable,
            Some("latin1"),
        );
        assert_eq!(decoder.into_string().unwrap(), "café crème brûlée");
    }

    #[test]
    fn test_no_charset_passes_bytes() {
        let decoded = decode_content(&b"\x89PNG"[..], TransferEncoding::Binary, None).unwrap();
        assert_eq!(decoded, b"\x89PNG");
    }

    #[test]
    fn test_unknown_charset_passes_bytes() {
        let decoded =
            decode_content(&b"plain"[..], TransferEncoding::SevenBit, Some("x-nope")).unwrap();
        assert_eq!(decoded, b"plain");
    }

    #[test]
    fn test_into_string_is_lossy() {
        let decoder = ContentDecoder::new(&b"ok\xff"[..], TransferEncoding::EightBit, None);
        assert_eq!(decoder.into_string().unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_invalid_base64_is_error() {
        assert!(decode_content(&b"@@@@"[..], TransferEncoding::Base64, None).is_err());
    }
}
