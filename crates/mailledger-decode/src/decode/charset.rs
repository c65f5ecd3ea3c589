//! Charset label resolution and transcoding to UTF-8.

use charset::Charset;

/// Resolves a charset label to a decoder.
///
/// Labels are matched case-insensitively against the WHATWG label table.
/// A `windows-` label that does not resolve is retried with a `cp` prefix
/// (`windows-1252` -> `cp1252`).
#[must_use]
pub fn resolve_charset(label: &str) -> Option<Charset> {
    let label = label.trim();
    if let Some(charset) = Charset::for_label_no_replacement(label.as_bytes()) {
        return Some(charset);
    }

    let lower = label.to_ascii_lowercase();
    let codepage = lower.strip_prefix("windows-")?;
    tracing::trace!(label, "Retrying charset lookup with cp prefix");
    Charset::for_label_no_replacement(format!("cp{codepage}").as_bytes())
}

/// Transcodes `bytes` from `label` to UTF-8.
///
/// Returns `None` when the label cannot be resolved. Malformed sequences
/// are replaced with U+FFFD.
#[must_use]
pub fn transcode(bytes: &[u8], label: &str) -> Option<String> {
    let charset = resolve_charset(label)?;
    let (decoded, _malformed) = charset.decode_without_bom_handling(bytes);
    Some(decoded.into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_common_labels() {
        assert!(resolve_charset("utf-8").is_some());
        assert!(resolve_charset("UTF-8").is_some());
        assert!(resolve_charset(" iso-8859-1 ").is_some());
        assert!(resolve_charset("windows-1252").is_some());
        assert!(resolve_charset("cp1252").is_some());
    }

    #[test]
    fn test_resolve_unknown() {
        assert!(resolve_charset("bogus-9999").is_none());
        assert!(resolve_charset("windows-bogus").is_none());
        assert!(resolve_charset("").is_none());
    }

    #[test]
    fn test_transcode_latin1() {
        assert_eq!(transcode(b"caf\xe9", "iso-8859-1").unwrap(), "café");
    }

    #[test]
    fn test_transcode_windows_1252_quotes() {
        assert_eq!(
            transcode(b"\x93quoted\x94", "windows-1252").unwrap(),
            "\u{201c}quoted\u{201d}"
        );
    }

    #[test]
    fn test_transcode_unknown_label() {
        assert!(transcode(b"abc", "x-unknown").is_none());
    }
}
