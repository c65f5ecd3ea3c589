//! Body / inline / attachment classification of MIME parts.

use crate::content_type::{ContentType, TextKind};
use crate::disposition::ContentDisposition;
use crate::error::{Error, Result};

/// Where a part's content ends up in the decoded email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Text merged into the body of the given kind.
    Body(TextKind),
    /// File shown within the message (e.g. an image in an HTML body).
    Inline,
    /// Downloadable attached file.
    Attachment,
}

/// Classifies a part from its own headers and its parent's content type.
///
/// Rules, first match wins:
///
/// 1. `attachment` disposition: attachment.
/// 2. Text body type without `inline` disposition: body.
/// 3. `inline` disposition, or any other type under `multipart/related`:
///    inline.
/// 4. Any type other than a text body type, or any part of
///    `multipart/mixed` / `multipart/parallel`: attachment.
///
/// Text body types are `text/plain`, `text/enriched` and `text/html`; other
/// `text/*` types such as `text/calendar` follow the non-text rules.
///
/// # Errors
///
/// Returns [`Error::UnknownContentType`] when no rule matches.
pub fn classify(
    content_type: &ContentType,
    disposition: &ContentDisposition,
    parent: &ContentType,
) -> Result<Classification> {
    if disposition.is_attachment() {
        return Ok(Classification::Attachment);
    }

    let text_kind = content_type.text_kind();
    if let Some(kind) = text_kind {
        if !disposition.is_inline() {
            return Ok(Classification::Body(kind));
        }
    }

    let is_body_type = text_kind.is_some();
    if disposition.is_inline() || (!is_body_type && parent.is("multipart", "related")) {
        return Ok(Classification::Inline);
    }

    if !is_body_type || parent.is("multipart", "mixed") || parent.is("multipart", "parallel") {
        return Ok(Classification::Attachment);
    }

    Err(Error::UnknownContentType {
        content_type: content_type.media_type(),
        parent: parent.media_type(),
    })
}
