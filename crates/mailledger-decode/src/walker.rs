//! Recursive multipart traversal.
//!
//! Each multipart level produces a [`Bodies`] accumulator that is returned
//! to the caller and merged into the parent's in document order. Recursion
//! depth equals multipart nesting depth and is not capped; callers that
//! accept hostile input should bound message size before parsing.

use crate::classify::{Classification, classify};
use crate::config::Config;
use crate::content_type::{ContentType, TextKind};
use crate::decode::{ContentDecoder, TransferEncoding};
use crate::disposition::ContentDisposition;
use crate::error::{Error, Result};
use crate::fields::parse_message_id;
use crate::header::MessageSource;
use crate::message::{AttachedFile, InlineFile};
use crate::multipart::{MultipartReader, PartReader};

/// Text buffers and files collected from one multipart level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Bodies {
    pub text: String,
    pub enriched_text: String,
    pub html: String,
    pub inline_files: Vec<InlineFile>,
    pub attached_files: Vec<AttachedFile>,
}

impl Bodies {
    fn push_text(&mut self, kind: TextKind, text: &str) {
        match kind {
            TextKind::Plain => {
                self.text.push_str(text);
                self.text.push_str("\n\n");
            }
            TextKind::Enriched => self.enriched_text.push_str(text),
            TextKind::Html => self.html.push_str(text),
        }
    }

    fn merge(&mut self, child: Self) {
        self.text.push_str(&child.text);
        self.enriched_text.push_str(&child.enriched_text);
        self.html.push_str(&child.html);
        self.inline_files.extend(child.inline_files);
        self.attached_files.extend(child.attached_files);
    }

    pub(crate) fn trim(&mut self) {
        for buffer in [&mut self.text, &mut self.enriched_text, &mut self.html] {
            let trimmed = trim_blank_lines(buffer);
            if trimmed.len() != buffer.len() {
                *buffer = trimmed.to_string();
            }
        }
    }
}

/// Removes leading and trailing blank lines.
pub(crate) fn trim_blank_lines(text: &str) -> &str {
    let Some(first) = text.find(|c: char| !c.is_whitespace()) else {
        return "";
    };
    let line_start = text[..first].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..].trim_end()
}

/// Headers of one part that drive decoding.
struct PartInfo {
    content_type: ContentType,
    disposition: ContentDisposition,
    encoding: TransferEncoding,
}

/// Walks a message with the parsers and filters of a [`Config`].
pub(crate) struct Walker<'a> {
    config: &'a Config,
}

impl<'a> Walker<'a> {
    pub(crate) const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Decodes a whole message given its already parsed top-level headers.
    pub(crate) fn walk_message(
        &self,
        message: &impl MessageSource,
        content_type: &ContentType,
        disposition: &ContentDisposition,
    ) -> Result<Bodies> {
        if content_type.is_multipart() {
            return self.walk(message.body(), content_type, 1);
        }

        let info = PartInfo {
            content_type: content_type.clone(),
            disposition: disposition.clone(),
            encoding: part_encoding(message),
        };
        let mut bodies = Bodies::default();

        match info.content_type.text_kind() {
            Some(kind) if !info.disposition.is_attachment() => {
                let charset = info.content_type.charset();
                self.push_body(&mut bodies, message, &info, kind, charset)?;
            }
            _ => self.push_attachment(&mut bodies, message, info)?,
        }

        bodies.trim();
        Ok(bodies)
    }

    /// Walks the parts of one multipart body.
    fn walk(&self, body: &[u8], parent: &ContentType, depth: usize) -> Result<Bodies> {
        let boundary = parent
            .boundary()
            .ok_or_else(|| Error::MissingBoundary(parent.media_type()))?;

        let mut reader = MultipartReader::new(body, boundary);
        let mut bodies = Bodies::default();
        let mut index = 0;

        while let Some(part) = reader.next_part()? {
            self.visit(&mut bodies, &part, parent, depth)
                .map_err(|err| Error::Part {
                    index,
                    depth,
                    parent: parent.media_type(),
                    source: Box::new(err),
                })?;
            index += 1;
        }

        tracing::debug!(depth, parts = index, parent = %parent.media_type(), "Walked multipart");
        bodies.trim();
        Ok(bodies)
    }

    fn visit(
        &self,
        bodies: &mut Bodies,
        part: &impl MessageSource,
        parent: &ContentType,
        depth: usize,
    ) -> Result<()> {
        let info = self.part_info(part)?;
        let charset = info
            .content_type
            .charset()
            .or_else(|| parent.charset())
            .map(str::to_string);

        tracing::debug!(
            depth,
            content_type = %info.content_type.media_type(),
            disposition = ?info.disposition.kind,
            encoding = %info.encoding,
            "Visiting part"
        );

        if info.disposition.is_attachment() {
            return self.push_attachment(bodies, part, info);
        }

        // Text body types are bodies here whatever their disposition says,
        // so `classify` never sees them.
        if let Some(kind) = info.content_type.text_kind() {
            return self.push_body(bodies, part, &info, kind, charset.as_deref());
        }

        if info.content_type.is_multipart() {
            let child = self.walk(part.body(), &info.content_type, depth + 1)?;
            bodies.merge(child);
            return Ok(());
        }

        match classify(&info.content_type, &info.disposition, parent)? {
            Classification::Inline => self.push_inline(bodies, part, info),
            Classification::Attachment | Classification::Body(_) => {
                self.push_attachment(bodies, part, info)
            }
        }
    }

    fn part_info(&self, part: &impl MessageSource) -> Result<PartInfo> {
        let parsers = &self.config.parsers;
        let content_type = (parsers.content_type)(&part.joined_header("content-type"))
            .map_err(|err| err.in_header("Content-Type"))?;
        let disposition = (parsers.content_disposition)(&part.joined_header("content-disposition"))
            .map_err(|err| err.in_header("Content-Disposition"))?;
        Ok(PartInfo {
            content_type,
            disposition,
            encoding: part_encoding(part),
        })
    }

    fn push_body(
        &self,
        bodies: &mut Bodies,
        part: &impl MessageSource,
        info: &PartInfo,
        kind: TextKind,
        charset: Option<&str>,
    ) -> Result<()> {
        if !self.config.body_filter.includes(&info.content_type) {
            tracing::debug!(content_type = %info.content_type.media_type(), "Body filtered out");
            return Ok(());
        }
        let text = ContentDecoder::new(part.body(), info.encoding, charset).into_string()?;
        bodies.push_text(kind, &text);
        Ok(())
    }

    fn push_inline(&self, bodies: &mut Bodies, part: &impl MessageSource, info: PartInfo) -> Result<()> {
        if !self.includes_file(&info) {
            return Ok(());
        }
        let data = ContentDecoder::new(part.body(), info.encoding, None).into_bytes()?;
        let content_id = parse_message_id(&part.joined_header("content-id"));
        bodies.inline_files.push(InlineFile {
            content_id: content_id.as_str().to_string(),
            content_type: info.content_type,
            content_disposition: info.disposition,
            data,
        });
        Ok(())
    }

    fn push_attachment(
        &self,
        bodies: &mut Bodies,
        part: &impl MessageSource,
        info: PartInfo,
    ) -> Result<()> {
        if !self.includes_file(&info) {
            return Ok(());
        }
        let data = ContentDecoder::new(part.body(), info.encoding, None).into_bytes()?;
        bodies.attached_files.push(AttachedFile {
            content_type: info.content_type,
            content_disposition: info.disposition,
            data,
        });
        Ok(())
    }

    fn includes_file(&self, info: &PartInfo) -> bool {
        let included = self
            .config
            .file_filter
            .includes(&info.content_type, &info.disposition);
        if !included {
            tracing::debug!(content_type = %info.content_type.media_type(), "File filtered out");
        }
        included
    }
}

fn part_encoding(part: &impl MessageSource) -> TransferEncoding {
    TransferEncoding::parse(&part.joined_header("content-transfer-encoding"))
}
