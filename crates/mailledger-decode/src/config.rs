//! Parser configuration: inclusion filters and per-header parser overrides.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::error::Result;
use crate::fields::{self, Address, MessageId};

/// Parser for Date and Resent-Date.
pub type DateParser = fn(&str) -> Result<DateTime<FixedOffset>>;
/// Parser for Sender and Resent-Sender.
pub type AddressParser = fn(&str) -> Result<Address>;
/// Parser for From, To, Cc and the other address-list headers.
pub type AddressListParser = fn(&str) -> Result<Vec<Address>>;
/// Parser for Message-ID and Resent-Message-ID.
pub type MessageIdParser = fn(&str) -> Result<MessageId>;
/// Parser for In-Reply-To and References.
pub type MessageIdListParser = fn(&str) -> Result<Vec<MessageId>>;
/// Parser for Subject and Comments.
pub type StringParser = fn(&str) -> Result<String>;
/// Parser for Keywords.
pub type StringListParser = fn(&str) -> Result<Vec<String>>;
/// Parser for Content-Type.
pub type ContentTypeParser = fn(&str) -> Result<ContentType>;
/// Parser for Content-Disposition.
pub type DispositionParser = fn(&str) -> Result<ContentDisposition>;
/// Parser for one value of a header without a dedicated field.
pub type ExtraHeaderParser = fn(&str) -> Result<String>;

/// Decides whether a text body of the given type is decoded into the email.
#[derive(Clone, Copy)]
pub struct BodyFilter(pub fn(&ContentType) -> bool);

impl BodyFilter {
    /// Keep every text body.
    pub const ALL_BODIES: Self = Self(|_| true);
    /// Skip every text body.
    pub const NO_BODIES: Self = Self(|_| false);

    /// Applies the filter.
    #[must_use]
    pub fn includes(&self, content_type: &ContentType) -> bool {
        (self.0)(content_type)
    }
}

impl Default for BodyFilter {
    fn default() -> Self {
        Self::ALL_BODIES
    }
}

impl fmt::Debug for BodyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyFilter(..)")
    }
}

/// Decides whether an inline or attached file is kept in the email.
#[derive(Clone, Copy)]
pub struct FileFilter(pub fn(&ContentType, &ContentDisposition) -> bool);

impl FileFilter {
    /// Keep every file.
    pub const ALL_FILES: Self = Self(|_, _| true);
    /// Skip every file.
    pub const NO_FILES: Self = Self(|_, _| false);

    /// Applies the filter.
    #[must_use]
    pub fn includes(&self, content_type: &ContentType, disposition: &ContentDisposition) -> bool {
        (self.0)(content_type, disposition)
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::ALL_FILES
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileFilter(..)")
    }
}

fn date(value: &str) -> Result<DateTime<FixedOffset>> {
    Ok(fields::parse_date(value))
}

fn message_id(value: &str) -> Result<MessageId> {
    Ok(fields::parse_message_id(value))
}

fn message_id_list(value: &str) -> Result<Vec<MessageId>> {
    Ok(fields::parse_message_id_list(value))
}

fn string_list(value: &str) -> Result<Vec<String>> {
    Ok(fields::parse_string_list(value))
}

fn extra(value: &str) -> Result<String> {
    Ok(fields::decode_leniently(value))
}

/// One parser slot per known header field.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct FieldParsers {
    pub date: DateParser,
    pub sender: AddressParser,
    pub from: AddressListParser,
    pub reply_to: AddressListParser,
    pub to: AddressListParser,
    pub cc: AddressListParser,
    pub bcc: AddressListParser,
    pub message_id: MessageIdParser,
    pub in_reply_to: MessageIdListParser,
    pub references: MessageIdListParser,
    pub subject: StringParser,
    pub comments: StringParser,
    pub keywords: StringListParser,
    pub resent_date: DateParser,
    pub resent_from: AddressListParser,
    pub resent_sender: AddressParser,
    pub resent_to: AddressListParser,
    pub resent_cc: AddressListParser,
    pub resent_bcc: AddressListParser,
    pub resent_message_id: MessageIdParser,
    pub content_type: ContentTypeParser,
    pub content_disposition: DispositionParser,
}

impl Default for FieldParsers {
    fn default() -> Self {
        Self {
            date,
            sender: fields::parse_address,
            from: fields::parse_address_list,
            reply_to: fields::parse_address_list,
            to: fields::parse_address_list,
            cc: fields::parse_address_list,
            bcc: fields::parse_address_list,
            message_id,
            in_reply_to: message_id_list,
            references: message_id_list,
            subject: fields::parse_string,
            comments: fields::parse_string,
            keywords: string_list,
            resent_date: date,
            resent_from: fields::parse_address_list,
            resent_sender: fields::parse_address,
            resent_to: fields::parse_address_list,
            resent_cc: fields::parse_address_list,
            resent_bcc: fields::parse_address_list,
            resent_message_id: message_id,
            content_type: fields::parse_content_type,
            content_disposition: fields::parse_content_disposition,
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Which text bodies to decode.
    pub body_filter: BodyFilter,
    /// Which inline and attached files to keep.
    pub file_filter: FileFilter,
    /// Parsers for the known header fields.
    pub parsers: FieldParsers,
    /// Parsers for other headers, keyed by lowercase name.
    pub extra_parsers: BTreeMap<String, ExtraHeaderParser>,
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Returns the parser for a header without a dedicated field.
    ///
    /// Falls back to encoded-word decoding that keeps undecodable values
    /// as written.
    #[must_use]
    pub fn extra_parser(&self, name: &str) -> ExtraHeaderParser {
        self.extra_parsers
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(extra)
    }
}

/// Builder for parser configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body filter.
    #[must_use]
    pub const fn body_filter(mut self, filter: BodyFilter) -> Self {
        self.config.body_filter = filter;
        self
    }

    /// Sets the file filter.
    #[must_use]
    pub const fn file_filter(mut self, filter: FileFilter) -> Self {
        self.config.file_filter = filter;
        self
    }

    /// Replaces the known-field parsers.
    #[must_use]
    pub const fn parsers(mut self, parsers: FieldParsers) -> Self {
        self.config.parsers = parsers;
        self
    }

    /// Registers a parser for a header without a dedicated field.
    ///
    /// The name is matched case-insensitively.
    #[must_use]
    pub fn extra_parser(mut self, name: &str, parser: ExtraHeaderParser) -> Self {
        self.config
            .extra_parsers
            .insert(name.to_ascii_lowercase(), parser);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
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
    use crate::disposition::DispositionKind;

    fn shout(value: &str) -> Result<String> {
        Ok(value.to_uppercase())
    }

    #[test]
    fn test_builtin_filters() {
        let ct = ContentType::text_plain();
        let cd = ContentDisposition::new(DispositionKind::Attachment);
        assert!(BodyFilter::ALL_BODIES.includes(&ct));
        assert!(!BodyFilter::NO_BODIES.includes(&ct));
        assert!(FileFilter::ALL_FILES.includes(&ct, &cd));
        assert!(!FileFilter::NO_FILES.includes(&ct, &cd));
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .body_filter(BodyFilter::NO_BODIES)
            .file_filter(FileFilter(|ct, _| ct.main_type == "image"))
            .extra_parser("X-Shout", shout)
            .build();

        assert!(!config.body_filter.includes(&ContentType::text_plain()));
        assert!(config.file_filter.includes(
            &ContentType::new("image", "png"),
            &ContentDisposition::default()
        ));
        assert_eq!((config.extra_parser("x-shout"))("hi").unwrap(), "HI");
        assert_eq!((config.extra_parser("X-SHOUT"))("hi").unwrap(), "HI");
    }

    #[test]
    fn test_default_extra_parser_decodes() {
        let config = Config::default();
        let parser = config.extra_parser("X-Anything");
        assert_eq!(parser("=?utf-8?Q?caf=C3=A9?=").unwrap(), "café");
        assert_eq!(parser("=?bogus-9999?Q?x?=").unwrap(), "=?bogus-9999?Q?x?=");
    }

    #[test]
    fn test_default_field_parsers() {
        let parsers = FieldParsers::default();
        assert_eq!((parsers.date)("garbage").unwrap(), fields::zero_date());
        assert_eq!(
            (parsers.in_reply_to)("<a@x> <b@x>").unwrap().len(),
            2
        );
        assert!((parsers.content_disposition)("bogus").is_err());
    }
}
