//! Integration tests for the MIME decoding engine.
//!
//! These tests decode complete raw messages through the public API.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use mailledger_decode::{
    Address, BodyFilter, Config, DispositionKind, Error, FileFilter, HeaderMap, MessageSource,
    MultipartReader, PartReader, Parser, RawMessage, parse, parse_headers,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const REPORT: &str = concat!(
    "From: Alice <alice@example.com>\r\n",
    "To: Bob <bob@example.com>, carol@example.com\r\n",
    "Subject: Quarterly report\r\n",
    "Date: Tue, 3 Jan 2006 10:00:00 +0000\r\n",
    "Message-ID: <report-1@example.com>\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/mixed; boundary=\"mix\"\r\n",
    "\r\n",
    "This is a multi-part message in MIME format.\r\n",
    "--mix\r\n",
    "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: text/plain; charset=utf-8\r\n",
    "\r\n",
    "Hello plain\r\n",
    "--alt\r\n",
    "Content-Type: text/html; charset=utf-8\r\n",
    "\r\n",
    "<p>Hello html</p>\r\n",
    "--alt--\r\n",
    "\r\n",
    "--mix\r\n",
    "Content-Type: application/pdf; name=\"report.pdf\"\r\n",
    "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "JVBERi0xLjQ=\r\n",
    "--mix--\r\n",
);

const NEWSLETTER: &str = concat!(
    "Subject: Newsletter\r\n",
    "Content-Type: multipart/related; boundary=\"rel\"\r\n",
    "\r\n",
    "--rel\r\n",
    "Content-Type: text/html; charset=utf-8\r\n",
    "\r\n",
    "<img src=\"cid:abc123@test\">\r\n",
    "--rel\r\n",
    "Content-Type: image/png\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "Content-ID: <abc123@test>\r\n",
    "\r\n",
    "iVBORw0KGgo=\r\n",
    "--rel--\r\n",
);

#[test]
fn test_mixed_alternative_with_attachment() {
    init_tracing();
    let email = parse(REPORT.as_bytes()).unwrap();

    assert_eq!(email.headers.subject, "Quarterly report");
    assert_eq!(
        email.headers.from,
        vec![Address::with_name("Alice", "alice@example.com")]
    );
    assert_eq!(
        email.headers.to,
        vec![
            Address::with_name("Bob", "bob@example.com"),
            Address::new("carol@example.com"),
        ]
    );
    assert_eq!(email.headers.date.to_rfc3339(), "2006-01-03T10:00:00+00:00");
    assert_eq!(email.headers.message_id.as_str(), "report-1@example.com");
    assert_eq!(email.headers.extra_headers["Mime-Version"], vec!["1.0"]);

    assert_eq!(email.text, "Hello plain");
    assert_eq!(email.html, "<p>Hello html</p>");
    assert!(email.enriched_text.is_empty());
    assert!(email.inline_files.is_empty());

    assert_eq!(email.attached_files.len(), 1);
    let pdf = &email.attached_files[0];
    assert_eq!(pdf.content_type.media_type(), "application/pdf");
    assert_eq!(pdf.content_disposition.kind, Some(DispositionKind::Attachment));
    assert_eq!(pdf.filename().as_deref(), Some("report.pdf"));
    assert_eq!(pdf.data, b"%PDF-1.4");
}

#[test]
fn test_related_inline_image() {
    init_tracing();
    let email = parse(NEWSLETTER.as_bytes()).unwrap();

    assert_eq!(email.html, "<img src=\"cid:abc123@test\">");
    assert!(email.attached_files.is_empty());
    assert_eq!(email.inline_files.len(), 1);

    let image = &email.inline_files[0];
    assert_eq!(image.content_id, "abc123@test");
    assert_eq!(image.content_type.media_type(), "image/png");
    assert_eq!(image.data, b"\x89PNG\r\n\x1a\n");
}

#[test]
fn test_top_level_binary_becomes_attachment() {
    let raw = concat!(
        "Subject: blob\r\n",
        "Content-Type: application/octet-stream\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "aGVsbG8=\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert!(email.text.is_empty());
    assert_eq!(email.attached_files.len(), 1);
    assert_eq!(email.attached_files[0].data, b"hello");
    assert_eq!(
        email.attached_files[0].content_type.media_type(),
        "application/octet-stream"
    );
}

#[test]
fn test_parsing_is_repeatable() {
    let parser = Parser::default();
    let first = parser.parse(REPORT.as_bytes()).unwrap();
    let second = parser.parse(REPORT.as_bytes()).unwrap();
    assert_eq!(first, second);

    let from_reader = parser.parse_reader(Cursor::new(REPORT.as_bytes())).unwrap();
    assert_eq!(first, from_reader);
}

#[test]
fn test_plain_parts_are_concatenated_in_order() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "first\r\n",
        "--b\r\n",
        "Content-Type: image/gif\r\n",
        "\r\n",
        "GIF89a\r\n",
        "--b\r\n",
        "\r\n",
        "second\r\n",
        "--b--\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.text, "first\n\nsecond");
    assert_eq!(email.attached_files.len(), 1);
    assert_eq!(email.attached_files[0].data, b"GIF89a");
}

#[test]
fn test_calendar_invite_is_attachment() {
    let raw = concat!(
        "Subject: Planning\r\n",
        "Content-Type: multipart/mixed; boundary=outer\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=inner\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "You are invited\r\n",
        "--inner\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<p>You are invited</p>\r\n",
        "--inner\r\n",
        "Content-Type: text/calendar; method=REQUEST; charset=utf-8\r\n",
        "\r\n",
        "BEGIN:VCALENDAR\r\n",
        "END:VCALENDAR\r\n",
        "--inner--\r\n",
        "--outer--\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.text, "You are invited");
    assert_eq!(email.html, "<p>You are invited</p>");
    assert_eq!(email.attached_files.len(), 1);

    let invite = &email.attached_files[0];
    assert_eq!(invite.content_type.media_type(), "text/calendar");
    assert_eq!(invite.content_type.parameter("method"), Some("REQUEST"));
    assert_eq!(invite.data, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR");
}

#[test]
fn test_nested_part_error_reports_location() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=outer\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=inner\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "fine\r\n",
        "--inner\r\n",
        "Content-Type: image/png\r\n",
        "Content-Disposition: sideways\r\n",
        "\r\n",
        "data\r\n",
        "--inner--\r\n",
        "--outer--\r\n",
    );
    let err = parse(raw.as_bytes()).unwrap_err();

    let Error::Part {
        index,
        depth,
        parent,
        source,
    } = &err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!((*index, *depth, parent.as_str()), (0, 1, "multipart/mixed"));

    let Error::Part {
        index,
        depth,
        parent,
        source,
    } = &**source
    else {
        panic!("unexpected error: {source:?}");
    };
    assert_eq!(
        (*index, *depth, parent.as_str()),
        (1, 2, "multipart/alternative")
    );
    assert!(matches!(&**source, Error::Header { name, .. } if name == "Content-Disposition"));
    assert!(matches!(err.root_cause(), Error::UnknownDisposition(label) if label == "sideways"));
}

#[test]
fn test_enriched_parts_are_joined_without_separator() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/enriched\r\n",
        "\r\n",
        "<bold>one</bold>\r\n",
        "--b\r\n",
        "Content-Type: text/enriched\r\n",
        "\r\n",
        "<italic>two</italic>\r\n",
        "--b--\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.enriched_text, "<bold>one</bold><italic>two</italic>");
    assert!(email.text.is_empty());
}

#[test]
fn test_inline_disposition_under_mixed() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/html\r\n",
        "Content-Disposition: inline\r\n",
        "\r\n",
        "<p>see below</p>\r\n",
        "--b\r\n",
        "Content-Type: image/jpeg\r\n",
        "Content-Disposition: inline; filename=photo.jpg\r\n",
        "Content-ID: <photo@test>\r\n",
        "\r\n",
        "JFIF\r\n",
        "--b--\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.html, "<p>see below</p>");
    assert!(email.attached_files.is_empty());
    assert_eq!(email.inline_files.len(), 1);

    let photo = &email.inline_files[0];
    assert_eq!(photo.content_id, "photo@test");
    assert_eq!(photo.filename().as_deref(), Some("photo.jpg"));
    assert_eq!(photo.data, b"JFIF");
}

#[test]
fn test_missing_boundary_is_error() {
    let err = parse(b"Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nbody\r\n").unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingBoundary(_)));
}

#[test]
fn test_bad_part_header_is_error() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "Content-Disposition: sideways\r\n",
        "\r\n",
        "body\r\n",
        "--b--\r\n",
    );
    let err = parse(raw.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Part { index: 0, depth: 1, .. }));
    assert!(matches!(err.root_cause(), Error::UnknownDisposition(_)));
}

#[test]
fn test_body_filter_applies_to_nested_parts() {
    let config = Config::builder()
        .body_filter(BodyFilter(|ct| ct.sub_type == "html"))
        .build();
    let email = Parser::new(config).parse(REPORT.as_bytes()).unwrap();

    assert!(email.text.is_empty());
    assert_eq!(email.html, "<p>Hello html</p>");
    assert_eq!(email.attached_files.len(), 1);
}

#[test]
fn test_file_filter_applies_to_nested_parts() {
    let config = Config::builder()
        .file_filter(FileFilter(|ct, _| ct.main_type == "image"))
        .build();
    let parser = Parser::new(config);

    let report = parser.parse(REPORT.as_bytes()).unwrap();
    assert!(report.attached_files.is_empty());
    assert_eq!(report.text, "Hello plain");

    let newsletter = parser.parse(NEWSLETTER.as_bytes()).unwrap();
    assert_eq!(newsletter.inline_files.len(), 1);
}

#[test]
fn test_no_bodies_no_files() {
    let config = Config::builder()
        .body_filter(BodyFilter::NO_BODIES)
        .file_filter(FileFilter::NO_FILES)
        .build();
    let email = Parser::new(config).parse(REPORT.as_bytes()).unwrap();

    assert_eq!(email.headers.subject, "Quarterly report");
    assert!(email.text.is_empty());
    assert!(email.html.is_empty());
    assert!(email.attached_files.is_empty());
}

#[test]
fn test_charset_transcoding() {
    let raw = concat!(
        "Content-Type: multipart/alternative; boundary=b; charset=iso-8859-1\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "caf=E9\r\n",
        "--b\r\n",
        "Content-Type: text/html; charset=windows-1252\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "<p>=93quoted=94</p>\r\n",
        "--b--\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.text, "café");
    assert_eq!(email.html, "<p>\u{201c}quoted\u{201d}</p>");
}

#[test]
fn test_unknown_body_charset_passes_through() {
    let raw = concat!(
        "Content-Type: text/plain; charset=x-unheard-of\r\n",
        "\r\n",
        "plain ascii\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();
    assert_eq!(email.text, "plain ascii");
}

#[test]
fn test_base64_body_normalizes_newlines() {
    // "line one\r\nline two\r\n"
    let raw = concat!(
        "Content-Type: text/plain; charset=utf-8\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "bGluZSBvbmUNCmxpbmUgdHdvDQo=\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();
    assert_eq!(email.text, "line one\nline two");
}

#[test]
fn test_encoded_header_fields() {
    let raw = concat!(
        "From: =?utf-8?Q?Ren=C3=A9?= <rene@example.com>\r\n",
        "Subject: =?UTF-8?B?8J+TjSBUZXN0?=\r\n",
        "In-Reply-To: <a@example.com>\r\n",
        "References: <a@example.com> <b@example.com>\r\n",
        "\r\n",
        "body\r\n",
    );
    let email = parse(raw.as_bytes()).unwrap();

    assert_eq!(email.headers.subject, "\u{1f4cd} Test");
    assert_eq!(
        email.headers.from,
        vec![Address::with_name("René", "rene@example.com")]
    );
    assert_eq!(email.headers.in_reply_to.len(), 1);
    assert_eq!(email.headers.references.len(), 2);
}

#[test]
fn test_parse_headers_only() {
    let message = RawMessage::parse(REPORT.as_bytes());
    let headers = parse_headers(&message).unwrap();
    assert_eq!(headers.subject, "Quarterly report");
    assert!(headers.content_type.is_multipart());
    assert_eq!(headers.content_type.boundary(), Some("mix"));
}

#[test]
fn test_custom_extra_header_parser() {
    fn upper(value: &str) -> mailledger_decode::Result<String> {
        Ok(value.to_uppercase())
    }

    let config = Config::builder().extra_parser("X-Label", upper).build();
    let email = Parser::new(config)
        .parse(b"X-Label: quiet\r\nX-Other: as is\r\n\r\nbody")
        .unwrap();

    assert_eq!(email.headers.extra_headers["X-Label"], vec!["QUIET"]);
    assert_eq!(email.headers.extra_headers["X-Other"], vec!["as is"]);
}

#[test]
fn test_custom_message_source() {
    struct Stored {
        headers: HeaderMap,
        body: Vec<u8>,
    }

    impl MessageSource for Stored {
        fn header_values(&self, name: &str) -> Vec<&str> {
            self.headers.get_all(name)
        }

        fn header_names(&self) -> Vec<&str> {
            self.headers.iter().map(|(name, _)| name).collect()
        }

        fn body(&self) -> &[u8] {
            &self.body
        }
    }

    let mut headers = HeaderMap::new();
    headers.add("Subject", "stored");
    headers.add("Content-Type", "text/html");
    let stored = Stored {
        headers,
        body: b"<b>hi</b>".to_vec(),
    };

    let email = Parser::default().parse_message(&stored).unwrap();
    assert_eq!(email.headers.subject, "stored");
    assert_eq!(email.html, "<b>hi</b>");
}

#[test]
fn test_multipart_reader_public_api() {
    let body = b"preamble\r\n--b\r\nX-A: 1\r\n\r\none\r\n--b\r\n\r\ntwo\r\n--b--\r\nepilogue";
    let mut reader = MultipartReader::new(&body[..], "b");

    let first = reader.next_part().unwrap().unwrap();
    assert_eq!(first.headers.get("x-a"), Some("1"));
    assert_eq!(first.body, b"one");

    let second = reader.next_part().unwrap().unwrap();
    assert!(second.headers.is_empty());
    assert_eq!(second.body, b"two");

    assert!(reader.next_part().unwrap().is_none());
}
