//! Multipart boundary splitting.

use std::io::BufRead;

use crate::error::Result;
use crate::header::RawMessage;

/// Pulls the parts of a multipart body one at a time, in document order.
pub trait PartReader {
    /// The part type yielded by this reader.
    type Part;

    /// Returns the next part, or `None` once the body is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying byte source fails.
    fn next_part(&mut self) -> Result<Option<Self::Part>>;
}

/// [`PartReader`] over any buffered byte source.
///
/// The preamble before the first delimiter and the epilogue after the close
/// delimiter are discarded. A missing close delimiter ends the last part at
/// end of input.
#[derive(Debug)]
pub struct MultipartReader<R> {
    reader: R,
    delimiter: Vec<u8>,
    started: bool,
    finished: bool,
}

enum Line {
    Delimiter,
    Close,
    Content,
}

impl<R: BufRead> MultipartReader<R> {
    /// Creates a reader splitting on `--{boundary}` lines.
    pub fn new(reader: R, boundary: &str) -> Self {
        let mut delimiter = b"--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            reader,
            delimiter,
            started: false,
            finished: false,
        }
    }

    fn classify(&self, line: &[u8]) -> Line {
        let Some(rest) = line.strip_prefix(self.delimiter.as_slice()) else {
            return Line::Content;
        };
        if let Some(after) = rest.strip_prefix(b"--") {
            if after.iter().all(u8::is_ascii_whitespace) {
                return Line::Close;
            }
        }
        if rest.iter().all(u8::is_ascii_whitespace) {
            Line::Delimiter
        } else {
            Line::Content
        }
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<bool> {
        line.clear();
        Ok(self.reader.read_until(b'\n', line)? > 0)
    }

    fn skip_preamble(&mut self) -> Result<()> {
        let mut line = Vec::new();
        while self.read_line(&mut line)? {
            match self.classify(&line) {
                Line::Delimiter => return Ok(()),
                Line::Close => break,
                Line::Content => {}
            }
        }
        self.finished = true;
        Ok(())
    }
}

impl<R: BufRead> PartReader for MultipartReader<R> {
    type Part = RawMessage;

    fn next_part(&mut self) -> Result<Option<RawMessage>> {
        if !self.started {
            self.started = true;
            self.skip_preamble()?;
        }
        if self.finished {
            return Ok(None);
        }

        let mut raw = Vec::new();
        let mut line = Vec::new();
        loop {
            if !self.read_line(&mut line)? {
                self.finished = true;
                break;
            }
            match self.classify(&line) {
                Line::Delimiter => break,
                Line::Close => {
                    self.finished = true;
                    break;
                }
                Line::Content => raw.extend_from_slice(&line),
            }
        }

        // The line break before a delimiter belongs to the delimiter.
        if raw.ends_with(b"\r\n") {
            raw.truncate(raw.len() - 2);
        } else if raw.ends_with(b"\n") {
            raw.truncate(raw.len() - 1);
        }

        Ok(Some(RawMessage::parse(&raw)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::header::MessageSource;

    fn collect(body: &[u8], boundary: &str) -> Vec<RawMessage> {
        let mut reader = MultipartReader::new(body, boundary);
        let mut parts = Vec::new();
        while let Some(part) = reader.next_part().unwrap() {
            parts.push(part);
        }
        parts
    }

    #[test]
    fn test_splits_parts_and_skips_preamble() {
        let body = concat!(
            "This is a preamble.\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "first\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>second</p>\r\n",
            "--XYZ--\r\n",
            "epilogue\r\n"
        );
        let parts = collect(body.as_bytes(), "XYZ");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].header_values("content-type"), vec!["text/plain"]);
        assert_eq!(parts[0].body(), b"first");
        assert_eq!(parts[1].body(), b"<p>second</p>");
    }

    #[test]
    fn test_missing_close_delimiter() {
        let body = "--b\nContent-Type: text/plain\n\nonly part\n";
        let parts = collect(body.as_bytes(), "b");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body(), b"only part");
    }

    #[test]
    fn test_boundary_prefix_is_content() {
        let body = "--b\n\n--bx is not a delimiter\n--b--\n";
        let parts = collect(body.as_bytes(), "b");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body(), b"--bx is not a delimiter");
    }

    #[test]
    fn test_trailing_whitespace_on_delimiter() {
        let body = "--b  \r\n\r\none\r\n--b-- \r\n";
        let parts = collect(body.as_bytes(), "b");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body(), b"one");
    }

    #[test]
    fn test_no_delimiter_yields_nothing() {
        assert!(collect(b"no parts here\r\n", "b").is_empty());
    }
}
