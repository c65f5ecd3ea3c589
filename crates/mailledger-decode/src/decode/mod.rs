//! Content and header value decoding.
//!
//! Transfer-encoding removal and charset transcoding for bodies, and
//! RFC 2047 encoded-word decoding for header values.

mod charset;
mod content;
mod encoded_word;
mod transfer;

pub use charset::{resolve_charset, transcode};
pub use content::{ContentDecoder, decode_content};
pub use encoded_word::decode_header_value;
pub use transfer::{TransferEncoding, decode_base64, decode_quoted_printable};
