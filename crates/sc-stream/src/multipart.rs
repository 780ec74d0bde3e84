//! `multipart/byteranges` framing.
//!
//! Each part is `[CRLF]--boundary CRLF headers CRLF CRLF data`, where the
//! leading CRLF is present on every part except the first. The body ends
//! with `CRLF --boundary-- CRLF`.

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;

const BOUNDARY_LEN: usize = 24;

/// A fresh random boundary token.
pub fn generate_boundary() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect()
}

/// `Content-Type` value for a multipart response using `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/byteranges; boundary={boundary}")
}

/// Delimiter and headers that precede one part's data.
pub fn part_header(boundary: &str, first: bool, content_type: &str, content_range: &str) -> Bytes {
    let lead = if first { "" } else { "\r\n" };
    Bytes::from(format!(
        "{lead}--{boundary}\r\nContent-Type: {content_type}\r\nContent-Range: {content_range}\r\n\r\n"
    ))
}

/// Closing delimiter that ends the body.
pub fn closing_delimiter(boundary: &str) -> Bytes {
    Bytes::from(format!("\r\n--{boundary}--\r\n"))
}
