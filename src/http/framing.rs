//! Header-line parsing and header/body framing.
//!
//! Handles two inputs: individual header lines delivered by a handle's header
//! callback, and a combined `header block + body` blob produced when a handle
//! writes headers into the body stream.

use crate::base::neterror::NetError;
use http::{HeaderMap, HeaderName, HeaderValue};

const CRLF_SEPARATOR: &[u8] = b"\r\n\r\n";
const LF_SEPARATOR: &[u8] = b"\n\n";

/// Parse one header line into a name/value pair.
///
/// Blank lines, status lines (`HTTP/...`), lines without a colon and lines
/// whose name or value is not a valid header yield `None`.
pub fn parse_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("HTTP/") {
        return None;
    }
    let (name, value) = line.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

/// Parse a raw header block into a multi-value map.
///
/// Accepts CRLF and bare LF line endings alike.
pub fn parse_headers(header_data: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in header_data.split('\n') {
        if let Some((name, value)) = parse_header_line(line) {
            headers.append(name, value);
        }
    }
    headers
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split at the first header/body separator: `\r\n\r\n`, else `\n\n`.
fn split_once(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = find(data, CRLF_SEPARATOR) {
        return Some((&data[..pos], &data[pos + CRLF_SEPARATOR.len()..]));
    }
    find(data, LF_SEPARATOR).map(|pos| (&data[..pos], &data[pos + LF_SEPARATOR.len()..]))
}

fn is_interim(head: &[u8]) -> bool {
    // "HTTP/1.1 1xx"
    let line = head.split(|b| *b == b'\n').next().unwrap_or_default();
    let mut parts = line.split(|b| *b == b' ').filter(|p| !p.is_empty());
    let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
        return false;
    };
    version.starts_with(b"HTTP/") && code.len() == 3 && code[0] == b'1'
}

/// Split a combined response blob into its final header block and body.
///
/// Interim `1xx` header blocks in front of the final one are skipped. Fails
/// with [`NetError::MalformedResponse`] when no separator is present.
pub fn split_header_body(data: &[u8]) -> Result<(&[u8], &[u8]), NetError> {
    let (mut head, mut body) = split_once(data).ok_or(NetError::MalformedResponse)?;
    while is_interim(head) {
        match split_once(body) {
            Some((next_head, next_body)) => {
                head = next_head;
                body = next_body;
            }
            None => break,
        }
    }
    Ok((head, body))
}
