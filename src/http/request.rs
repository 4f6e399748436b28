//! Request-side helpers: header flattening, body collection and the
//! per-request timeout extension.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::HeaderMap;
use http_body::Body;
use http_body_util::BodyExt;
use std::fmt::Display;
use std::time::Duration;

/// Overall timeout for a single request.
///
/// Attach it as a request extension; it overrides the transport's configured
/// timeout for that exchange only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Flatten a header map into `Name: value` lines, one per header name.
///
/// Only the first value of a repeated header is kept. Values that are not
/// visible ASCII are skipped.
pub fn flatten_headers(headers: &HeaderMap) -> Vec<String> {
    let mut lines = Vec::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let Some(value) = headers.get(name) else {
            continue;
        };
        if let Ok(value) = value.to_str() {
            lines.push(format!("{}: {}", name.as_str(), value));
        }
    }
    lines
}

/// Read a request body fully into memory.
///
/// An empty body yields `None`.
pub async fn read_body<B>(body: B) -> Result<Option<Bytes>, NetError>
where
    B: Body,
    B::Error: Display,
{
    let collected = body
        .collect()
        .await
        .map_err(|e| NetError::RequestBody(e.to_string()))?;
    let bytes = collected.to_bytes();
    Ok((!bytes.is_empty()).then_some(bytes))
}
