//! Assembled in-memory HTTP response.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use std::io::Cursor;

/// A fully buffered response.
///
/// Built once by the transport after the exchange completes; the body can
/// be read any number of times.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    request: Option<http::request::Parts>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body,
            request: None,
        }
    }

    /// Attach the request that produced this response.
    pub(crate) fn with_request(mut self, parts: http::request::Parts) -> Self {
        self.request = Some(parts);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status line text, e.g. `"200 OK"`.
    pub fn status_text(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }

    /// Always HTTP/1.1, whatever was negotiated on the wire.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Content type reported for the response.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Number of body bytes held in memory.
    pub fn content_length(&self) -> u64 {
        self.body.len() as u64
    }

    /// A fresh reader over the body. Each call starts at offset zero.
    pub fn body_reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.body.clone())
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::JsonParse(e.to_string()))
    }

    /// Method, URI and headers of the originating request.
    pub fn request(&self) -> Option<&http::request::Parts> {
        self.request.as_ref()
    }

    /// Convert into an `http::Response` carrying the body bytes.
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }
}
