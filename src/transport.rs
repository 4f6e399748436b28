//! Request execution over pooled handles.
//!
//! [`Transport`] turns an `http::Request` into handle options, performs the
//! exchange on a checked-out handle and rebuilds an [`HttpResponse`] from what
//! the handle wrote into its sinks.

use crate::base::neterror::{NetError, PerformError};
use crate::handle::{Handle, HandleConfig, HandleOption, HandlePool, NativeHandle};
use crate::http::framing::{parse_headers, split_header_body};
use crate::http::request::{flatten_headers, read_body, RequestTimeout};
use crate::http::response::HttpResponse;
use crate::http::sink::{HeaderCollector, ResponseBuffer};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use http_body::Body;
use std::fmt::Display;
use std::sync::Arc;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// How response headers travel from the handle back to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseCapture {
    /// Header lines are delivered one by one to a header sink.
    #[default]
    HeaderCallback,
    /// The handle writes the header block in front of the body and the
    /// transport splits the two afterwards.
    Combined,
}

/// A connection-pooled HTTP transport.
pub struct Transport<H: Handle = NativeHandle> {
    pool: HandlePool<H>,
    capture: ResponseCapture,
}

impl<H: Handle> std::fmt::Debug for Transport<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("target", &self.config().impersonate_target)
            .field("capture", &self.capture)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Transport {
    /// Chrome 136 impersonation with a pool of 10 handles.
    pub fn new() -> Self {
        Self::with_config(HandleConfig::default())
    }

    /// Impersonate `target` with every other setting defaulted.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self::with_config(HandleConfig::for_target(target))
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle> Transport<H> {
    /// Build a transport from `config`; unset fields are defaulted here.
    pub fn with_config(config: HandleConfig) -> Self {
        let config = Arc::new(config.with_defaults());
        tracing::debug!(
            impersonate = %config.impersonate_target,
            pool_size = config.pool_size,
            "creating transport"
        );
        Self {
            pool: HandlePool::new(config),
            capture: ResponseCapture::default(),
        }
    }

    #[must_use]
    pub fn with_capture(mut self, capture: ResponseCapture) -> Self {
        self.capture = capture;
        self
    }

    pub fn config(&self) -> &HandleConfig {
        self.pool.config()
    }

    pub fn pool(&self) -> &HandlePool<H> {
        &self.pool
    }

    pub fn capture(&self) -> ResponseCapture {
        self.capture
    }

    /// Execute a request that may be absent.
    ///
    /// `None` fails with "request cannot be nil" before any handle is used.
    pub async fn round_trip<B>(&self, request: Option<Request<B>>) -> Result<HttpResponse, NetError>
    where
        B: Body,
        B::Error: Display,
    {
        match request {
            Some(request) => self.execute(request).await,
            None => Err(NetError::NilRequest),
        }
    }

    /// Execute one request and buffer the whole response.
    pub async fn execute<B>(&self, request: Request<B>) -> Result<HttpResponse, NetError>
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();
        if parts.uri.host().is_none() {
            return Err(NetError::MissingUrl);
        }
        let url = parts.uri.to_string();
        let header_lines = flatten_headers(&parts.headers);
        let body = read_body(body).await?;
        let timeout = parts.extensions.get::<RequestTimeout>().map(|t| t.0);

        let mut handle = self.pool.checkout()?;
        tracing::trace!(method = %parts.method, url = %url, "executing request");

        handle.set_option(HandleOption::Url(url))?;
        for option in method_options(&parts.method, body) {
            handle.set_option(option)?;
        }
        handle.set_option(HandleOption::HttpHeader(header_lines))?;
        if let Some(timeout) = timeout {
            handle.set_option(HandleOption::Timeout(timeout))?;
        }

        let buffer = Arc::new(ResponseBuffer::new());
        handle.set_option(HandleOption::WriteSink(buffer.clone()))?;
        let collector = match self.capture {
            ResponseCapture::HeaderCallback => {
                let collector = Arc::new(HeaderCollector::new());
                handle.set_option(HandleOption::HeaderSink(collector.clone()))?;
                Some(collector)
            }
            ResponseCapture::Combined => {
                handle.set_option(HandleOption::IncludeHeader(true))?;
                None
            }
        };

        handle.perform().await?;

        let code = handle
            .response_code()
            .ok_or(NetError::MissingResponseInfo("response code"))?;
        let status = StatusCode::from_u16(code).map_err(|_| PerformError::InvalidResponse)?;
        let handle_content_type = handle.content_type();
        drop(handle);

        let (mut headers, body) = match collector {
            Some(collector) => (collector.take(), buffer.bytes()),
            None => split_combined(buffer.bytes())?,
        };
        if !headers.contains_key(CONTENT_TYPE) {
            let content_type = handle_content_type
                .and_then(|ct| HeaderValue::from_str(&ct).ok())
                .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
            headers.insert(CONTENT_TYPE, content_type);
        }

        tracing::trace!(status = code, bytes = body.len(), "request complete");
        Ok(HttpResponse::new(status, headers, body).with_request(parts))
    }
}

/// Handle options that select the request method and body.
fn method_options(method: &Method, body: Option<Bytes>) -> Vec<HandleOption> {
    let mut options = Vec::with_capacity(3);
    match *method {
        Method::GET => {}
        Method::HEAD => options.push(HandleOption::NoBody(true)),
        Method::POST => {
            options.push(HandleOption::Post(true));
            if let Some(body) = body {
                options.push(HandleOption::PostFieldSize(body.len() as u64));
                options.push(HandleOption::PostFields(body));
            }
        }
        Method::PUT => {
            options.push(HandleOption::Upload(true));
            if let Some(body) = body {
                options.push(HandleOption::PostFields(body));
            }
        }
        _ => {
            options.push(HandleOption::CustomRequest(method.as_str().to_string()));
            if let Some(body) = body {
                options.push(HandleOption::PostFields(body));
            }
        }
    }
    options
}

fn split_combined(blob: Bytes) -> Result<(HeaderMap, Bytes), NetError> {
    let (head, body) = split_header_body(&blob)?;
    let headers = parse_headers(&String::from_utf8_lossy(head));
    let body = blob.slice_ref(body);
    Ok((headers, body))
}
