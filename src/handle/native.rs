//! The built-in handle engine.
//!
//! `NativeHandle` executes one exchange per `perform()` over the socket and
//! TLS layer in [`crate::socket`], with hyper doing the HTTP/1.1 and HTTP/2
//! protocol work. Each handle keeps a small cache of live connections that
//! survives `reset()`, so a pooled handle reuses its connections across
//! requests.

use super::{Handle, HandleOption, HttpVersion};
use crate::base::neterror::{NetError, PerformError};
use crate::http::framing::parse_header_line;
use crate::http::sink::{BodySink, HeaderSink};
use crate::socket::connectjob::{ConnectJob, ConnectOptions};
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::ImpersonateTarget;
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Response, Uri, Version};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2, TrySendError};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::{Position, Url};

const MIN_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 512 * 1024;

/// Option state of a handle. `Default` holds the engine defaults a fresh or
/// reset handle starts from.
#[derive(Clone)]
struct Options {
    url: Option<String>,
    target: String,
    default_headers: bool,
    connect_timeout: Duration,
    /// `None` waits indefinitely.
    timeout: Option<Duration>,
    verify_peer: bool,
    verify_host: bool,
    dns_cache_timeout: Duration,
    buffer_size: usize,
    tcp_keepalive: bool,
    keep_idle: Duration,
    keep_intvl: Duration,
    max_connects: usize,
    max_age: Duration,
    /// `None` never retires a connection for age alone.
    max_lifetime: Option<Duration>,
    fresh_connect: bool,
    forbid_reuse: bool,
    proxy: Option<ProxySettings>,
    http_version: Option<HttpVersion>,
    nobody: bool,
    post: bool,
    upload: bool,
    post_fields: Option<Bytes>,
    post_field_size: Option<u64>,
    custom_request: Option<Method>,
    headers: Vec<String>,
    include_header: bool,
    write_sink: Option<Arc<dyn BodySink>>,
    header_sink: Option<Arc<dyn HeaderSink>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: None,
            target: ImpersonateTarget::default().as_str().to_string(),
            default_headers: true,
            connect_timeout: Duration::from_secs(300),
            timeout: None,
            verify_peer: true,
            verify_host: true,
            dns_cache_timeout: Duration::from_secs(60),
            buffer_size: 16 * 1024,
            tcp_keepalive: false,
            keep_idle: Duration::from_secs(60),
            keep_intvl: Duration::from_secs(60),
            max_connects: 5,
            max_age: Duration::from_secs(118),
            max_lifetime: None,
            fresh_connect: false,
            forbid_reuse: false,
            proxy: None,
            http_version: None,
            nobody: false,
            post: false,
            upload: false,
            post_fields: None,
            post_field_size: None,
            custom_request: None,
            headers: Vec::new(),
            include_header: false,
            write_sink: None,
            header_sink: None,
        }
    }
}

/// Connections are only shared between requests with the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnKey {
    scheme: String,
    host: String,
    port: u16,
    proxy: Option<String>,
}

enum Sender {
    H1(http1::SendRequest<Full<Bytes>>),
    H2(http2::SendRequest<Full<Bytes>>),
}

impl Sender {
    fn is_closed(&self) -> bool {
        match self {
            Sender::H1(s) => s.is_closed(),
            Sender::H2(s) => s.is_closed(),
        }
    }

    fn is_h2(&self) -> bool {
        matches!(self, Sender::H2(_))
    }

    async fn send(&mut self, req: Request<Full<Bytes>>) -> Result<Response<Incoming>, SendFailure> {
        match self {
            Sender::H1(s) => {
                s.ready().await.map_err(SendFailure::unsent)?;
                s.try_send_request(req).await.map_err(SendFailure::from)
            }
            Sender::H2(s) => {
                s.ready().await.map_err(SendFailure::unsent)?;
                s.try_send_request(req).await.map_err(SendFailure::from)
            }
        }
    }
}

/// A failed send. `unsent` is only true when hyper gave the request back
/// before writing any of it to the connection.
struct SendFailure {
    error: hyper::Error,
    unsent: bool,
}

impl SendFailure {
    fn unsent(error: hyper::Error) -> Self {
        Self { error, unsent: true }
    }
}

impl<T> From<TrySendError<T>> for SendFailure {
    fn from(mut e: TrySendError<T>) -> Self {
        let unsent = e.take_message().is_some();
        Self {
            error: e.into_error(),
            unsent,
        }
    }
}

struct PooledConnection {
    key: ConnKey,
    sender: Sender,
    via_forward_proxy: bool,
    created: Instant,
    idle_since: Instant,
}

impl PooledConnection {
    fn is_reusable(&self, now: Instant, max_age: Duration, max_lifetime: Option<Duration>) -> bool {
        !self.sender.is_closed()
            && now.duration_since(self.idle_since) <= max_age
            && max_lifetime.map_or(true, |limit| now.duration_since(self.created) <= limit)
    }
}

/// Handle engine backed by tokio, boring and hyper.
#[derive(Default)]
pub struct NativeHandle {
    options: Options,
    connections: VecDeque<PooledConnection>,
    response_code: Option<u16>,
    content_type: Option<String>,
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("url", &self.options.url)
            .field("target", &self.options.target)
            .field("connections", &self.connections.len())
            .field("response_code", &self.response_code)
            .finish()
    }
}

impl NativeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of idle connections held for reuse.
    pub fn cached_connections(&self) -> usize {
        self.connections.len()
    }

    /// Request method implied by the current options.
    fn method(&self) -> Method {
        let o = &self.options;
        if let Some(custom) = &o.custom_request {
            custom.clone()
        } else if o.nobody {
            Method::HEAD
        } else if o.upload {
            Method::PUT
        } else if o.post || o.post_fields.is_some() {
            Method::POST
        } else {
            Method::GET
        }
    }

    fn request_body(&self) -> Bytes {
        let Some(fields) = &self.options.post_fields else {
            return Bytes::new();
        };
        match self.options.post_field_size {
            Some(size) if (size as usize) < fields.len() => fields.slice(..size as usize),
            _ => fields.clone(),
        }
    }

    /// Browser preset headers overlaid with the caller's header lines.
    ///
    /// A line with an empty value (`"Accept:"`) removes that header.
    fn request_headers(&self, target: ImpersonateTarget) -> HeaderMap {
        let mut headers = if self.options.default_headers {
            target.default_headers()
        } else {
            HeaderMap::new()
        };
        for line in &self.options.headers {
            match line.trim().split_once(':') {
                Some((name, value)) if value.trim().is_empty() => {
                    if let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) {
                        headers.remove(name);
                    }
                }
                _ => {
                    if let Some((name, value)) = parse_header_line(line) {
                        headers.insert(name, value);
                    }
                }
            }
        }
        headers
    }

    fn connect_options(&self, target: ImpersonateTarget) -> ConnectOptions {
        let o = &self.options;
        let tls = target.tls_options();
        let tls = match o.http_version {
            Some(HttpVersion::Http11) => tls.with_alpn("http/1.1"),
            Some(HttpVersion::Http2) => tls.with_alpn("h2"),
            None => tls,
        };
        ConnectOptions {
            connect_timeout: o.connect_timeout,
            dns_cache_ttl: o.dns_cache_timeout,
            keepalive: o.tcp_keepalive.then_some((o.keep_idle, o.keep_intvl)),
            recv_buffer_size: Some(o.buffer_size),
            proxy: o.proxy.clone(),
            tls,
            verify_peer: o.verify_peer,
            verify_host: o.verify_host,
        }
    }

    /// Take a live cached connection for `key`, discarding stale ones.
    fn take_connection(&mut self, key: &ConnKey) -> Option<PooledConnection> {
        if self.options.fresh_connect {
            return None;
        }
        let now = Instant::now();
        let (max_age, max_lifetime) = (self.options.max_age, self.options.max_lifetime);
        self.connections.retain(|conn| {
            let keep = conn.is_reusable(now, max_age, max_lifetime);
            if !keep {
                tracing::debug!(host = %conn.key.host, port = conn.key.port, "retiring stale connection");
            }
            keep
        });
        let pos = self.connections.iter().position(|conn| &conn.key == key)?;
        self.connections.remove(pos)
    }

    fn store_connection(&mut self, mut conn: PooledConnection) {
        if self.options.forbid_reuse || conn.sender.is_closed() {
            return;
        }
        conn.idle_since = Instant::now();
        self.connections.push_back(conn);
        while self.connections.len() > self.options.max_connects.max(1) {
            self.connections.pop_front();
        }
    }

    async fn open_connection(
        &self,
        url: &Url,
        key: ConnKey,
        target: ImpersonateTarget,
    ) -> Result<PooledConnection, PerformError> {
        let connected = ConnectJob::connect(url, &self.connect_options(target)).await?;
        let io = TokioIo::new(connected.socket);

        let sender = if connected.is_h2 {
            let settings = target.http2_settings();
            let (sender, conn) = http2::Builder::new(TokioExecutor::new())
                .initial_stream_window_size(settings.initial_stream_window_size)
                .initial_connection_window_size(settings.initial_connection_window_size)
                .max_header_list_size(settings.max_header_list_size)
                .handshake(io)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "HTTP/2 handshake failed");
                    PerformError::Http2ProtocolError
                })?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "HTTP/2 connection closed with error");
                }
            });
            Sender::H2(sender)
        } else {
            let (sender, conn) = http1::Builder::new()
                .title_case_headers(true)
                .handshake(io)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "HTTP/1.1 handshake failed");
                    PerformError::ConnectionFailed
                })?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "HTTP/1.1 connection closed with error");
                }
            });
            Sender::H1(sender)
        };

        tracing::debug!(
            host = %key.host,
            port = key.port,
            h2 = sender.is_h2(),
            "opened connection"
        );
        let now = Instant::now();
        Ok(PooledConnection {
            key,
            sender,
            via_forward_proxy: connected.via_forward_proxy,
            created: now,
            idle_since: now,
        })
    }

    fn build_request(
        &self,
        url: &Url,
        conn: &PooledConnection,
        method: Method,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<Request<Full<Bytes>>, PerformError> {
        let absolute_form = conn.sender.is_h2() || conn.via_forward_proxy;
        let target = if absolute_form {
            &url[..Position::AfterQuery]
        } else {
            &url[Position::BeforePath..Position::AfterQuery]
        };
        let uri: Uri = target.parse().map_err(|_| PerformError::InvalidUrl)?;

        if !conn.sender.is_h2() && !headers.contains_key(header::HOST) {
            let host = &url[Position::BeforeHost..Position::AfterPort];
            let value = HeaderValue::from_str(host).map_err(|_| PerformError::InvalidUrl)?;
            headers.insert(header::HOST, value);
        }
        if conn.via_forward_proxy {
            let auth = self.options.proxy.as_ref().and_then(ProxySettings::auth_header);
            if let Some(value) = auth.and_then(|a| HeaderValue::from_str(&a).ok()) {
                headers.insert(header::PROXY_AUTHORIZATION, value);
            }
        }

        let version = if conn.sender.is_h2() {
            Version::HTTP_2
        } else {
            Version::HTTP_11
        };
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .version(version)
            .body(Full::new(body))
            .map_err(|_| PerformError::InvalidUrl)?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Feed the status line and header block to the installed sinks.
    fn deliver_head(&self, response: &Response<Incoming>) {
        let version = match response.version() {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2",
            _ => "HTTP/1.1",
        };
        let status = response.status();
        let mut lines = Vec::with_capacity(response.headers().len() + 2);
        lines.push(format!(
            "{} {} {}\r\n",
            version,
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ));
        for (name, value) in response.headers() {
            lines.push(format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        lines.push("\r\n".to_string());

        for line in &lines {
            if let Some(sink) = &self.options.header_sink {
                sink.add_header_line(line);
            }
            if self.options.include_header {
                if let Some(sink) = &self.options.write_sink {
                    sink.append(line.as_bytes());
                }
            }
        }
    }

    async fn deliver_body(&self, body: &mut Incoming) -> Result<(), PerformError> {
        let chunk_size = self.options.buffer_size;
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| {
                tracing::debug!(error = %e, "response body read failed");
                PerformError::BodyReadFailed
            })?;
            if let Ok(data) = frame.into_data() {
                if let Some(sink) = &self.options.write_sink {
                    for chunk in data.chunks(chunk_size) {
                        sink.append(chunk);
                    }
                }
            }
        }
        Ok(())
    }

    async fn exchange(&mut self, url: &Url, target: ImpersonateTarget) -> Result<(), PerformError> {
        let host = url.host_str().ok_or(PerformError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(PerformError::InvalidUrl)?;
        let key = ConnKey {
            scheme: url.scheme().to_string(),
            host: host.to_ascii_lowercase(),
            port,
            proxy: self.options.proxy.as_ref().map(|p| p.url.to_string()),
        };
        let method = self.method();
        let headers = self.request_headers(target);
        let body = self.request_body();

        let (mut conn, mut reused) = match self.take_connection(&key) {
            Some(conn) => {
                tracing::debug!(host = %key.host, port = key.port, "reusing connection");
                (conn, true)
            }
            None => (self.open_connection(url, key.clone(), target).await?, false),
        };

        let mut response = loop {
            let request =
                self.build_request(url, &conn, method.clone(), headers.clone(), body.clone())?;
            match conn.sender.send(request).await {
                Ok(response) => break response,
                // Only a request that never left the cached connection may go
                // out again on a fresh one.
                Err(e) if reused && e.unsent => {
                    tracing::debug!(error = %e.error, "reused connection closed before send, reconnecting");
                    conn = self.open_connection(url, key.clone(), target).await?;
                    reused = false;
                }
                Err(e) => return Err(map_hyper_error(&e.error, conn.sender.is_h2())),
            }
        };

        self.response_code = Some(response.status().as_u16());
        self.content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.deliver_head(&response);

        let drained = if self.options.nobody {
            method == Method::HEAD
        } else {
            self.deliver_body(response.body_mut()).await?;
            true
        };
        drop(response);
        if drained {
            self.store_connection(conn);
        }
        Ok(())
    }
}

fn map_hyper_error(e: &hyper::Error, h2: bool) -> PerformError {
    tracing::debug!(error = %e, "request failed");
    if e.is_timeout() {
        PerformError::TimedOut
    } else if e.is_parse() || e.is_parse_status() {
        PerformError::InvalidResponse
    } else if e.is_canceled() || e.is_closed() || e.is_incomplete_message() {
        PerformError::ConnectionClosed
    } else if h2 {
        PerformError::Http2ProtocolError
    } else {
        PerformError::ConnectionFailed
    }
}

impl Handle for NativeHandle {
    fn open() -> Result<Self, NetError> {
        Ok(Self::new())
    }

    fn set_option(&mut self, option: HandleOption) -> Result<(), NetError> {
        let o = &mut self.options;
        match option {
            HandleOption::Url(url) => o.url = Some(url),
            HandleOption::Impersonate {
                target,
                default_headers,
            } => {
                // Unknown targets are reported by `perform`.
                o.target = target;
                o.default_headers = default_headers;
            }
            HandleOption::ConnectTimeout(t) => o.connect_timeout = t,
            HandleOption::Timeout(t) => o.timeout = (!t.is_zero()).then_some(t),
            HandleOption::SslVerifyPeer(v) => o.verify_peer = v,
            HandleOption::SslVerifyHost(v) => o.verify_host = v,
            HandleOption::DnsCacheTimeout(t) => o.dns_cache_timeout = t,
            HandleOption::BufferSize(size) => {
                o.buffer_size = size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
            }
            HandleOption::TcpKeepAlive(v) => o.tcp_keepalive = v,
            HandleOption::TcpKeepIdle(t) => o.keep_idle = t,
            HandleOption::TcpKeepIntvl(t) => o.keep_intvl = t,
            HandleOption::MaxConnects(n) => o.max_connects = n,
            HandleOption::MaxAgeConn(t) => o.max_age = t,
            HandleOption::MaxLifetimeConn(t) => o.max_lifetime = (!t.is_zero()).then_some(t),
            HandleOption::FreshConnect(v) => o.fresh_connect = v,
            HandleOption::ForbidReuse(v) => o.forbid_reuse = v,
            HandleOption::Proxy(proxy) => {
                o.proxy = match proxy.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(url) => Some(ProxySettings::parse(url)?),
                }
            }
            HandleOption::HttpVersion(v) => o.http_version = v,
            HandleOption::NoBody(v) => o.nobody = v,
            HandleOption::Post(v) => o.post = v,
            HandleOption::Upload(v) => o.upload = v,
            HandleOption::PostFields(body) => o.post_fields = Some(body),
            HandleOption::PostFieldSize(size) => o.post_field_size = Some(size),
            HandleOption::CustomRequest(method) => {
                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|e| NetError::invalid_option("custom request", e.to_string()))?;
                o.custom_request = Some(method);
            }
            HandleOption::HttpHeader(lines) => o.headers = lines,
            HandleOption::IncludeHeader(v) => o.include_header = v,
            HandleOption::WriteSink(sink) => o.write_sink = Some(sink),
            HandleOption::HeaderSink(sink) => o.header_sink = Some(sink),
        }
        Ok(())
    }

    async fn perform(&mut self) -> Result<(), NetError> {
        self.response_code = None;
        self.content_type = None;

        let raw = self.options.url.as_deref().ok_or(PerformError::NoUrl)?;
        let url = Url::parse(raw).map_err(|_| PerformError::InvalidUrl)?;
        let target: ImpersonateTarget = self.options.target.parse()?;
        tracing::trace!(url = %url, impersonate = %target, method = %self.method(), "performing request");

        match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.exchange(&url, target)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::debug!(url = %url, timeout = ?limit, "request timed out");
                    return Err(PerformError::TimedOut.into());
                }
            },
            None => self.exchange(&url, target).await?,
        }
        Ok(())
    }

    fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn reset(&mut self) {
        self.options = Options::default();
        self.response_code = None;
        self.content_type = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::sink::{HeaderCollector, ResponseBuffer};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Hits {
        connections: Arc<AtomicUsize>,
        requests: Arc<AtomicUsize>,
    }

    impl Hits {
        fn connections(&self) -> usize {
            self.connections.load(Ordering::SeqCst)
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    /// Answers the first `answers` requests of every connection with
    /// `response`, then closes it: when the next request arrives if `linger`,
    /// right after the last answer otherwise.
    async fn serve_scripted(response: &'static str, answers: usize, linger: bool) -> (SocketAddr, Hits) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Hits::default();
        let server_hits = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                server_hits.connections.fetch_add(1, Ordering::SeqCst);
                let hits = server_hits.clone();
                tokio::spawn(async move {
                    let mut answered = 0;
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        if !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            continue;
                        }
                        buf.clear();
                        hits.requests.fetch_add(1, Ordering::SeqCst);
                        if answered == answers {
                            return;
                        }
                        if socket.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                        answered += 1;
                        if answered == answers && !linger {
                            return;
                        }
                    }
                });
            }
        });
        (addr, hits)
    }

    /// Serves `response` to every request on every accepted connection.
    async fn serve(response: &'static str) -> SocketAddr {
        serve_scripted(response, usize::MAX, true).await.0
    }

    fn wire(handle: &mut NativeHandle) -> (Arc<ResponseBuffer>, Arc<HeaderCollector>) {
        let body = Arc::new(ResponseBuffer::new());
        let headers = Arc::new(HeaderCollector::new());
        handle.set_option(HandleOption::WriteSink(body.clone())).unwrap();
        handle.set_option(HandleOption::HeaderSink(headers.clone())).unwrap();
        (body, headers)
    }

    #[test]
    fn test_method_resolution() {
        let mut handle = NativeHandle::new();
        assert_eq!(handle.method(), Method::GET);
        handle.set_option(HandleOption::PostFields(Bytes::from_static(b"a=1"))).unwrap();
        assert_eq!(handle.method(), Method::POST);
        handle.set_option(HandleOption::Upload(true)).unwrap();
        assert_eq!(handle.method(), Method::PUT);
        handle.set_option(HandleOption::NoBody(true)).unwrap();
        assert_eq!(handle.method(), Method::HEAD);
        handle.set_option(HandleOption::CustomRequest("DELETE".into())).unwrap();
        assert_eq!(handle.method(), Method::DELETE);
    }

    #[test]
    fn test_post_field_size_truncates() {
        let mut handle = NativeHandle::new();
        handle.set_option(HandleOption::PostFields(Bytes::from_static(b"abcdef"))).unwrap();
        handle.set_option(HandleOption::PostFieldSize(3)).unwrap();
        assert_eq!(handle.request_body(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_request_headers_override_and_remove() {
        let mut handle = NativeHandle::new();
        handle
            .set_option(HandleOption::HttpHeader(vec![
                "User-Agent: custom/1.0".into(),
                "Accept-Language:".into(),
                "X-Extra: yes".into(),
            ]))
            .unwrap();
        let headers = handle.request_headers(ImpersonateTarget::Chrome136);
        assert_eq!(headers.get(header::USER_AGENT).unwrap(), "custom/1.0");
        assert!(headers.get(header::ACCEPT_LANGUAGE).is_none());
        assert_eq!(headers.get("x-extra").unwrap(), "yes");
        assert!(headers.contains_key("sec-ch-ua"));
    }

    #[test]
    fn test_default_headers_disabled() {
        let mut handle = NativeHandle::new();
        handle
            .set_option(HandleOption::Impersonate {
                target: "firefox102".into(),
                default_headers: false,
            })
            .unwrap();
        assert!(handle.request_headers(ImpersonateTarget::Firefox102).is_empty());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut handle = NativeHandle::new();
        let err = handle
            .set_option(HandleOption::CustomRequest("BAD METHOD".into()))
            .unwrap_err();
        assert!(matches!(err, NetError::InvalidOption { option: "custom request", .. }));
        assert!(handle.set_option(HandleOption::Proxy(Some("http://".into()))).is_err());
        handle.set_option(HandleOption::Proxy(Some(String::new()))).unwrap();
        assert!(handle.options.proxy.is_none());
    }

    #[tokio::test]
    async fn test_perform_without_url() {
        let err = NativeHandle::new().perform().await.unwrap_err();
        assert_eq!(err, NetError::Perform(PerformError::NoUrl));
    }

    #[tokio::test]
    async fn test_unknown_target_fails_at_perform() {
        let mut handle = NativeHandle::new();
        handle
            .set_option(HandleOption::Impersonate {
                target: "netscape4".into(),
                default_headers: true,
            })
            .unwrap();
        handle.set_option(HandleOption::Url("http://127.0.0.1:1/".into())).unwrap();
        let err = handle.perform().await.unwrap_err();
        assert_eq!(
            err,
            NetError::Perform(PerformError::UnsupportedTarget("netscape4".into()))
        );
    }

    #[tokio::test]
    async fn test_perform_get() {
        let addr = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nX-A: 1\r\nX-A: 2\r\n\r\nhello",
        )
        .await;
        let mut handle = NativeHandle::new();
        let (body, headers) = wire(&mut handle);
        handle.set_option(HandleOption::Url(format!("http://{}/path?q=1", addr))).unwrap();
        handle.perform().await.unwrap();

        assert_eq!(handle.response_code(), Some(200));
        assert_eq!(handle.content_type().as_deref(), Some("text/plain"));
        assert_eq!(body.bytes(), Bytes::from_static(b"hello"));
        let headers = headers.headers();
        assert_eq!(headers.get_all("x-a").iter().count(), 2);
        assert_eq!(headers.get("content-length").unwrap(), "5");
        assert_eq!(handle.cached_connections(), 1);
    }

    #[tokio::test]
    async fn test_include_header_writes_head_into_body() {
        let addr = serve("HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\nnope").await;
        let mut handle = NativeHandle::new();
        let body = Arc::new(ResponseBuffer::new());
        handle.set_option(HandleOption::WriteSink(body.clone())).unwrap();
        handle.set_option(HandleOption::IncludeHeader(true)).unwrap();
        handle.set_option(HandleOption::Url(format!("http://{}/", addr))).unwrap();
        handle.perform().await.unwrap();

        let blob = body.bytes();
        assert!(blob.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
        assert!(blob.ends_with(b"\r\n\r\nnope"));
        assert_eq!(handle.response_code(), Some(404));
    }

    #[tokio::test]
    async fn test_connection_survives_reset() {
        let addr = serve("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let mut handle = NativeHandle::new();
        let url = format!("http://{}/", addr);
        for _ in 0..3 {
            handle.set_option(HandleOption::Url(url.clone())).unwrap();
            handle.perform().await.unwrap();
            handle.reset();
            assert_eq!(handle.cached_connections(), 1);
            assert_eq!(handle.response_code(), None);
        }
    }

    #[tokio::test]
    async fn test_forbid_reuse_drops_connection() {
        let addr = serve("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let mut handle = NativeHandle::new();
        handle.set_option(HandleOption::ForbidReuse(true)).unwrap();
        handle.set_option(HandleOption::Url(format!("http://{}/", addr))).unwrap();
        handle.perform().await.unwrap();
        assert_eq!(handle.cached_connections(), 0);
    }

    #[tokio::test]
    async fn test_overall_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut handle = NativeHandle::new();
        handle.set_option(HandleOption::Timeout(Duration::from_millis(200))).unwrap();
        handle.set_option(HandleOption::Url(format!("http://{}/", addr))).unwrap();
        let err = handle.perform().await.unwrap_err();
        assert!(err.is_timeout());
    }

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";

    #[tokio::test]
    async fn test_request_lost_on_reused_connection_is_not_resent() {
        // First request answered, the second one read and left unanswered.
        let (addr, hits) = serve_scripted(OK, 1, true).await;
        let mut handle = NativeHandle::new();
        handle.set_option(HandleOption::Url(format!("http://{}/submit", addr))).unwrap();
        handle.set_option(HandleOption::Post(true)).unwrap();
        handle.set_option(HandleOption::PostFields(Bytes::from_static(b"a=1"))).unwrap();

        handle.perform().await.unwrap();
        assert_eq!(handle.cached_connections(), 1);

        let err = handle.perform().await.unwrap_err();
        assert_eq!(err.category(), crate::base::ErrorCategory::Execution);
        assert_eq!(hits.requests(), 2);
        assert_eq!(hits.connections(), 1);
        assert_eq!(handle.cached_connections(), 0);
    }

    #[tokio::test]
    async fn test_connection_closed_while_idle_is_replaced() {
        let (addr, hits) = serve_scripted(OK, 1, false).await;
        let mut handle = NativeHandle::new();
        let (body, _) = wire(&mut handle);
        handle.set_option(HandleOption::Url(format!("http://{}/", addr))).unwrap();
        handle.perform().await.unwrap();

        // Give the connection task time to see the peer's FIN.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (body2, _) = wire(&mut handle);
        handle.perform().await.unwrap();
        assert_eq!(handle.response_code(), Some(200));
        assert_eq!(body.bytes(), Bytes::from_static(b"ok"));
        assert_eq!(body2.bytes(), Bytes::from_static(b"ok"));
        assert_eq!(hits.connections(), 2);
        assert_eq!(hits.requests(), 2);
    }

    #[tokio::test]
    async fn test_fresh_connection_failure_is_not_retried() {
        let (addr, hits) = serve_scripted(OK, 0, true).await;
        let mut handle = NativeHandle::new();
        handle.set_option(HandleOption::Url(format!("http://{}/", addr))).unwrap();

        let err = handle.perform().await.unwrap_err();
        assert_eq!(err.category(), crate::base::ErrorCategory::Execution);
        assert_eq!(hits.connections(), 1);
        assert_eq!(hits.requests(), 1);
        assert_eq!(handle.response_code(), None);
    }
}
