//! The handle API: one configured connection context per in-flight request.
//!
//! A [`Handle`] is driven entirely through options. The transport sets the
//! per-request options, calls [`Handle::perform`], reads the response info
//! and hands the handle back to its [`HandlePool`] which resets it.

pub mod config;
pub mod native;
pub mod pool;

pub use config::{HandleConfig, HandleConfigBuilder};
pub use native::NativeHandle;
pub use pool::{HandlePool, PooledHandle};

use crate::base::neterror::NetError;
use crate::http::sink::{BodySink, HeaderSink};
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Protocol version a handle is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVersion {
    Http11,
    Http2,
}

/// A single option understood by a handle.
#[derive(Clone)]
pub enum HandleOption {
    /// Target URL.
    Url(String),
    /// Browser to impersonate and whether its default headers are sent.
    Impersonate { target: String, default_headers: bool },
    ConnectTimeout(Duration),
    /// Overall exchange timeout.
    Timeout(Duration),
    SslVerifyPeer(bool),
    SslVerifyHost(bool),
    DnsCacheTimeout(Duration),
    /// Chunk size for body delivery.
    BufferSize(usize),
    TcpKeepAlive(bool),
    TcpKeepIdle(Duration),
    TcpKeepIntvl(Duration),
    /// Maximum cached connections per handle.
    MaxConnects(usize),
    /// Maximum idle time of a cached connection.
    MaxAgeConn(Duration),
    /// Maximum total lifetime of a cached connection.
    MaxLifetimeConn(Duration),
    FreshConnect(bool),
    ForbidReuse(bool),
    Proxy(Option<String>),
    HttpVersion(Option<HttpVersion>),
    NoBody(bool),
    Post(bool),
    Upload(bool),
    PostFields(Bytes),
    PostFieldSize(u64),
    CustomRequest(String),
    /// Extra request headers as `Name: value` lines.
    HttpHeader(Vec<String>),
    /// Write the response header block into the body sink too.
    IncludeHeader(bool),
    WriteSink(Arc<dyn BodySink>),
    HeaderSink(Arc<dyn HeaderSink>),
}

impl HandleOption {
    /// Name used in configuration errors.
    pub fn name(&self) -> &'static str {
        match self {
            HandleOption::Url(_) => "URL",
            HandleOption::Impersonate { .. } => "impersonation",
            HandleOption::ConnectTimeout(_) => "connect timeout",
            HandleOption::Timeout(_) => "timeout",
            HandleOption::SslVerifyPeer(_) => "SSL verify peer",
            HandleOption::SslVerifyHost(_) => "SSL verify host",
            HandleOption::DnsCacheTimeout(_) => "DNS cache timeout",
            HandleOption::BufferSize(_) => "buffer size",
            HandleOption::TcpKeepAlive(_) => "TCP keep-alive",
            HandleOption::TcpKeepIdle(_) => "TCP keep-alive idle",
            HandleOption::TcpKeepIntvl(_) => "TCP keep-alive interval",
            HandleOption::MaxConnects(_) => "max connections",
            HandleOption::MaxAgeConn(_) => "max connection age",
            HandleOption::MaxLifetimeConn(_) => "max connection lifetime",
            HandleOption::FreshConnect(_) => "fresh connect",
            HandleOption::ForbidReuse(_) => "forbid reuse",
            HandleOption::Proxy(_) => "proxy",
            HandleOption::HttpVersion(_) => "HTTP version",
            HandleOption::NoBody(_) => "NOBODY",
            HandleOption::Post(_) => "POST",
            HandleOption::Upload(_) => "UPLOAD",
            HandleOption::PostFields(_) => "POST fields",
            HandleOption::PostFieldSize(_) => "POST field size",
            HandleOption::CustomRequest(_) => "custom request",
            HandleOption::HttpHeader(_) => "headers",
            HandleOption::IncludeHeader(_) => "include header",
            HandleOption::WriteSink(_) => "write function",
            HandleOption::HeaderSink(_) => "header function",
        }
    }
}

impl fmt::Debug for HandleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleOption::PostFields(body) => write!(f, "PostFields({} bytes)", body.len()),
            HandleOption::WriteSink(_) => f.write_str("WriteSink(..)"),
            HandleOption::HeaderSink(_) => f.write_str("HeaderSink(..)"),
            HandleOption::Proxy(Some(_)) => f.write_str("Proxy(Some(..))"),
            HandleOption::Url(url) => write!(f, "Url({url:?})"),
            HandleOption::Impersonate { target, default_headers } => f
                .debug_struct("Impersonate")
                .field("target", target)
                .field("default_headers", default_headers)
                .finish(),
            HandleOption::HttpHeader(lines) => write!(f, "HttpHeader({} lines)", lines.len()),
            other => f.write_str(other.name()),
        }
    }
}

/// A reusable, option-configured request executor.
///
/// Implementations are used by one request at a time; the pool guarantees
/// exclusive access.
pub trait Handle: Send + Sized + 'static {
    /// Create a fresh handle with engine defaults.
    fn open() -> Result<Self, NetError>;

    /// Set one option. Rejected values yield [`NetError::InvalidOption`].
    fn set_option(&mut self, option: HandleOption) -> Result<(), NetError>;

    /// Execute the configured exchange, streaming into the installed sinks.
    fn perform(&mut self) -> impl Future<Output = Result<(), NetError>> + Send;

    /// Status code of the last completed exchange.
    fn response_code(&self) -> Option<u16>;

    /// `Content-Type` of the last completed exchange.
    fn content_type(&self) -> Option<String>;

    /// Clear every option back to engine defaults.
    ///
    /// Live connections a handle keeps for reuse survive a reset.
    fn reset(&mut self);
}
