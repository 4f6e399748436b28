use thiserror::Error;

/// Failures raised by a handle while performing an exchange.
///
/// Mirrors the subset of Chromium's `net_error_list.h` that a single
/// request/response exchange can produce.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PerformError {
    // Connection Errors
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection reset")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Operation timed out")]
    TimedOut,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Tunnel connection failed")]
    TunnelConnectionFailed,
    #[error("Proxy connection failed")]
    ProxyConnectionFailed,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("No URL set on handle")]
    NoUrl,
    #[error("Invalid HTTP response")]
    InvalidResponse,
    #[error("HTTP/2 protocol error")]
    Http2ProtocolError,
    #[error("Failed to read response body")]
    BodyReadFailed,

    // Impersonation
    #[error("Unsupported impersonation target: {0}")]
    UnsupportedTarget(String),
}

impl PerformError {
    pub fn as_i32(&self) -> i32 {
        match self {
            PerformError::ConnectionClosed => -100,
            PerformError::ConnectionReset => -101,
            PerformError::ConnectionRefused => -102,
            PerformError::ConnectionFailed => -104,
            PerformError::NameNotResolved => -105,
            PerformError::SslProtocolError => -107,
            PerformError::TunnelConnectionFailed => -111,
            PerformError::ConnectionTimedOut => -118,
            PerformError::ProxyConnectionFailed => -130,
            PerformError::TimedOut => -7,
            PerformError::InvalidUrl => -300,
            PerformError::UnknownUrlScheme => -302,
            PerformError::NoUrl => -300,
            PerformError::InvalidResponse => -320,
            PerformError::Http2ProtocolError => -337,
            PerformError::BodyReadFailed => -310,
            PerformError::UnsupportedTarget(_) => -11,
        }
    }

    /// Map an I/O failure on a socket to the closest error code.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused => PerformError::ConnectionRefused,
            ErrorKind::ConnectionReset => PerformError::ConnectionReset,
            ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => PerformError::ConnectionClosed,
            ErrorKind::TimedOut => PerformError::ConnectionTimedOut,
            _ => PerformError::ConnectionFailed,
        }
    }
}

/// Coarse classification of a [`NetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request was unusable before any resource was acquired.
    Precondition,
    /// A handle rejected an option.
    Configuration,
    /// The exchange itself failed.
    Execution,
    /// A response could not be decoded.
    Parse,
    /// No usable handle could be produced.
    Resource,
}

/// Error returned by every transport and client operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    #[error("request cannot be nil")]
    NilRequest,
    #[error("request URL cannot be nil")]
    MissingUrl,
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("failed to set {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("request failed: {0}")]
    Perform(#[from] PerformError),
    #[error("failed to get {0}")]
    MissingResponseInfo(&'static str),
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),
    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("failed to separate headers and body in response")]
    MalformedResponse,
    #[error("response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("failed to parse JSON body: {0}")]
    JsonParse(String),

    #[error("failed to get connection handle: {0}")]
    HandleUnavailable(String),
}

impl NetError {
    /// Shorthand for a rejected handle option.
    pub fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        NetError::InvalidOption { option, reason: reason.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NetError::NilRequest
            | NetError::MissingUrl
            | NetError::InvalidUrl(_)
            | NetError::RequestBody(_) => ErrorCategory::Precondition,
            NetError::InvalidOption { .. } => ErrorCategory::Configuration,
            NetError::Perform(_)
            | NetError::MissingResponseInfo(_)
            | NetError::TooManyRedirects(_) => ErrorCategory::Execution,
            NetError::MalformedResponse
            | NetError::InvalidUtf8
            | NetError::JsonParse(_)
            | NetError::InvalidRedirect(_) => ErrorCategory::Parse,
            NetError::HandleUnavailable(_) => ErrorCategory::Resource,
        }
    }

    /// True if the exchange failed because a connect or overall timeout fired.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            NetError::Perform(PerformError::TimedOut | PerformError::ConnectionTimedOut)
        )
    }

    /// The underlying execution error, if any.
    pub fn perform_error(&self) -> Option<&PerformError> {
        match self {
            NetError::Perform(e) => Some(e),
            _ => None,
        }
    }
}
