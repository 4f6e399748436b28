//! TLS configuration and browser impersonation presets.

use boring::ssl::SslVersion;

pub mod impersonate;
pub mod options;

pub use self::impersonate::{Http2Settings, ImpersonateTarget};
pub use self::options::{TlsOptions, TlsOptionsBuilder};

/// TLS protocol version bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub fn as_ssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }
}

/// Per RFC 6066, SNI must not be sent for IP literals.
pub fn should_set_sni(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .is_err()
}
