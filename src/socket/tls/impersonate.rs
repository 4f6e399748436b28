use super::{TlsOptions, TlsVersion};
use crate::base::neterror::PerformError;
use http::{header, HeaderMap, HeaderValue};
use std::fmt;
use std::str::FromStr;

/// Browser identities a handle can impersonate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImpersonateTarget {
    /// Chrome 136 (latest stable)
    #[default]
    Chrome136,
    /// Firefox 102
    Firefox102,
    /// Safari 17.0
    Safari17_0,
    /// Edge 122
    Edge122,
}

/// HTTP/2 connection settings sent by a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Http2Settings {
    pub initial_stream_window_size: u32,
    pub initial_connection_window_size: u32,
    pub max_header_list_size: u32,
}

impl ImpersonateTarget {
    pub const ALL: [ImpersonateTarget; 4] = [
        ImpersonateTarget::Chrome136,
        ImpersonateTarget::Firefox102,
        ImpersonateTarget::Safari17_0,
        ImpersonateTarget::Edge122,
    ];

    /// Identifier accepted by the `Impersonate` handle option.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome136 => "chrome136",
            Self::Firefox102 => "firefox102",
            Self::Safari17_0 => "safari17_0",
            Self::Edge122 => "edge122",
        }
    }

    /// Create the TLS options for this target.
    pub fn tls_options(&self) -> TlsOptions {
        match self {
            Self::Chrome136 | Self::Edge122 => chromium_options(),
            Self::Firefox102 => firefox_options(),
            Self::Safari17_0 => safari_options(),
        }
    }

    pub fn http2_settings(&self) -> Http2Settings {
        match self {
            Self::Chrome136 | Self::Edge122 => Http2Settings {
                initial_stream_window_size: 6_291_456,
                initial_connection_window_size: 15_728_640,
                max_header_list_size: 262_144,
            },
            Self::Firefox102 => Http2Settings {
                initial_stream_window_size: 131_072,
                initial_connection_window_size: 12_582_912,
                max_header_list_size: 65_536,
            },
            Self::Safari17_0 => Http2Settings {
                initial_stream_window_size: 2_097_152,
                initial_connection_window_size: 10_485_760,
                max_header_list_size: 65_536,
            },
        }
    }

    /// Headers the browser sends on a top-level navigation.
    pub fn default_headers(&self) -> HeaderMap {
        match self {
            Self::Chrome136 => chromium_headers("Google Chrome", "136", ""),
            Self::Edge122 => chromium_headers("Microsoft Edge", "122", " Edg/122.0.0.0"),
            Self::Firefox102 => firefox_headers(),
            Self::Safari17_0 => safari_headers(),
        }
    }
}

impl fmt::Display for ImpersonateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpersonateTarget {
    type Err = PerformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PerformError::UnsupportedTarget(s.to_string()))
    }
}

// --- Constants ---

// Chromium (Chrome / Edge)
const CHROMIUM_CIPHERS: &str = "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
    ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
    ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305:\
    ECDHE-RSA-AES128-SHA:ECDHE-RSA-AES256-SHA:\
    AES128-GCM-SHA256:AES256-GCM-SHA384:AES128-SHA:AES256-SHA";
const CHROMIUM_CURVES: &str = "X25519:P-256:P-384";
const CHROMIUM_SIGALGS: &str = "ecdsa_secp256r1_sha256:rsa_pss_rsae_sha256:rsa_pkcs1_sha256:\
    ecdsa_secp384r1_sha384:rsa_pss_rsae_sha384:rsa_pkcs1_sha384:\
    rsa_pss_rsae_sha512:rsa_pkcs1_sha512";

// Firefox
const FIREFOX_CIPHERS: &str = "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
    ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305:\
    ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
    ECDHE-ECDSA-AES256-SHA:ECDHE-ECDSA-AES128-SHA:\
    ECDHE-RSA-AES128-SHA:ECDHE-RSA-AES256-SHA:\
    AES128-GCM-SHA256:AES256-GCM-SHA384:AES128-SHA:AES256-SHA";
const FIREFOX_CURVES: &str = "X25519:P-256:P-384:P-521";
const FIREFOX_SIGALGS: &str = "ecdsa_secp256r1_sha256:ecdsa_secp384r1_sha384:ecdsa_secp521r1_sha512:\
    rsa_pss_rsae_sha256:rsa_pss_rsae_sha384:rsa_pss_rsae_sha512:\
    rsa_pkcs1_sha256:rsa_pkcs1_sha384:rsa_pkcs1_sha512:ecdsa_sha1:rsa_pkcs1_sha1";

// Safari
const SAFARI_CIPHERS: &str = "ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-ECDSA-AES128-GCM-SHA256:\
    ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-AES256-GCM-SHA384:\
    ECDHE-RSA-AES128-GCM-SHA256:ECDHE-RSA-CHACHA20-POLY1305:\
    ECDHE-ECDSA-AES256-SHA:ECDHE-ECDSA-AES128-SHA:\
    ECDHE-RSA-AES256-SHA:ECDHE-RSA-AES128-SHA:\
    AES256-GCM-SHA384:AES128-GCM-SHA256:AES256-SHA:AES128-SHA";
const SAFARI_CURVES: &str = "X25519:P-256:P-384:P-521";
const SAFARI_SIGALGS: &str = "ecdsa_secp256r1_sha256:rsa_pss_rsae_sha256:rsa_pkcs1_sha256:\
    ecdsa_secp384r1_sha384:ecdsa_sha1:rsa_pss_rsae_sha384:rsa_pkcs1_sha384:\
    rsa_pss_rsae_sha512:rsa_pkcs1_sha512:rsa_pkcs1_sha1";

fn chromium_options() -> TlsOptions {
    TlsOptions::builder()
        .alpn_protocols(&["h2", "http/1.1"])
        .cipher_list(CHROMIUM_CIPHERS)
        .curves_list(CHROMIUM_CURVES)
        .sigalgs_list(CHROMIUM_SIGALGS)
        .min_tls_version(TlsVersion::Tls12)
        .max_tls_version(TlsVersion::Tls13)
        .grease_enabled(true)
        .permute_extensions(true)
        .enable_ocsp_stapling(true)
        .enable_signed_cert_timestamps(true)
        .build()
}

fn firefox_options() -> TlsOptions {
    TlsOptions::builder()
        .alpn_protocols(&["h2", "http/1.1"])
        .cipher_list(FIREFOX_CIPHERS)
        .curves_list(FIREFOX_CURVES)
        .sigalgs_list(FIREFOX_SIGALGS)
        .min_tls_version(TlsVersion::Tls12)
        .max_tls_version(TlsVersion::Tls13)
        .enable_ocsp_stapling(true)
        .build()
}

fn safari_options() -> TlsOptions {
    TlsOptions::builder()
        .alpn_protocols(&["h2", "http/1.1"])
        .cipher_list(SAFARI_CIPHERS)
        .curves_list(SAFARI_CURVES)
        .sigalgs_list(SAFARI_SIGALGS)
        .min_tls_version(TlsVersion::Tls10)
        .max_tls_version(TlsVersion::Tls13)
        .session_ticket(false)
        .grease_enabled(true)
        .enable_ocsp_stapling(true)
        .enable_signed_cert_timestamps(true)
        .build()
}

fn chromium_headers(brand: &str, major: &str, ua_suffix: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let ua = format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36{}",
        major, ua_suffix
    );
    if let Ok(val) = HeaderValue::from_str(&format!(
        "\"Chromium\";v=\"{major}\", \"{brand}\";v=\"{major}\", \"Not.A/Brand\";v=\"99\""
    )) {
        headers.insert("sec-ch-ua", val);
    }
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    if let Ok(val) = HeaderValue::from_str(&ua) {
        headers.insert(header::USER_AGENT, val);
    }
    headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br, zstd"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    headers
}

fn firefox_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:102.0) Gecko/20100101 Firefox/102.0",
        ),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::TE, HeaderValue::from_static("trailers"));
    headers
}

fn safari_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers
}
