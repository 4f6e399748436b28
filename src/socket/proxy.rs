use crate::base::neterror::NetError;
use url::Url;
use zeroize::Zeroizing;

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    /// HTTP proxy (CONNECT for HTTPS targets, absolute-form for HTTP targets)
    Http,
    /// HTTPS proxy (TLS to proxy)
    Https,
    /// SOCKS proxy
    Socks5,
}

/// Proxy endpoint and credentials.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Proxy URL (e.g., `http://proxy.com:8080`)
    pub url: Url,
    /// Proxy username for authentication
    pub username: Option<String>,
    /// Proxy password (zeroized on drop)
    pub password: Option<Zeroizing<String>>,
}

impl PartialEq for ProxySettings {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.username == other.username
            && self.password.as_deref() == other.password.as_deref()
    }
}

impl Eq for ProxySettings {}

impl ProxySettings {
    /// Parse proxy settings from a URL string.
    ///
    /// A scheme-less value (`proxy.local:3128`) is treated as an HTTP proxy,
    /// and credentials embedded in the URL are lifted out of it.
    pub fn parse(url_str: &str) -> Result<Self, NetError> {
        let with_scheme = if url_str.contains("://") {
            url_str.to_string()
        } else {
            format!("http://{}", url_str)
        };
        let mut url = Url::parse(&with_scheme)
            .map_err(|e| NetError::invalid_option("proxy", e.to_string()))?;
        if url.host_str().is_none() {
            return Err(NetError::invalid_option("proxy", "proxy URL has no host"));
        }

        let username = (!url.username().is_empty()).then(|| url.username().to_string());
        let password = url.password().map(|p| Zeroizing::new(p.to_string()));
        // Url setters only fail for cannot-be-a-base URLs, which have no host.
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self {
            url,
            username,
            password,
        })
    }

    /// Proxy URL from `HTTPS_PROXY`/`https_proxy`/`HTTP_PROXY`/`http_proxy`.
    pub fn env_url() -> Option<String> {
        std::env::var("HTTPS_PROXY")
            .or_else(|_| std::env::var("https_proxy"))
            .or_else(|_| std::env::var("HTTP_PROXY"))
            .or_else(|_| std::env::var("http_proxy"))
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    /// Add authentication credentials.
    pub fn with_auth(mut self, user: &str, pass: &str) -> Self {
        self.username = Some(user.to_string());
        self.password = Some(Zeroizing::new(pass.to_string()));
        self
    }

    /// Get proxy type from URL scheme.
    pub fn proxy_type(&self) -> ProxyType {
        match self.url.scheme() {
            "https" => ProxyType::Https,
            "socks5" | "socks5h" | "socks4" | "socks4a" => ProxyType::Socks5,
            _ => ProxyType::Http,
        }
    }

    /// Get `Proxy-Authorization` header value for HTTP proxies.
    pub fn auth_header(&self) -> Option<String> {
        let user = self.username.as_ref()?;
        use base64::{engine::general_purpose, Engine as _};
        let pass = self.password.as_ref().map(|p| p.as_str()).unwrap_or("");
        let encoded = general_purpose::STANDARD.encode(format!("{}:{}", user, pass));
        Some(format!("Basic {}", encoded))
    }

    /// Get proxy host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let host = self.url.host_str()?;
        let port = self.url.port().unwrap_or(match self.proxy_type() {
            ProxyType::Http => 80,
            ProxyType::Https => 443,
            ProxyType::Socks5 => 1080,
        });
        Some((host, port))
    }
}
