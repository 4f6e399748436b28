//! Persistent handle configuration.
//!
//! A [`HandleConfig`] is normalised once with [`HandleConfig::with_defaults`]
//! when a transport is built, then applied to every handle the pool creates
//! and again after every reset.

use super::{Handle, HandleOption, HttpVersion};
use crate::base::neterror::NetError;
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::ImpersonateTarget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TARGET: &str = "chrome136";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DNS_CACHE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
pub const DEFAULT_KEEPALIVE_IDLE_SECS: u64 = 60;
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;
pub const DEFAULT_MAX_AGE_SECS: u64 = 300;
pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 600;
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Settings applied to every pooled handle.
///
/// Numeric fields use zero for "not set"; [`HandleConfig::with_defaults`]
/// replaces them with the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    /// Browser to impersonate, e.g. `"chrome136"`.
    pub impersonate_target: String,
    /// Send the browser's default request headers.
    pub use_default_headers: bool,
    /// Disable peer certificate verification.
    pub insecure_skip_verify: bool,
    /// Disable hostname verification.
    pub skip_hostname_verify: bool,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
    pub dns_cache_timeout_secs: u64,
    pub buffer_size: usize,
    pub keepalive_idle_secs: u64,
    pub keepalive_interval_secs: u64,
    pub max_connections: usize,
    pub max_age_secs: u64,
    pub max_lifetime_secs: u64,
    /// Proxy URL; `None` connects directly.
    pub proxy: Option<String>,
    /// Pin the protocol version; `None` negotiates.
    pub http_version: Option<HttpVersion>,
    /// Number of idle handles kept by the pool.
    pub pool_size: usize,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            impersonate_target: String::new(),
            use_default_headers: true,
            insecure_skip_verify: false,
            skip_hostname_verify: false,
            connect_timeout_ms: 0,
            timeout_ms: 0,
            dns_cache_timeout_secs: 0,
            buffer_size: 0,
            keepalive_idle_secs: 0,
            keepalive_interval_secs: 0,
            max_connections: 0,
            max_age_secs: 0,
            max_lifetime_secs: 0,
            proxy: None,
            http_version: None,
            pool_size: 0,
        }
    }
}

fn or_default<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() {
        default
    } else {
        value
    }
}

impl HandleConfig {
    pub fn builder() -> HandleConfigBuilder {
        HandleConfigBuilder::new()
    }

    /// Configuration for `target` with every other field defaulted.
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            impersonate_target: target.into(),
            ..Self::default()
        }
        .with_defaults()
    }

    /// Replace every unset field with its default.
    #[must_use]
    pub fn with_defaults(self) -> Self {
        let impersonate_target = if self.impersonate_target.trim().is_empty() {
            DEFAULT_TARGET.to_string()
        } else {
            self.impersonate_target
        };
        Self {
            impersonate_target,
            connect_timeout_ms: or_default(self.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS),
            timeout_ms: or_default(self.timeout_ms, DEFAULT_TIMEOUT_MS),
            dns_cache_timeout_secs: or_default(
                self.dns_cache_timeout_secs,
                DEFAULT_DNS_CACHE_TIMEOUT_SECS,
            ),
            buffer_size: or_default(self.buffer_size, DEFAULT_BUFFER_SIZE),
            keepalive_idle_secs: or_default(self.keepalive_idle_secs, DEFAULT_KEEPALIVE_IDLE_SECS),
            keepalive_interval_secs: or_default(
                self.keepalive_interval_secs,
                DEFAULT_KEEPALIVE_INTERVAL_SECS,
            ),
            max_connections: or_default(self.max_connections, DEFAULT_MAX_CONNECTIONS),
            max_age_secs: or_default(self.max_age_secs, DEFAULT_MAX_AGE_SECS),
            max_lifetime_secs: or_default(self.max_lifetime_secs, DEFAULT_MAX_LIFETIME_SECS),
            pool_size: or_default(self.pool_size, DEFAULT_POOL_SIZE),
            ..self
        }
    }

    /// Defaults plus a proxy taken from the `HTTPS_PROXY`/`HTTP_PROXY`
    /// environment variables.
    pub fn from_env() -> Self {
        Self {
            proxy: ProxySettings::env_url(),
            ..Self::default()
        }
        .with_defaults()
    }

    /// Load from JSON; missing fields are defaulted.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        serde_json::from_str::<Self>(json)
            .map(Self::with_defaults)
            .map_err(|e| NetError::invalid_option("configuration", e.to_string()))
    }

    /// Parse the configured target into a known browser preset.
    pub fn target(&self) -> Result<ImpersonateTarget, NetError> {
        self.impersonate_target.parse().map_err(NetError::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Set every persistent option on `handle`.
    ///
    /// Unset values are written too so a reapplication fully overwrites
    /// whatever a previous request left behind.
    pub fn apply<H: Handle>(&self, handle: &mut H) -> Result<(), NetError> {
        let options = [
            HandleOption::Impersonate {
                target: self.impersonate_target.clone(),
                default_headers: self.use_default_headers,
            },
            HandleOption::SslVerifyPeer(!self.insecure_skip_verify),
            HandleOption::SslVerifyHost(!self.skip_hostname_verify),
            HandleOption::ConnectTimeout(self.connect_timeout()),
            HandleOption::Timeout(self.timeout()),
            HandleOption::DnsCacheTimeout(Duration::from_secs(self.dns_cache_timeout_secs)),
            HandleOption::BufferSize(self.buffer_size),
            HandleOption::TcpKeepAlive(true),
            HandleOption::TcpKeepIdle(Duration::from_secs(self.keepalive_idle_secs)),
            HandleOption::TcpKeepIntvl(Duration::from_secs(self.keepalive_interval_secs)),
            HandleOption::MaxConnects(self.max_connections),
            HandleOption::MaxAgeConn(Duration::from_secs(self.max_age_secs)),
            HandleOption::MaxLifetimeConn(Duration::from_secs(self.max_lifetime_secs)),
            HandleOption::FreshConnect(false),
            HandleOption::ForbidReuse(false),
            HandleOption::Proxy(self.proxy.clone()),
            HandleOption::HttpVersion(self.http_version),
        ];
        for option in options {
            handle.set_option(option)?;
        }
        Ok(())
    }
}

/// Builder for [`HandleConfig`].
#[derive(Debug, Clone, Default)]
pub struct HandleConfigBuilder {
    config: HandleConfig,
}

impl HandleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn impersonate(mut self, target: impl Into<String>) -> Self {
        self.config.impersonate_target = target.into();
        self
    }

    #[must_use]
    pub fn default_headers(mut self, enabled: bool) -> Self {
        self.config.use_default_headers = enabled;
        self
    }

    #[must_use]
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.config.insecure_skip_verify = skip;
        self
    }

    #[must_use]
    pub fn skip_hostname_verify(mut self, skip: bool) -> Self {
        self.config.skip_hostname_verify = skip;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn dns_cache_timeout(mut self, ttl: Duration) -> Self {
        self.config.dns_cache_timeout_secs = ttl.as_secs();
        self
    }

    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    #[must_use]
    pub fn keepalive(mut self, idle: Duration, interval: Duration) -> Self {
        self.config.keepalive_idle_secs = idle.as_secs();
        self.config.keepalive_interval_secs = interval.as_secs();
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    #[must_use]
    pub fn max_age(mut self, age: Duration) -> Self {
        self.config.max_age_secs = age.as_secs();
        self
    }

    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.max_lifetime_secs = lifetime.as_secs();
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    #[must_use]
    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.config.http_version = Some(version);
        self
    }

    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Finish and normalise.
    pub fn build(self) -> HandleConfig {
        self.config.with_defaults()
    }
}
