use super::TlsVersion;
use crate::base::neterror::PerformError;
use boring::ssl::{SslConnectorBuilder, SslOptions};

/// Builder for `TlsOptions`.
#[must_use]
#[derive(Debug, Clone)]
pub struct TlsOptionsBuilder {
    config: TlsOptions,
}

/// TLS ClientHello shaping for one impersonation preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// ALPN protocols, in preference order.
    pub alpn_protocols: Vec<String>,

    /// Minimum TLS version.
    pub min_tls_version: Option<TlsVersion>,

    /// Maximum TLS version.
    pub max_tls_version: Option<TlsVersion>,

    /// Enable session tickets.
    pub session_ticket: bool,

    /// Cipher suite configuration string (TLS 1.2 and below).
    pub cipher_list: Option<String>,

    /// Supported curves list.
    pub curves_list: Option<String>,

    /// Supported signature algorithms.
    pub sigalgs_list: Option<String>,

    /// Enable OCSP stapling.
    pub enable_ocsp_stapling: bool,

    /// Enable Signed Certificate Timestamps (SCT).
    pub enable_signed_cert_timestamps: bool,

    /// Enable GREASE.
    pub grease_enabled: bool,

    /// Permute ClientHello extensions.
    pub permute_extensions: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            alpn_protocols: vec!["h2".to_string(), "http/1.1".to_string()],
            min_tls_version: Some(TlsVersion::Tls12),
            max_tls_version: Some(TlsVersion::Tls13),
            session_ticket: true,
            cipher_list: None,
            curves_list: None,
            sigalgs_list: None,
            enable_ocsp_stapling: false,
            enable_signed_cert_timestamps: false,
            grease_enabled: false,
            permute_extensions: false,
        }
    }
}

impl Default for TlsOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsOptionsBuilder {
    pub fn new() -> Self {
        Self {
            config: TlsOptions::default(),
        }
    }

    pub fn alpn_protocols(mut self, alpn: &[&str]) -> Self {
        self.config.alpn_protocols = alpn.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn min_tls_version(mut self, version: TlsVersion) -> Self {
        self.config.min_tls_version = Some(version);
        self
    }

    pub fn max_tls_version(mut self, version: TlsVersion) -> Self {
        self.config.max_tls_version = Some(version);
        self
    }

    pub fn cipher_list(mut self, ciphers: &str) -> Self {
        self.config.cipher_list = Some(ciphers.to_string());
        self
    }

    pub fn curves_list(mut self, curves: &str) -> Self {
        self.config.curves_list = Some(curves.to_string());
        self
    }

    pub fn sigalgs_list(mut self, sigalgs: &str) -> Self {
        self.config.sigalgs_list = Some(sigalgs.to_string());
        self
    }

    pub fn grease_enabled(mut self, enabled: bool) -> Self {
        self.config.grease_enabled = enabled;
        self
    }

    pub fn permute_extensions(mut self, permute: bool) -> Self {
        self.config.permute_extensions = permute;
        self
    }

    pub fn enable_ocsp_stapling(mut self, enabled: bool) -> Self {
        self.config.enable_ocsp_stapling = enabled;
        self
    }

    pub fn enable_signed_cert_timestamps(mut self, enabled: bool) -> Self {
        self.config.enable_signed_cert_timestamps = enabled;
        self
    }

    pub fn session_ticket(mut self, enabled: bool) -> Self {
        self.config.session_ticket = enabled;
        self
    }

    pub fn build(self) -> TlsOptions {
        self.config
    }
}

impl TlsOptions {
    pub fn builder() -> TlsOptionsBuilder {
        TlsOptionsBuilder::new()
    }

    /// Same preset restricted to a single ALPN protocol.
    pub fn with_alpn(mut self, protocol: &str) -> Self {
        self.alpn_protocols = vec![protocol.to_string()];
        self
    }

    /// ALPN protocol list in wire format (length-prefixed).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, PerformError> {
        let mut alpn_wire = Vec::new();
        for proto in &self.alpn_protocols {
            let len = u8::try_from(proto.len()).map_err(|_| PerformError::SslProtocolError)?;
            alpn_wire.push(len);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(alpn_wire)
    }

    /// Apply this configuration to an SSL connector builder.
    ///
    /// Certificate verification is left to the caller.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), PerformError> {
        if let Some(min) = self.min_tls_version {
            builder
                .set_min_proto_version(Some(min.as_ssl_version()))
                .map_err(|_| PerformError::SslProtocolError)?;
        }
        if let Some(max) = self.max_tls_version {
            builder
                .set_max_proto_version(Some(max.as_ssl_version()))
                .map_err(|_| PerformError::SslProtocolError)?;
        }

        if let Some(ciphers) = &self.cipher_list {
            builder
                .set_cipher_list(ciphers)
                .map_err(|_| PerformError::SslProtocolError)?;
        }

        if !self.alpn_protocols.is_empty() {
            builder
                .set_alpn_protos(&self.alpn_wire()?)
                .map_err(|_| PerformError::SslProtocolError)?;
        }

        if let Some(sigalgs) = &self.sigalgs_list {
            builder
                .set_sigalgs_list(sigalgs)
                .map_err(|_| PerformError::SslProtocolError)?;
        }

        if let Some(curves) = &self.curves_list {
            builder
                .set_curves_list(curves)
                .map_err(|_| PerformError::SslProtocolError)?;
        }

        if !self.session_ticket {
            builder.set_options(SslOptions::NO_TICKET);
        }
        if self.enable_ocsp_stapling {
            builder.enable_ocsp_stapling();
        }
        if self.enable_signed_cert_timestamps {
            builder.enable_signed_cert_timestamps();
        }
        builder.set_grease_enabled(self.grease_enabled);
        builder.set_permute_extensions(self.permute_extensions);

        Ok(())
    }
}
