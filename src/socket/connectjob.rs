use crate::base::init::ensure_initialized;
use crate::base::neterror::PerformError;
use crate::socket::client::SocketType;
use crate::socket::proxy::{ProxySettings, ProxyType};
use crate::socket::tls::{should_set_sni, TlsOptions};
use boring::ssl::{SslConnector, SslMethod, SslVerifyMode};
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Upper bound on a proxy's CONNECT response head.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Everything a connect attempt needs from the handle's option state.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub dns_cache_ttl: Duration,
    /// `(idle, interval)` for TCP keep-alive probes; `None` leaves the OS default.
    pub keepalive: Option<(Duration, Duration)>,
    pub recv_buffer_size: Option<usize>,
    pub proxy: Option<ProxySettings>,
    pub tls: TlsOptions,
    pub verify_peer: bool,
    pub verify_host: bool,
}

/// Outcome of a successful connect.
#[derive(Debug)]
pub struct Connected {
    pub socket: SocketType,
    /// TLS negotiated `h2` via ALPN.
    pub is_h2: bool,
    /// Plain-HTTP request routed through a forward proxy; requests must use
    /// absolute-form targets and carry proxy credentials.
    pub via_forward_proxy: bool,
}

/// Manages the connection process: DNS -> TCP -> (proxy tunnel) -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    /// Connect to the origin of `url`, bounded by `options.connect_timeout`.
    pub async fn connect(url: &Url, options: &ConnectOptions) -> Result<Connected, PerformError> {
        match tokio::time::timeout(options.connect_timeout, Self::connect_inner(url, options)).await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(url = %url, timeout = ?options.connect_timeout, "connect timed out");
                Err(PerformError::ConnectionTimedOut)
            }
        }
    }

    async fn connect_inner(url: &Url, options: &ConnectOptions) -> Result<Connected, PerformError> {
        let is_https = match url.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(PerformError::UnknownUrlScheme),
        };
        let target_host = url.host_str().ok_or(PerformError::InvalidUrl)?;
        let target_port = url.port_or_known_default().ok_or(PerformError::InvalidUrl)?;

        let proxy = match &options.proxy {
            Some(p) if p.proxy_type() == ProxyType::Http => Some(p),
            Some(p) => {
                tracing::debug!(proxy = %p.url, "unsupported proxy scheme");
                return Err(PerformError::ProxyConnectionFailed);
            }
            None => None,
        };

        // 1. DNS + TCP, to the proxy when one is configured.
        let (dial_host, dial_port) = match proxy {
            Some(p) => p.host_port().ok_or(PerformError::ProxyConnectionFailed)?,
            None => (target_host, target_port),
        };
        let mut stream = Self::dial(dial_host, dial_port, options).await.map_err(|e| {
            if proxy.is_some() {
                PerformError::ProxyConnectionFailed
            } else {
                e
            }
        })?;

        // 2. Proxy handshake. HTTPS targets are tunnelled; plain HTTP is sent
        //    in absolute-form straight to the proxy.
        if let Some(p) = proxy {
            if !is_https {
                return Ok(Connected {
                    socket: SocketType::Tcp(stream),
                    is_h2: false,
                    via_forward_proxy: true,
                });
            }
            Self::establish_tunnel(&mut stream, target_host, target_port, p).await?;
        }

        if !is_https {
            return Ok(Connected {
                socket: SocketType::Tcp(stream),
                is_h2: false,
                via_forward_proxy: false,
            });
        }

        // 3. TLS handshake, always after any tunnel is established.
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| PerformError::SslProtocolError)?;
        options.tls.apply_to_builder(&mut builder)?;
        builder.set_verify(if options.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });

        let connector = builder.build();
        let mut config = connector.configure().map_err(|_| PerformError::SslProtocolError)?;
        config.set_verify_hostname(options.verify_peer && options.verify_host);
        config.set_use_server_name_indication(should_set_sni(target_host));

        let tls_stream = tokio_boring::connect(config, target_host, stream)
            .await
            .map_err(|e| {
                tracing::debug!(host = %target_host, error = ?e, "TLS handshake failed");
                PerformError::SslProtocolError
            })?;

        let is_h2 = tls_stream.ssl().selected_alpn_protocol() == Some(b"h2".as_slice());
        tracing::debug!(host = %target_host, h2 = is_h2, "TLS connection established");

        Ok(Connected {
            socket: SocketType::Ssl(tls_stream),
            is_h2,
            via_forward_proxy: false,
        })
    }

    async fn dial(host: &str, port: u16, options: &ConnectOptions) -> Result<TcpStream, PerformError> {
        let addrs = ensure_initialized()
            .host_cache()
            .resolve(host, port, options.dns_cache_ttl)
            .await?;

        let mut last_err = PerformError::ConnectionFailed;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    Self::tune_socket(&stream, options);
                    tracing::debug!(%addr, "TCP connection established");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "TCP connect failed");
                    last_err = PerformError::from_io(&e);
                }
            }
        }
        Err(last_err)
    }

    /// Socket tuning is best-effort; the OS may clamp or refuse values.
    fn tune_socket(stream: &TcpStream, options: &ConnectOptions) {
        let _ = stream.set_nodelay(true);
        let sock = SockRef::from(stream);
        if let Some((idle, interval)) = options.keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle).with_interval(interval);
            if let Err(e) = sock.set_tcp_keepalive(&keepalive) {
                tracing::trace!(error = %e, "failed to enable TCP keep-alive");
            }
        }
        if let Some(size) = options.recv_buffer_size {
            if let Err(e) = sock.set_recv_buffer_size(size) {
                tracing::trace!(error = %e, size, "failed to set receive buffer size");
            }
        }
    }

    async fn establish_tunnel(
        stream: &mut TcpStream,
        host: &str,
        port: u16,
        proxy: &ProxySettings,
    ) -> Result<(), PerformError> {
        let target = format!("{}:{}", host, port);
        let mut connect_req = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
        if let Some(auth) = proxy.auth_header() {
            connect_req.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
        }
        connect_req.push_str("\r\n");

        stream
            .write_all(connect_req.as_bytes())
            .await
            .map_err(|_| PerformError::TunnelConnectionFailed)?;

        // Read exactly the response head; anything after it belongs to TLS.
        let mut head = Vec::with_capacity(256);
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            if head.len() >= MAX_TUNNEL_RESPONSE {
                return Err(PerformError::TunnelConnectionFailed);
            }
            let n = stream
                .read(&mut byte)
                .await
                .map_err(|_| PerformError::TunnelConnectionFailed)?;
            if n == 0 {
                return Err(PerformError::TunnelConnectionFailed);
            }
            head.push(byte[0]);
        }

        let status_line = String::from_utf8_lossy(&head);
        let status = status_line.split_whitespace().nth(1);
        if status != Some("200") {
            tracing::debug!(proxy = %proxy.url, status = ?status, "proxy refused tunnel");
            return Err(PerformError::TunnelConnectionFailed);
        }
        Ok(())
    }
}
