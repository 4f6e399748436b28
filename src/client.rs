//! HTTP client façade over a pooled [`Transport`].
//!
//! A `Client` can be used without any setup: `Client::default()` creates
//! its transport on first use.
//!
//! # Example
//!
//! ```rust,ignore
//! use mimicnet::Client;
//!
//! let client = Client::with_target("firefox102");
//! let resp = client.get("https://example.com").await?;
//! println!("{}", resp.status_text());
//! ```

use crate::base::neterror::{NetError, PerformError};
use crate::handle::HandleConfig;
use crate::http::request::{read_body, RequestTimeout};
use crate::http::response::HttpResponse;
use crate::redirect::{self, RedirectPolicy};
use crate::transport::Transport;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, REFERER};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};
use http_body::Body;
use http_body_util::{Empty, Full};
use std::fmt::Display;
use std::sync::{Arc, LazyLock, OnceLock};
use std::time::{Duration, Instant};

/// Per-request timeout applied when a request carries none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

static DEFAULT_CLIENT: LazyLock<Client> = LazyLock::new(Client::new);

#[derive(Debug, Clone)]
struct ClientInner {
    transport: Arc<Transport>,
    timeout: Duration,
    redirect: RedirectPolicy,
}

impl Default for ClientInner {
    fn default() -> Self {
        Self {
            transport: Arc::new(Transport::new()),
            timeout: DEFAULT_TIMEOUT,
            redirect: RedirectPolicy::default(),
        }
    }
}

/// HTTP client for making requests.
///
/// Cloning is cheap; clones share one transport and its handle pool.
#[derive(Debug, Clone, Default)]
pub struct Client {
    inner: OnceLock<ClientInner>,
}

impl Client {
    /// Create a client with Chrome 136 impersonation, a 30 s timeout and up
    /// to 10 followed redirects.
    pub fn new() -> Self {
        Self::from_inner(ClientInner::default())
    }

    /// Create a client impersonating `target`.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self::builder().impersonate(target).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: OnceLock::from(inner),
        }
    }

    fn inner(&self) -> &ClientInner {
        self.inner.get_or_init(|| {
            tracing::debug!("initializing default client transport");
            ClientInner::default()
        })
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.inner().transport
    }

    pub fn timeout(&self) -> Duration {
        self.inner().timeout
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        self.inner().redirect
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        self.request(Method::GET, url).send().await
    }

    /// Send a HEAD request.
    pub async fn head(&self, url: &str) -> Result<HttpResponse, NetError> {
        self.request(Method::HEAD, url).send().await
    }

    /// Send a POST request with `body` as `content_type`.
    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, NetError> {
        self.request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
    }

    /// Send a POST request with `pairs` URL-encoded as the body.
    pub async fn post_form<K, V>(&self, url: &str, pairs: &[(K, V)]) -> Result<HttpResponse, NetError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        self.post(url, FORM_CONTENT_TYPE, form).await
    }

    /// Send a PUT request with `body` as `content_type`.
    pub async fn put(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, NetError> {
        self.request(Method::PUT, url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, url: &str) -> Result<HttpResponse, NetError> {
        self.request(Method::DELETE, url).send().await
    }

    /// Start building a request with any method.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder {
            client: self.clone_initialized(),
            method,
            url: url.to_string(),
            headers: http::HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Execute a prepared request, following redirects per the client's
    /// [`RedirectPolicy`].
    ///
    /// The client timeout applies unless the request already carries a
    /// [`RequestTimeout`]; either way it bounds the whole redirect chain.
    pub async fn execute<B>(&self, request: Request<B>) -> Result<HttpResponse, NetError>
    where
        B: Body,
        B::Error: Display,
    {
        let inner = self.inner();
        let (mut parts, body) = request.into_parts();
        let body = read_body(body).await?;
        let timeout = parts
            .extensions
            .get::<RequestTimeout>()
            .map_or(inner.timeout, |t| t.0);
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let set_referer = !parts.headers.contains_key(REFERER);
        let mut body = body.unwrap_or_default();
        let mut hops = 0;

        loop {
            let hop_timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(PerformError::TimedOut.into());
                    }
                    remaining
                }
                None => timeout,
            };
            parts.extensions.insert(RequestTimeout(hop_timeout));
            let (method, uri, mut headers) =
                (parts.method.clone(), parts.uri.clone(), parts.headers.clone());
            let response = inner
                .transport
                .execute(Request::from_parts(parts, Full::new(body.clone())))
                .await?;

            let RedirectPolicy::Limited(limit) = inner.redirect else {
                return Ok(response);
            };
            let Some(next) = redirect::next_hop(response.status(), response.headers(), &method, &uri)?
            else {
                return Ok(response);
            };
            if hops == limit {
                return Err(NetError::TooManyRedirects(limit));
            }
            hops += 1;
            tracing::debug!(status = %response.status(), location = %next.uri, hops, "following redirect");

            redirect::carry_headers(&mut headers, &uri, &next, set_referer);
            if !next.keep_body {
                body = Bytes::new();
            }
            parts = hop_parts(next.method, next.uri, headers)?;
        }
    }

    // A zero-value client must not hand an uninitialised copy to a builder,
    // or the copy would create a second transport.
    fn clone_initialized(&self) -> Client {
        Self::from_inner(self.inner().clone())
    }
}

fn hop_parts(method: Method, uri: Uri, headers: HeaderMap) -> Result<Parts, NetError> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(slot) = builder.headers_mut() {
        *slot = headers;
    }
    let (parts, ()) = builder
        .body(())
        .map_err(|e| NetError::InvalidRedirect(e.to_string()))?
        .into_parts();
    Ok(parts)
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    transport: Option<Arc<Transport>>,
    config: Option<HandleConfig>,
    target: Option<String>,
    timeout: Option<Duration>,
    redirect: Option<RedirectPolicy>,
}

impl ClientBuilder {
    /// Use an existing transport; takes precedence over `config`/`impersonate`.
    #[must_use]
    pub fn transport(mut self, transport: Arc<Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Handle configuration for a new transport.
    #[must_use]
    pub fn config(mut self, config: HandleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Browser to impersonate; overrides the target in `config`.
    #[must_use]
    pub fn impersonate(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Default per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Redirect handling; defaults to following up to 10 redirects.
    #[must_use]
    pub fn redirect(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = Some(policy);
        self
    }

    pub fn build(self) -> Client {
        let transport = self.transport.unwrap_or_else(|| {
            let mut config = self.config.unwrap_or_default();
            if let Some(target) = self.target {
                config.impersonate_target = target;
            }
            Arc::new(Transport::with_config(config))
        });
        let timeout = self
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);
        Client::from_inner(ClientInner {
            transport,
            timeout,
            redirect: self.redirect.unwrap_or_default(),
        })
    }
}

/// Builder for a single request.
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: http::HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    /// Add a header. Invalid values are ignored.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: http::header::IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        if let Ok(val) = value.try_into() {
            self.headers.append(key, val);
        }
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and content type.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, json: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(json) {
            self.body = Some(Bytes::from(bytes));
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self
    }

    /// Override the client timeout for this request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send the request.
    pub async fn send(self) -> Result<HttpResponse, NetError> {
        let mut builder = Request::builder().method(self.method).uri(self.url.as_str());
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        if let Some(timeout) = self.timeout {
            builder = builder.extension(RequestTimeout(timeout));
        }
        match self.body {
            Some(body) => {
                let request = builder
                    .body(Full::new(body))
                    .map_err(|e| NetError::InvalidUrl(e.to_string()))?;
                self.client.execute(request).await
            }
            None => {
                let request = builder
                    .body(Empty::<Bytes>::new())
                    .map_err(|e| NetError::InvalidUrl(e.to_string()))?;
                self.client.execute(request).await
            }
        }
    }
}

/// The process-wide client used by the free functions in this module.
pub fn default_client() -> &'static Client {
    &DEFAULT_CLIENT
}

/// GET with the default client.
pub async fn get(url: &str) -> Result<HttpResponse, NetError> {
    default_client().get(url).await
}

/// HEAD with the default client.
pub async fn head(url: &str) -> Result<HttpResponse, NetError> {
    default_client().head(url).await
}

/// POST with the default client.
pub async fn post(
    url: &str,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Result<HttpResponse, NetError> {
    default_client().post(url, content_type, body).await
}

/// Form POST with the default client.
pub async fn post_form<K, V>(url: &str, pairs: &[(K, V)]) -> Result<HttpResponse, NetError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    default_client().post_form(url, pairs).await
}

/// Execute a prepared request with the default client.
pub async fn execute<B>(request: Request<B>) -> Result<HttpResponse, NetError>
where
    B: Body,
    B::Error: Display,
{
    default_client().execute(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_value_client_initializes_once() {
        let client = Client::default();
        assert!(client.inner.get().is_none());
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert_eq!(client.redirect_policy(), RedirectPolicy::Limited(10));
        let first = Arc::as_ptr(client.transport());
        assert_eq!(first, Arc::as_ptr(client.transport()));
        assert_eq!(client.transport().config().impersonate_target, "chrome136");
    }

    #[test]
    fn test_zero_value_concurrent_first_use() {
        let client = Arc::new(Client::default());
        let ptrs: Vec<usize> = (0..8)
            .map(|_| {
                let client = client.clone();
                std::thread::spawn(move || Arc::as_ptr(client.transport()) as usize)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_request_builder_shares_transport() {
        let client = Client::default();
        let builder = client.request(Method::GET, "http://example.com/");
        assert!(Arc::ptr_eq(builder.client.transport(), client.transport()));
    }

    #[test]
    fn test_builder() {
        let client = Client::builder()
            .impersonate("edge122")
            .timeout(Duration::from_secs(5))
            .build();
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.transport().config().impersonate_target, "edge122");

        let shared = Arc::new(Transport::with_target("firefox102"));
        let client = Client::builder().transport(shared.clone()).build();
        assert!(Arc::ptr_eq(client.transport(), &shared));
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = Client::builder().redirect(RedirectPolicy::None).build();
        assert_eq!(client.redirect_policy(), RedirectPolicy::None);
    }

    #[test]
    fn test_default_client_is_shared() {
        assert!(std::ptr::eq(default_client(), default_client()));
        assert_eq!(default_client().transport().config().pool_size, 10);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = Client::new().get("not a url").await.unwrap_err();
        assert!(matches!(err, NetError::InvalidUrl(_)));
        let err = Client::new().get("/relative/only").await.unwrap_err();
        assert_eq!(err.to_string(), "request URL cannot be nil");
    }
}
