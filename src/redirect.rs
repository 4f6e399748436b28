//! Redirect following for [`Client`](crate::Client).
//!
//! A `3xx` response with a `Location` header is followed with a new request
//! until a non-redirect response arrives or the policy's limit is hit.

use crate::base::neterror::NetError;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use url::Url;

/// Redirects followed by default before a request fails.
pub const DEFAULT_REDIRECT_LIMIT: usize = 10;

/// Headers that never follow a redirect to another origin.
const SENSITIVE_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    header::WWW_AUTHENTICATE,
    header::COOKIE,
    HeaderName::from_static("cookie2"),
];

/// How a client treats redirect responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Hand `3xx` responses back to the caller.
    None,
    /// Follow at most this many redirects; the next one fails with
    /// [`NetError::TooManyRedirects`].
    Limited(usize),
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Limited(DEFAULT_REDIRECT_LIMIT)
    }
}

/// Where a redirect response sends the request next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Redirect {
    pub method: Method,
    pub uri: Uri,
    /// False once the request has been turned into a bodiless GET.
    pub keep_body: bool,
}

/// Resolve the next hop for a response to `method current`.
///
/// 301, 302 and 303 turn every method but HEAD into GET and drop the body.
/// 307 and 308 repeat the request unchanged. Any other status, or a redirect
/// without `Location`, ends the chain.
pub(crate) fn next_hop(
    status: StatusCode,
    headers: &HeaderMap,
    method: &Method,
    current: &Uri,
) -> Result<Option<Redirect>, NetError> {
    let (method, keep_body) = match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
            let method = if *method == Method::HEAD {
                Method::HEAD
            } else {
                Method::GET
            };
            (method, false)
        }
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => (method.clone(), true),
        _ => return Ok(None),
    };
    let Some(location) = headers.get(header::LOCATION) else {
        return Ok(None);
    };
    let location = location
        .to_str()
        .map_err(|_| NetError::InvalidRedirect("Location is not visible ASCII".into()))?;

    let base = Url::parse(&current.to_string()).map_err(|e| NetError::InvalidUrl(e.to_string()))?;
    let mut next = base
        .join(location)
        .map_err(|e| NetError::InvalidRedirect(format!("{}: {}", location, e)))?;
    if !matches!(next.scheme(), "http" | "https") {
        return Err(NetError::InvalidRedirect(format!(
            "unsupported scheme {:?}",
            next.scheme()
        )));
    }
    next.set_fragment(None);
    let uri = next
        .as_str()
        .parse::<Uri>()
        .map_err(|e| NetError::InvalidRedirect(e.to_string()))?;

    Ok(Some(Redirect {
        method,
        uri,
        keep_body,
    }))
}

/// Adjust the request headers for the hop from `from` to `next`.
///
/// Body headers go with the body. Credentials are only kept on the same
/// host (or a subdomain of it) and port. `Referer` is refreshed unless the
/// caller set it or the hop downgrades https to http.
pub(crate) fn carry_headers(headers: &mut HeaderMap, from: &Uri, next: &Redirect, set_referer: bool) {
    if !next.keep_body {
        headers.remove(header::CONTENT_TYPE);
        headers.remove(header::CONTENT_LENGTH);
    }
    if !same_site(from, &next.uri) {
        for name in &SENSITIVE_HEADERS {
            headers.remove(name);
        }
    }
    if set_referer {
        match referer(from, &next.uri) {
            Some(value) => {
                headers.insert(header::REFERER, value);
            }
            None => {
                headers.remove(header::REFERER);
            }
        }
    }
}

fn same_site(from: &Uri, to: &Uri) -> bool {
    let (Some(from_host), Some(to_host)) = (from.host(), to.host()) else {
        return false;
    };
    port_or_default(from) == port_or_default(to)
        && is_domain_or_subdomain(&to_host.to_ascii_lowercase(), &from_host.to_ascii_lowercase())
}

fn port_or_default(uri: &Uri) -> Option<u16> {
    uri.port_u16().or(match uri.scheme_str() {
        Some("https") => Some(443),
        Some("http") => Some(80),
        _ => None,
    })
}

fn is_domain_or_subdomain(sub: &str, parent: &str) -> bool {
    sub == parent
        || sub
            .strip_suffix(parent)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn referer(from: &Uri, to: &Uri) -> Option<HeaderValue> {
    if from.scheme_str() == Some("https") && to.scheme_str() == Some("http") {
        return None;
    }
    let mut url = Url::parse(&from.to_string()).ok()?;
    url.set_fragment(None);
    // Credentials never leak through Referer.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    HeaderValue::from_str(url.as_str()).ok()
}
