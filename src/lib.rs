//! # mimicnet
//!
//! A browser-impersonating HTTP client transport.
//!
//! Requests are executed on a pool of reusable connection handles. Each
//! handle is pre-configured to present the TLS and HTTP/2 fingerprint and
//! default headers of a real browser, and keeps its own live connections
//! across requests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> Result<(), mimicnet::NetError> {
//!     let resp = mimicnet::get("https://example.com").await?;
//!     println!("{} {}", resp.status_text(), resp.text()?.len());
//!
//!     let client = mimicnet::Client::with_target("safari17_0");
//!     let resp = client
//!         .post("https://httpbin.org/post", "application/json", r#"{"a":1}"#)
//!         .await?;
//!     println!("{:?}", resp.headers());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and process-wide initialisation
//! - [`dns`] - Shared host resolution cache
//! - [`socket`] - TCP/TLS connect, proxy tunnels, browser TLS presets
//! - [`handle`] - Handle API, configuration, pool and the native engine
//! - [`http`] - Response sinks, header framing, request and response types
//! - [`transport`] - Per-request orchestration over the pool
//! - [`redirect`] - Redirect policy and hop resolution for the client
//! - [`client`] - High-level client and process-wide default client

pub mod base;
pub mod client;
pub mod dns;
pub mod handle;
pub mod http;
pub mod redirect;
pub mod socket;
pub mod transport;

pub use crate::base::neterror::{ErrorCategory, NetError, PerformError};
pub use crate::client::{
    default_client, execute, get, head, post, post_form, Client, ClientBuilder, RequestBuilder,
};
pub use crate::handle::{Handle, HandleConfig, HandleOption, HandlePool, HttpVersion, NativeHandle};
pub use crate::http::{HttpResponse, RequestTimeout};
pub use crate::redirect::RedirectPolicy;
pub use crate::socket::tls::ImpersonateTarget;
pub use crate::transport::{ResponseCapture, Transport};
