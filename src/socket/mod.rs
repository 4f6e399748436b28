//! Socket and connection management.
//!
//! - [`connectjob`]: DNS → TCP → proxy tunnel → TLS connection flow
//! - [`proxy`]: HTTP proxy settings
//! - [`tls`]: TLS configuration and impersonation presets with BoringSSL

pub mod client;
pub mod connectjob;
pub mod proxy;
pub mod tls;
