//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): error taxonomy for every operation
//! - [`init`]: process-wide one-time initialisation

pub mod init;
pub mod neterror;

pub use neterror::{ErrorCategory, NetError, PerformError};
