//! DNS resolution shared by all handles.
//!
//! Resolution goes through tokio's system resolver and is memoised in a
//! single process-wide [`HostCache`] owned by [`crate::base::init`].

mod cache;

pub use cache::HostCache;
