//! One-time, process-wide initialisation of state shared by every handle.
//!
//! Nothing here runs at load time; the first handle to be created calls
//! [`ensure_initialized`] and later calls return the same instance.

use crate::dns::HostCache;
use std::sync::OnceLock;

/// State shared by all handles in the process.
#[derive(Debug)]
pub struct Globals {
    host_cache: HostCache,
}

impl Globals {
    pub fn host_cache(&self) -> &HostCache {
        &self.host_cache
    }
}

static GLOBALS: OnceLock<Globals> = OnceLock::new();

/// Initialise process-wide state exactly once.
///
/// Safe to call from any number of threads concurrently; only one caller
/// runs the initialiser and every caller observes the same [`Globals`].
pub fn ensure_initialized() -> &'static Globals {
    GLOBALS.get_or_init(|| {
        tracing::debug!("initializing process-wide handle state");
        Globals {
            host_cache: HostCache::new(),
        }
    })
}

/// True once [`ensure_initialized`] has completed.
pub fn is_initialized() -> bool {
    GLOBALS.get().is_some()
}
