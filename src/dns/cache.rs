//! Process-wide host resolution cache.
//!
//! Every handle resolves through the same [`HostCache`], so a connection
//! opened by one handle warms the cache for all others. Entries expire after
//! the TTL carried by the requesting handle's `DnsCacheTimeout` option.

use crate::base::neterror::PerformError;
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedHost {
    addrs: Vec<SocketAddr>,
    resolved_at: Instant,
}

/// Shared `(host, port) -> addresses` cache.
#[derive(Debug, Default)]
pub struct HostCache {
    entries: DashMap<(String, u16), CachedHost>,
}

impl HostCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `host:port`, serving from the cache while the entry is younger
    /// than `ttl`. A zero `ttl` disables caching for this lookup.
    pub async fn resolve(
        &self,
        host: &str,
        port: u16,
        ttl: Duration,
    ) -> Result<Vec<SocketAddr>, PerformError> {
        // IP literals never hit the resolver.
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let key = (host.to_ascii_lowercase(), port);
        if !ttl.is_zero() {
            if let Some(entry) = self.entries.get(&key) {
                if entry.resolved_at.elapsed() < ttl {
                    tracing::trace!(host = %host, "DNS cache hit");
                    return Ok(entry.addrs.clone());
                }
            }
            self.entries
                .remove_if(&key, |_, entry| entry.resolved_at.elapsed() >= ttl);
        }

        tracing::debug!(host = %host, port, "resolving host");
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| {
                tracing::debug!(host = %host, error = %e, "DNS resolution failed");
                PerformError::NameNotResolved
            })?
            .collect();

        if addrs.is_empty() {
            return Err(PerformError::NameNotResolved);
        }

        tracing::debug!(host = %host, count = addrs.len(), "DNS resolution complete");
        if !ttl.is_zero() {
            self.purge_expired(ttl);
            self.entries.insert(
                key,
                CachedHost {
                    addrs: addrs.clone(),
                    resolved_at: Instant::now(),
                },
            );
        }
        Ok(addrs)
    }

    /// Drop every entry older than `ttl`.
    pub fn purge_expired(&self, ttl: Duration) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.resolved_at.elapsed() < ttl);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::trace!(purged, "purged expired DNS entries");
        }
    }

    /// Number of cached hosts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
