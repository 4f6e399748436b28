//! Bounded store of idle, pre-configured handles.
//!
//! The pool never makes a caller wait: a miss creates a new handle and a
//! release into a full pool destroys the handle instead.

use super::config::HandleConfig;
use super::Handle;
use crate::base::init::ensure_initialized;
use crate::base::neterror::NetError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct HandlePool<H: Handle> {
    idle_tx: Sender<H>,
    idle_rx: Receiver<H>,
    config: Arc<HandleConfig>,
    capacity: usize,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl<H: Handle> std::fmt::Debug for HandlePool<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlePool")
            .field("capacity", &self.capacity)
            .field("idle", &self.idle_count())
            .field("created", &self.created_count())
            .field("destroyed", &self.destroyed_count())
            .finish()
    }
}

impl<H: Handle> HandlePool<H> {
    /// Create an empty pool holding at most `config.pool_size` idle handles.
    pub fn new(config: Arc<HandleConfig>) -> Self {
        let capacity = config.pool_size;
        let (idle_tx, idle_rx) = bounded(capacity);
        Self {
            idle_tx,
            idle_rx,
            config,
            capacity,
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        }
    }

    /// Take an idle handle, or create and configure a new one.
    pub fn acquire(&self) -> Result<H, NetError> {
        if let Ok(handle) = self.idle_rx.try_recv() {
            return Ok(handle);
        }

        ensure_initialized();
        let mut handle = H::open().map_err(|e| NetError::HandleUnavailable(e.to_string()))?;
        self.config.apply(&mut handle)?;
        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(created, capacity = self.capacity, "created handle");
        Ok(handle)
    }

    /// Reset a handle and return it to the idle set.
    ///
    /// The handle is dropped when the idle set is full or when it can no
    /// longer be configured.
    pub fn release(&self, mut handle: H) {
        handle.reset();
        if let Err(e) = self.config.apply(&mut handle) {
            tracing::debug!(error = %e, "dropping handle that failed to reconfigure");
            self.destroyed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.idle_tx.try_send(handle) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let destroyed = self.destroyed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(destroyed, capacity = self.capacity, "pool full, destroyed handle");
            }
        }
    }

    /// Acquire a handle wrapped in a guard that releases it on drop.
    pub fn checkout(&self) -> Result<PooledHandle<'_, H>, NetError> {
        Ok(PooledHandle {
            handle: Some(self.acquire()?),
            pool: self,
        })
    }

    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_count(&self) -> usize {
        self.idle_rx.len()
    }

    /// Total handles created over the pool's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Handles dropped at release time.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed.load(Ordering::Relaxed)
    }
}

/// A checked-out handle. Returned to its pool when dropped.
pub struct PooledHandle<'a, H: Handle> {
    handle: Option<H>,
    pool: &'a HandlePool<H>,
}

impl<H: Handle> Deref for PooledHandle<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        // Only `Drop` takes the handle out.
        self.handle.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<H: Handle> DerefMut for PooledHandle<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<H: Handle> Drop for PooledHandle<'_, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle);
        }
    }
}
