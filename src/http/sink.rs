//! Per-request response sinks.
//!
//! A handle streams response data into two sinks while it performs an
//! exchange: body bytes into a [`BodySink`] and raw header lines into a
//! [`HeaderSink`]. Both sinks lock internally because the engine may deliver
//! data from a different task than the one awaiting the request.

use crate::http::framing;
use bytes::Bytes;
use http::HeaderMap;
use std::sync::{Mutex, MutexGuard};

/// Initial capacity of a [`ResponseBuffer`].
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Receives response body bytes as they arrive.
pub trait BodySink: Send + Sync {
    fn append(&self, chunk: &[u8]);
}

/// Receives raw response header text as it arrives.
pub trait HeaderSink: Send + Sync {
    fn add_header_line(&self, line: &str);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while appending cannot leave a Vec or HeaderMap half-written.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Growable in-memory body sink.
#[derive(Debug)]
pub struct ResponseBuffer {
    buf: Mutex<Vec<u8>>,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Snapshot of everything written so far.
    pub fn bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&lock(&self.buf))
    }

    pub fn len(&self) -> usize {
        lock(&self.buf).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.buf).is_empty()
    }

    pub fn capacity(&self) -> usize {
        lock(&self.buf).capacity()
    }

    pub fn reset(&self) {
        lock(&self.buf).clear();
    }
}

impl BodySink for ResponseBuffer {
    fn append(&self, chunk: &[u8]) {
        lock(&self.buf).extend_from_slice(chunk);
    }
}

/// Header sink building a case-insensitive multi-value map.
#[derive(Debug, Default)]
pub struct HeaderCollector {
    headers: Mutex<HeaderMap>,
}

impl HeaderCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the headers collected so far.
    pub fn headers(&self) -> HeaderMap {
        lock(&self.headers).clone()
    }

    /// Take the collected headers, leaving the collector empty.
    pub fn take(&self) -> HeaderMap {
        std::mem::take(&mut *lock(&self.headers))
    }

    pub fn len(&self) -> usize {
        lock(&self.headers).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.headers).is_empty()
    }
}

impl HeaderSink for HeaderCollector {
    fn add_header_line(&self, line: &str) {
        let mut headers = lock(&self.headers);
        for raw in line.split('\n') {
            if let Some((name, value)) = framing::parse_header_line(raw) {
                headers.append(name, value);
            }
        }
    }
}
