// src/cache/mod.rs
// =============================================================================
// The liveness cache: a bounded URL -> LinkStatus map with LRU eviction.
//
// It is the only piece of mutable state shared between concurrent verify and
// report calls and the background revalidator. Every operation takes one
// exclusive lock; even `get` needs it because a hit changes recency order.
//
// Submodules:
// - lru: the single-threaded LRU list the lock protects
// =============================================================================

mod lru;

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::checker::LinkStatus;
use crate::error::{Error, Result};

use lru::Lru;

/// Thread-safe bounded cache of link statuses
#[derive(Debug)]
pub struct LivenessCache {
    inner: Mutex<Lru<String, LinkStatus>>,
}

impl LivenessCache {
    /// Creates a cache holding at most `capacity` URLs.
    ///
    /// A capacity of zero is a configuration error.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Configuration(
                "cache capacity must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            inner: Mutex::new(Lru::new(capacity)),
        })
    }

    /// Returns the cached status for `url` and marks it most recently used
    pub fn get(&self, url: &str) -> Option<LinkStatus> {
        self.inner.lock().get(url).copied()
    }

    /// Inserts or overwrites `url`, evicting the least recently used entry if
    /// a new key would push the cache over capacity
    pub fn put(&self, url: impl Into<String>, status: LinkStatus) {
        let mut lru = self.inner.lock();
        if let Some(evicted) = lru.put(url.into(), status) {
            trace!(url = %evicted, "evicted from liveness cache");
        }
    }

    /// Writes many entries under a single lock acquisition
    pub fn put_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, LinkStatus)>,
    {
        let mut lru = self.inner.lock();
        for (url, status) in entries {
            if let Some(evicted) = lru.put(url, status) {
                trace!(url = %evicted, "evicted from liveness cache");
            }
        }
    }

    /// Overwrites entries that are still cached and skips the rest.
    ///
    /// Returns how many entries were written. Nothing is inserted, so nothing
    /// is evicted.
    pub fn update_many<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, LinkStatus)>,
    {
        let mut lru = self.inner.lock();
        let mut written = 0;
        for (url, status) in entries {
            if lru.update(url.as_str(), status) {
                written += 1;
            } else {
                trace!(url = %url, "skipped update of evicted entry");
            }
        }
        written
    }

    /// Snapshot copy of every entry; recency order is left untouched
    pub fn all_entries(&self) -> HashMap<String, LinkStatus> {
        let lru = self.inner.lock();
        lru.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// URLs from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.inner.lock().keys_by_recency()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}
