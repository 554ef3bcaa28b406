//! In-memory boundary cache with per-entry TTL.
//!
//! Backed by a `DashMap`, so reads and writes from concurrent acquisitions
//! never block each other for long and no lock is held across an `.await`.
//! Expiry is lazy: an expired entry is removed when it is next read. There
//! is no background sweep and no size bound; the key space is small (one
//! entry per granularity/zoom/scope combination actually viewed).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::types::{CacheEntry, CacheEntryInfo, CacheKey, CacheStats};
use crate::boundary::ProcessedBoundary;

/// TTL cache for processed boundary sets.
#[derive(Debug, Default)]
pub struct BoundaryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl BoundaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached boundaries if present and not expired.
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<ProcessedBoundary>>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.data));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // Re-check under the write lock; a fresh entry may have replaced it
            if self
                .entries
                .remove_if(key, |_, entry| entry.is_expired())
                .is_some()
            {
                self.expirations.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache entry expired");
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores boundaries, overwriting any previous entry for the key.
    pub fn insert(&self, key: CacheKey, data: Arc<Vec<ProcessedBoundary>>, ttl_minutes: u64) {
        debug!(key = %key, boundaries = data.len(), ttl_minutes, "Caching boundaries");
        self.entries.insert(key, CacheEntry::new(data, ttl_minutes));
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Removes one entry. Returns `true` if it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Entry count, expired entries included until they are read.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lists every entry for inspection, oldest first.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let mut infos: Vec<CacheEntryInfo> = self
            .entries
            .iter()
            .map(|item| CacheEntryInfo {
                key: item.key().clone(),
                boundary_count: item.data.len(),
                created_wall: item.created_wall,
                ttl_minutes: item.ttl_minutes,
                age: item.age(),
                expired: item.is_expired(),
            })
            .collect();
        infos.sort_by(|a, b| b.age.cmp(&a.age));
        infos
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entry_count: self.entries.len(),
        }
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Boundary cache cleared");
    }
}
