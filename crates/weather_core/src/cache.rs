//! Read-through memo tables shared by the services.
//!
//! Every cached value is a pure function of its key, so concurrent callers may
//! compute the same entry twice; the first insert wins and later ones are
//! dropped. Values are computed outside the shard lock, which keeps recursive
//! fills (a pattern chain asking for its predecessor) deadlock free.
//!
//! A bounded memo flushes itself once it reaches capacity. Dropping entries
//! only costs recomputation, never a different answer.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

pub struct Memo<K, V> {
    name: &'static str,
    capacity: Option<usize>,
    entries: DashMap<K, V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            capacity: None,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A memo holding at most `capacity` entries.
    pub fn bounded(name: &'static str, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new(name)
        }
    }

    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return hit.value().clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(cache = self.name, "cache miss");
        let value = compute();
        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity {
                tracing::debug!(cache = self.name, capacity, "flushing full cache");
                self.entries.clear();
            }
        }
        self.entries.entry(key).or_insert(value).value().clone()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn retain<F>(&self, keep: F)
    where
        F: Fn(&K) -> bool,
    {
        self.entries.retain(|key, _| keep(key));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K: Eq + Hash, V> fmt::Debug for Memo<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("entries", &self.entries.len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
