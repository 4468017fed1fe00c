//! Cache store keyed by cache key
//!
//! Provides a `CacheStore` that holds one JSON snapshot per key, timestamped at
//! write time, and answers freshness queries against a caller-supplied maximum age.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// A single cached response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The parsed response body
    pub data: Value,
    /// When the entry was written
    pub timestamp: Instant,
}

impl CacheEntry {
    /// Creates an entry stamped with the current instant
    pub fn new(data: Value) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
        }
    }

    /// Time elapsed since the entry was written
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }

    /// Whether the entry is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }
}

/// Process-wide store of cached responses
///
/// Cloning a `CacheStore` yields another handle to the same map, so one store can
/// be handed to every call-site that should share entries. Each operation replaces
/// or removes a whole entry under a short lock; two writers racing on the same key
/// resolve as last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the data for `key` if an entry exists and is younger than `max_age`
    ///
    /// Stale entries are ignored but not removed.
    pub fn get_fresh(&self, key: &str, max_age: Duration) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(max_age))
            .map(|entry| entry.data.clone())
    }

    /// Returns a copy of the entry for `key`, fresh or not
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Writes `data` under `key`, replacing any existing entry
    pub fn insert(&self, key: impl Into<String>, data: Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.into(), CacheEntry::new(data));
    }

    /// Removes the entry for `key`, returning whether one was present
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).is_some()
    }

    /// Whether any entry, fresh or stale, exists for `key`
    pub fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    /// Age of the entry for `key`, if present
    pub fn age(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(CacheEntry::age)
    }

    /// Number of entries, including stale ones
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
