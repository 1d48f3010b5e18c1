//! TTL Cache
//!
//! In-memory key -> (value, expiry) store with lazy expiry: an expired
//! entry is deleted the next time it is read, there is no background
//! sweep. The batch manager keeps one cache per data kind so metadata
//! (slow-moving) can live longer than prices (volatile).

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    fn is_valid(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }
}

/// Generic TTL cache keyed by string
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    hits: u64,
    misses: u64,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given default TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a key
    ///
    /// An entry past its expiry is deleted on the spot and reported as
    /// a miss; after that the cache behaves as if the key were never
    /// set. An entry is never returned past its expiry.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_valid() => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a value, overwriting any previous entry for the key
    ///
    /// `ttl` of None uses the cache default.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    /// Remove a key, returning its value if present (expired or not)
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop expired entries eagerly
    pub fn cleanup(&mut self) {
        self.entries.retain(|_, entry| entry.is_valid());
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that would still be returned
    pub fn valid_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_valid()).count()
    }

    /// The configured default TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Hit/miss counters since creation
    pub fn stats(&self) -> TtlCacheStats {
        TtlCacheStats {
            entries: self.entries.len(),
            valid_entries: self.valid_count(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct TtlCacheStats {
    pub entries: usize,
    pub valid_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl TtlCacheStats {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}
