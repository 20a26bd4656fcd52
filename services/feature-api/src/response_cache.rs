//! In-memory cache for feature responses.
//!
//! Caches serialized FeatureCollection bodies so repeated requests for the
//! same bundle, table and limit are answered without touching the bundle.
//!
//! ## Cache Key Structure
//! (bundle URL, table override or default marker, effective limit)
//!
//! ## Eviction Strategy
//! - TTL-based expiration on read (lazy); no background sweep
//! - Entry-count and memory-based LRU eviction when a bound is exceeded
//!
//! Concurrent misses on one key each run the full pipeline; the last write
//! wins.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;

/// Cache key for feature requests.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// Validated bundle URL.
    pub url: String,
    /// Explicit table, `None` for the default table.
    pub table: Option<String>,
    /// Effective row limit.
    pub limit: u64,
}

impl CacheKey {
    pub fn new(url: impl Into<String>, table: Option<String>, limit: u64) -> Self {
        Self {
            url: url.into(),
            table,
            limit,
        }
    }
}

/// Cached response entry.
struct CachedResponse {
    /// The serialized response body.
    data: Bytes,
    /// When this entry was inserted.
    inserted_at: Instant,
}

impl CachedResponse {
    /// An entry is fresh while strictly younger than the TTL.
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Statistics for the response cache.
#[derive(Default)]
pub struct ResponseCacheStats {
    /// Total cache hits.
    pub hits: AtomicU64,
    /// Total cache misses (including expired entries).
    pub misses: AtomicU64,
    /// Total entries evicted by a size bound.
    pub evictions: AtomicU64,
    /// Total entries expired via TTL.
    pub expired: AtomicU64,
    /// Current cache size in bytes.
    pub size_bytes: AtomicU64,
    /// Current number of entries.
    pub entry_count: AtomicU64,
}

impl ResponseCacheStats {
    /// Calculate cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Point-in-time copy for reporting.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            size_bytes: self.size_bytes.load(Ordering::Relaxed),
            entries: self.entry_count.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable cache statistics.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub size_bytes: u64,
    pub entries: u64,
    pub hit_rate: f64,
}

/// In-memory LRU cache with a freshness window.
pub struct ResponseCache {
    cache: Mutex<LruCache<CacheKey, CachedResponse>>,
    max_bytes: u64,
    ttl: Duration,
    stats: ResponseCacheStats,
}

impl ResponseCache {
    /// Create a new response cache.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries (at least 1 is kept)
    /// * `max_mb` - Maximum cache size in megabytes
    /// * `ttl` - Freshness window
    pub fn new(max_entries: usize, max_mb: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        let max_bytes = (max_mb as u64) * 1024 * 1024;

        tracing::info!(
            "ResponseCache initialized: max_entries={}, max_mb={}, ttl_secs={}",
            capacity,
            max_mb,
            ttl.as_secs()
        );

        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            max_bytes,
            ttl,
            stats: ResponseCacheStats::default(),
        }
    }

    /// Freshness window of this cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh cached response.
    ///
    /// A stale entry counts as a miss and is removed.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut cache = self.cache.lock().await;

        let expired = match cache.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(removed) = cache.pop(key) {
                self.stats.size_bytes.fetch_sub(removed.size(), Ordering::Relaxed);
                self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a response, replacing any entry at the same key.
    pub async fn put(&self, key: CacheKey, data: Bytes) {
        let entry = CachedResponse {
            data,
            inserted_at: Instant::now(),
        };
        let entry_size = entry.size();

        if entry_size > self.max_bytes {
            tracing::debug!(
                "ResponseCache skipping entry of {} bytes (limit {} bytes)",
                entry_size,
                self.max_bytes
            );
            return;
        }

        let mut cache = self.cache.lock().await;

        // A replaced entry no longer counts against the byte bound
        if let Some(old) = cache.pop(&key) {
            self.stats.size_bytes.fetch_sub(old.size(), Ordering::Relaxed);
            self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
        }

        // Evict oldest entries until the new one fits
        let target = self.max_bytes - entry_size;
        let mut evicted_bytes = 0u64;
        let mut evicted_count = 0u64;
        while self.stats.size_bytes.load(Ordering::Relaxed) > target {
            match cache.pop_lru() {
                Some((_, removed)) => {
                    evicted_bytes += removed.size();
                    evicted_count += 1;
                    self.stats.size_bytes.fetch_sub(removed.size(), Ordering::Relaxed);
                }
                None => break,
            }
        }

        // At capacity, push evicts the least recently used entry
        if let Some((_, removed)) = cache.push(key, entry) {
            evicted_bytes += removed.size();
            evicted_count += 1;
            self.stats.size_bytes.fetch_sub(removed.size(), Ordering::Relaxed);
        }

        if evicted_count > 0 {
            self.stats.evictions.fetch_add(evicted_count, Ordering::Relaxed);
            self.stats.entry_count.fetch_sub(evicted_count, Ordering::Relaxed);
            tracing::debug!(
                "ResponseCache evicted {} entries ({} bytes)",
                evicted_count,
                evicted_bytes
            );
        }

        self.stats.entry_count.fetch_add(1, Ordering::Relaxed);
        self.stats.size_bytes.fetch_add(entry_size, Ordering::Relaxed);
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &ResponseCacheStats {
        &self.stats
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.lock().await;
        let count = cache.len();
        cache.clear();
        self.stats.size_bytes.store(0, Ordering::Relaxed);
        self.stats.entry_count.store(0, Ordering::Relaxed);
        tracing::info!("ResponseCache cleared {} entries", count);
    }
}
