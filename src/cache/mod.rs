//! In-process response cache keyed by URL
//!
//! Successful response bodies are cached for a bounded TTL so that re-crawls
//! within the window (including the orchestrator's whole-brand retries) skip
//! the network entirely. Entries are write-once per TTL window: the fetcher
//! only inserts after a cache miss, and an unexpired entry is never
//! overwritten. Expired entries are evicted on insert, so a long
//! multi-brand run does not accumulate stale page bodies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cache hit/miss counters
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    body: String,
    stored_at: Instant,
}

/// TTL-bounded response cache shared by all concurrent fetches
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given time-to-live
    ///
    /// A zero TTL disables caching: every lookup misses and inserts are
    /// dropped.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up an unexpired body for `url`
    pub fn get(&self, url: &str) -> Option<String> {
        if self.ttl.is_zero() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let entries = self.entries.read().unwrap();
        match entries.get(url) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.body.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a response body for `url`
    ///
    /// An existing unexpired entry is left untouched. Every insert first
    /// evicts expired entries across the whole map, bounding the cache to
    /// bodies fetched within the last TTL window.
    pub fn insert(&self, url: &str, body: String) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);

        // Anything still present for this URL is unexpired.
        entries.entry(url.to_string()).or_insert_with(|| CacheEntry {
            body,
            stored_at: Instant::now(),
        });
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Snapshot of hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache = ResponseCache::new(Duration::from_secs(60));

        assert!(cache.get("https://example.com/a").is_none());
        cache.insert("https://example.com/a", "<html>a</html>".to_string());

        let body = cache.get("https://example.com/a");
        assert_eq!(body.as_deref(), Some("<html>a</html>"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.insert("https://example.com/a", "body".to_string());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("https://example.com/a").is_none());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("https://example.com/a", "body".to_string());
        assert!(cache.get("https://example.com/a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unexpired_entry_not_overwritten() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("https://example.com/a", "first".to_string());
        cache.insert("https://example.com/a", "second".to_string());
        assert_eq!(cache.get("https://example.com/a").as_deref(), Some("first"));
    }

    #[test]
    fn test_expired_entry_replaced() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.insert("https://example.com/a", "first".to_string());
        std::thread::sleep(Duration::from_millis(20));
        cache.insert("https://example.com/a", "second".to_string());
        assert_eq!(
            cache.get("https://example.com/a").as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_insert_evicts_expired_entries() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.insert("https://example.com/a", "a".to_string());
        cache.insert("https://example.com/b", "b".to_string());
        assert_eq!(cache.len(), 2);

        std::thread::sleep(Duration::from_millis(20));
        cache.insert("https://example.com/c", "c".to_string());

        // The expired bodies for /a and /b are gone, not just stale.
        assert_eq!(cache.len(), 1);
        assert!(cache.get("https://example.com/c").is_some());
        assert!(cache.get("https://example.com/a").is_none());
    }
}
