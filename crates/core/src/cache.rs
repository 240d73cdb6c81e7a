//! Time-bounded result cache.
//!
//! Maps a normalized (statement, parameters, limit) key to previously fetched
//! rows. Entries expire after a configured TTL and the cache is bounded by an
//! entry count with least-recently-used eviction. A coarse mutex guards the
//! whole structure; entries are small and every operation is a short critical
//! section, so per-key locking buys nothing here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::row::ResultRow;

/// Named statement parameters, keyed by placeholder name. A `BTreeMap` keeps
/// the mapping sorted, so two logically identical parameter sets compare equal
/// regardless of insertion order.
pub type SqlParams = std::collections::BTreeMap<String, Value>;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds; zero or negative disables caching.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: i64,
    /// Maximum entry count; zero or negative disables caching.
    #[serde(default = "default_max_entries")]
    pub max_entries: i64,
}

fn default_ttl() -> i64 {
    30
}
fn default_max_entries() -> i64 {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn enabled(&self) -> bool {
        self.ttl_seconds > 0 && self.max_entries > 0
    }
}

/// Cache key derived from the final statement text, the sorted parameter
/// mapping, and the effective row limit.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    statement: String,
    params: Vec<(String, String)>,
    row_limit: i64,
}

impl CacheKey {
    pub fn new(statement: &str, params: &SqlParams, row_limit: i64) -> Self {
        Self {
            statement: statement.trim().to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
            row_limit,
        }
    }

    /// Short stable fingerprint for log lines.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.statement.as_bytes());
        for (k, v) in &self.params {
            hasher.update(k.as_bytes());
            hasher.update(v.as_bytes());
        }
        hasher.update(self.row_limit.to_be_bytes());
        let digest = hasher.finalize();
        format!("{:x}", digest)[..16].to_string()
    }
}

struct CacheEntry {
    inserted: Instant,
    rows: Arc<Vec<ResultRow>>,
    /// Recency sequence; higher means more recently used.
    touched: u64,
}

struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    clock: u64,
}

/// Process-wide query result cache. Explicitly constructed and injected so
/// tests can build isolated instances; lifetime is bounded by the process.
pub struct QueryCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        debug!(
            target: "cache",
            ttl_seconds = config.ttl_seconds,
            max_entries = config.max_entries,
            enabled = config.enabled(),
            "Initializing query cache"
        );
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Look up rows for `key`. Returns `None` when caching is disabled, the
    /// key is absent, or the entry has outlived the TTL (expired entries are
    /// evicted on the spot). A hit promotes the entry to most-recently-used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<ResultRow>>> {
        if !self.config.enabled() {
            return None;
        }
        let ttl = Duration::from_secs(self.config.ttl_seconds as u64);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => entry.inserted.elapsed() > ttl,
        };
        if expired {
            inner.entries.remove(key);
            debug!(target: "cache", key = %key.fingerprint(), "Expired cache entry");
            return None;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(key).expect("entry checked above");
        entry.touched = clock;
        debug!(target: "cache", key = %key.fingerprint(), rows = entry.rows.len(), "Cache hit");
        Some(Arc::clone(&entry.rows))
    }

    /// Insert or overwrite `key`, then evict least-recently-used entries until
    /// the count is back under the bound. No-op when caching is disabled.
    pub fn put(&self, key: CacheKey, rows: Vec<ResultRow>) {
        if !self.config.enabled() {
            return;
        }
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.clock += 1;
        let clock = inner.clock;
        let fingerprint = key.fingerprint();
        let row_count = rows.len();
        inner.entries.insert(
            key,
            CacheEntry {
                inserted: Instant::now(),
                rows: Arc::new(rows),
                touched: clock,
            },
        );

        let max = self.config.max_entries as usize;
        while inner.entries.len() > max {
            // Linear scan is fine at the configured entry counts.
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(k, _)| k.clone());
            match victim {
                Some(k) => {
                    inner.entries.remove(&k);
                    debug!(target: "cache", key = %k.fingerprint(), "Evicted LRU cache entry");
                }
                None => break,
            }
        }
        debug!(target: "cache", key = %fingerprint, rows = row_count, "Cached query result");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(n: i64) -> ResultRow {
        ResultRow::from_pairs(vec![("n".to_string(), json!(n))])
    }

    fn enabled_cache(max_entries: i64) -> QueryCache {
        QueryCache::new(CacheConfig {
            ttl_seconds: 60,
            max_entries,
        })
    }

    #[test]
    fn round_trip_immediately_after_insert() {
        let cache = enabled_cache(8);
        let key = CacheKey::new("SELECT 1", &SqlParams::new(), 10);
        cache.put(key.clone(), vec![row(1)]);
        let hit = cache.get(&key).expect("expected hit");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].get("n"), Some(&json!(1)));
    }

    #[test]
    fn disabled_cache_stores_and_returns_nothing() {
        for config in [
            CacheConfig { ttl_seconds: 0, max_entries: 128 },
            CacheConfig { ttl_seconds: 30, max_entries: 0 },
            CacheConfig { ttl_seconds: -1, max_entries: -1 },
        ] {
            let cache = QueryCache::new(config);
            let key = CacheKey::new("SELECT 1", &SqlParams::new(), 10);
            cache.put(key.clone(), vec![row(1)]);
            assert!(cache.get(&key).is_none());
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = QueryCache::new(CacheConfig {
            ttl_seconds: 1,
            max_entries: 8,
        });
        let key = CacheKey::new("SELECT 1", &SqlParams::new(), 10);
        cache.put(key.clone(), vec![row(1)]);
        assert!(cache.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(1100));
        assert!(cache.get(&key).is_none());
        // Expiry check evicts the entry as a side effect.
        assert!(cache.is_empty());
    }

    #[test]
    fn eviction_keeps_exactly_max_entries_dropping_lru() {
        let cache = enabled_cache(3);
        let keys: Vec<CacheKey> = (0..5)
            .map(|i| CacheKey::new(&format!("SELECT {i}"), &SqlParams::new(), 10))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            cache.put(key.clone(), vec![row(i as i64)]);
        }
        assert_eq!(cache.len(), 3);
        // Oldest-used first: keys 0 and 1 are gone, 2..5 remain.
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_none());
        assert!(cache.get(&keys[2]).is_some());
        assert!(cache.get(&keys[4]).is_some());
    }

    #[test]
    fn hit_promotes_entry_over_older_neighbors() {
        let cache = enabled_cache(2);
        let a = CacheKey::new("SELECT 'a'", &SqlParams::new(), 10);
        let b = CacheKey::new("SELECT 'b'", &SqlParams::new(), 10);
        let c = CacheKey::new("SELECT 'c'", &SqlParams::new(), 10);

        cache.put(a.clone(), vec![row(1)]);
        cache.put(b.clone(), vec![row(2)]);
        // Touch `a` so `b` becomes the LRU victim.
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), vec![row(3)]);

        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn key_is_order_independent_over_params() {
        let mut forward = SqlParams::new();
        forward.insert("a".to_string(), json!(1));
        forward.insert("b".to_string(), json!("x"));

        let mut reverse = SqlParams::new();
        reverse.insert("b".to_string(), json!("x"));
        reverse.insert("a".to_string(), json!(1));

        let k1 = CacheKey::new("SELECT :a, :b", &forward, 10);
        let k2 = CacheKey::new("SELECT :a, :b", &reverse, 10);
        assert_eq!(k1, k2);
        assert_eq!(k1.fingerprint(), k2.fingerprint());
    }

    #[test]
    fn key_distinguishes_limit_and_params() {
        let empty = SqlParams::new();
        let mut params = SqlParams::new();
        params.insert("p".to_string(), json!("v"));

        let base = CacheKey::new("SELECT 1", &empty, 100);
        assert_ne!(base, CacheKey::new("SELECT 1", &empty, 200));
        assert_ne!(base, CacheKey::new("SELECT 1", &params, 100));
        assert_eq!(base, CacheKey::new("  SELECT 1  ", &empty, 100));
    }

    #[test]
    fn concurrent_readers_and_writers_keep_the_bound() {
        let cache = Arc::new(enabled_cache(16));
        let mut handles = Vec::new();
        for t in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    let key =
                        CacheKey::new(&format!("SELECT {}", i % 32), &SqlParams::new(), t);
                    cache.put(key.clone(), vec![row(i)]);
                    let _ = cache.get(&key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
