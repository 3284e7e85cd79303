//! Read-through cache for effective policy sets
//!
//! Keyed by `(user_id, org_id)`. The engine consults it before
//! aggregating; write-path collaborators must call the engine's
//! invalidation hooks synchronously after any policy, attachment,
//! membership, or hierarchy mutation, before acknowledging the write.
//! On ambiguity the cache evicts rather than serving stale data.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::SourcedStatement;
use warden_core::{OrgId, UserId};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached effective sets
    pub capacity: usize,

    /// Time-to-live for cached entries
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

type CacheKey = (UserId, OrgId);

/// Cached entry with TTL
struct CachedEntry {
    statements: Arc<Vec<SourcedStatement>>,
    cached_at: Instant,
}

impl CachedEntry {
    fn new(statements: Arc<Vec<SourcedStatement>>) -> Self {
        Self {
            statements,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Thread-safe effective-set cache
pub struct EffectiveSetCache {
    entries: DashMap<CacheKey, CachedEntry>,
    config: CacheConfig,
    stats: DashMap<&'static str, usize>,
}

impl EffectiveSetCache {
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: DashMap::new(),
        }
    }

    /// Get a cached effective set, if present and fresh
    pub fn get(&self, user_id: &str, org_id: &str) -> Option<Arc<Vec<SourcedStatement>>> {
        let key = (user_id.to_string(), org_id.to_string());

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_expired(self.config.ttl) {
                drop(entry);
                self.entries.remove(&key);
                self.increment("expirations");
                return None;
            }
            self.increment("hits");
            return Some(Arc::clone(&entry.statements));
        }

        self.increment("misses");
        None
    }

    /// Store an effective set
    pub fn put(&self, user_id: &str, org_id: &str, statements: Arc<Vec<SourcedStatement>>) {
        if self.entries.len() >= self.config.capacity {
            self.evict_some();
        }
        self.entries.insert(
            (user_id.to_string(), org_id.to_string()),
            CachedEntry::new(statements),
        );
    }

    /// Evict every entry for a user, across organizations
    pub fn invalidate_user(&self, user_id: &str) {
        self.entries.retain(|(user, _), _| user != user_id);
    }

    /// Evict every entry for an organization
    pub fn invalidate_org(&self, org_id: &str) {
        self.entries.retain(|(_, org), _| org != org_id);
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stat("hits"),
            misses: self.stat("misses"),
            expirations: self.stat("expirations"),
            entries: self.entries.len(),
            max_entries: self.config.capacity,
        }
    }

    /// Drop roughly a tenth of the entries when at capacity
    fn evict_some(&self) {
        let to_remove = (self.config.capacity / 10).max(1);
        let mut removed = 0;
        self.entries.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });
    }

    fn increment(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of expired entries encountered
    pub expirations: usize,
    /// Current number of entries
    pub entries: usize,
    /// Configured capacity
    pub max_entries: usize,
}

impl CacheStats {
    /// Cache hit rate in [0, 1]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Arc<Vec<SourcedStatement>> {
        Arc::new(Vec::new())
    }

    #[test]
    fn test_put_get() {
        let cache = EffectiveSetCache::new(CacheConfig::default());
        assert!(cache.get("u1", "org1").is_none());

        cache.put("u1", "org1", entry());
        assert!(cache.get("u1", "org1").is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = EffectiveSetCache::new(CacheConfig {
            ttl: Duration::from_millis(0),
            ..Default::default()
        });

        cache.put("u1", "org1", entry());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("u1", "org1").is_none());
        assert!(cache.stats().expirations > 0);
    }

    #[test]
    fn test_invalidate_user_is_scoped() {
        let cache = EffectiveSetCache::new(CacheConfig::default());
        cache.put("u1", "org1", entry());
        cache.put("u2", "org1", entry());

        cache.invalidate_user("u1");
        assert!(cache.get("u1", "org1").is_none());
        assert!(cache.get("u2", "org1").is_some());
    }

    #[test]
    fn test_invalidate_org_evicts_all_members() {
        let cache = EffectiveSetCache::new(CacheConfig::default());
        cache.put("u1", "org1", entry());
        cache.put("u2", "org1", entry());
        cache.put("u3", "org2", entry());

        cache.invalidate_org("org1");
        assert!(cache.get("u1", "org1").is_none());
        assert!(cache.get("u2", "org1").is_none());
        assert!(cache.get("u3", "org2").is_some());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = EffectiveSetCache::new(CacheConfig {
            capacity: 10,
            ..Default::default()
        });
        for i in 0..25 {
            cache.put(&format!("u{}", i), "org1", entry());
        }
        assert!(cache.stats().entries <= 10);
    }
}
