//! Two-tier model cache.
//!
//! ```text
//! lookup → LocalCache (moka, per process) → SharedCache (hash, per fleet) → ModelStore
//! ```
//!
//! - [`LocalCache`] — process-local bounded map from model id to [`Model`].
//!   No network hop; lives as long as the process.
//! - [`SharedCache`] — hash-structured cache shared by every gateway process
//!   (`namespace → model id → JSON record`). Survives restarts and gives a
//!   fresh process a warm path that avoids the store.
//! - [`CacheCoordinator`] — read-through/write-through across both tiers.
//!
//! # Consistency
//!
//! The tiers are independently synchronised and never share a transaction.
//! A shared-tier write that fails after the local write succeeded leaves the
//! tiers apart until the next change event for that id; the read path stays
//! available in the meantime. Concurrent writers (request-path refills and
//! change-feed updates) are last-write-wins, and both converge on the
//! store's state.

mod coordinator;
#[cfg(feature = "redis")]
pub mod redis;
mod shared;

pub use coordinator::CacheCoordinator;
#[cfg(feature = "redis")]
pub use self::redis::RedisSharedCache;
pub use shared::MemorySharedCache;

use async_trait::async_trait;

use crate::Result;
use crate::types::Model;

/// Default shared-cache namespace holding model records.
pub const DEFAULT_NAMESPACE: &str = "api:models";

/// Default maximum number of entries in the local cache.
const DEFAULT_LOCAL_CACHE_MAX: u64 = 10_000;

/// Configuration for the process-local tier.
///
/// ```rust
/// # use huginn::LocalCacheConfig;
/// let config = LocalCacheConfig::new().max_entries(50_000);
/// assert_eq!(config.max_entries, 50_000);
/// ```
#[derive(Debug, Clone)]
pub struct LocalCacheConfig {
    /// Maximum cached models. Default: 10,000.
    pub max_entries: u64,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_LOCAL_CACHE_MAX,
        }
    }
}

impl LocalCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached models.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

/// Thread-safe process-local store of materialized models.
///
/// Keyed on model id. Uses a bounded cache (moka) so long-running
/// processes don't grow without limit; entries do not expire on their own
/// and are refreshed or evicted by change events.
pub struct LocalCache {
    entries: moka::sync::Cache<String, Model>,
}

impl LocalCache {
    /// Create an empty cache with the default capacity.
    pub fn new() -> Self {
        Self::with_config(&LocalCacheConfig::default())
    }

    pub fn with_config(config: &LocalCacheConfig) -> Self {
        Self {
            entries: moka::sync::Cache::new(config.max_entries),
        }
    }

    /// Returns `None` on cache miss.
    pub fn get(&self, id: &str) -> Option<Model> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert (or overwrite) a model, keyed on `model.id`.
    pub fn insert(&self, model: Model) {
        self.entries.insert(model.id.clone(), model);
    }

    pub fn remove(&self, id: &str) {
        self.entries.invalidate(id);
    }

    /// Approximate number of entries (moka counts lazily).
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Network-shared hash cache.
///
/// Values are JSON-serialized [`Model`]s; field names are significant
/// because every gateway process decodes them. Implementations must be
/// safe for concurrent use from many clients.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Set several fields of `namespace` in one round trip.
    async fn hset(&self, namespace: &str, fields: &[(String, String)]) -> Result<()>;

    /// Fetch several fields of `namespace` in one round trip.
    ///
    /// The result is parallel to `fields`; absent fields are `None`.
    async fn hmget(&self, namespace: &str, fields: &[String]) -> Result<Vec<Option<String>>>;

    /// Delete one field. Deleting an absent field is not an error.
    async fn hdel(&self, namespace: &str, field: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_cache_miss_returns_none() {
        let cache = LocalCache::new();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn local_cache_overwrite_replaces_entry() {
        let cache = LocalCache::new();
        cache.insert(Model::new("m1", "first", "gpt-4o"));
        cache.insert(Model::new("m1", "second", "gpt-4o"));

        assert_eq!(cache.get("m1").unwrap().name, "second");
    }

    #[test]
    fn local_cache_remove_and_clear() {
        let cache = LocalCache::new();
        cache.insert(Model::new("a", "a", "x"));
        cache.insert(Model::new("b", "b", "x"));

        cache.remove("a");
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        cache.clear();
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn local_cache_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LocalCache::new());
        let mut handles = Vec::new();

        for i in 0..10 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                cache.insert(Model::new(format!("m{i}"), "n", "x"));
            }));
        }
        for i in 0..10 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                let _ = cache.get(&format!("m{i}"));
            }));
        }
        for h in handles {
            h.join().expect("thread panicked");
        }

        for i in 0..10 {
            assert!(cache.get(&format!("m{i}")).is_some());
        }
    }
}
