//! Decision caching with sliding TTL and per-identity invalidation.
//!
//! This module provides the decision cache using Moka for concurrent access
//! with built-in idle-based eviction.
//!
//! # Architecture
//!
//! The cache uses Moka's async Cache which provides:
//! - Lock-free concurrent reads
//! - Automatic eviction on idle expiry (sliding TTL: every read hit
//!   refreshes the entry's timer)
//! - Memory-bounded storage
//!
//! A secondary index maps each identity to its cache keys so invalidating
//! one identity is O(K) in that identity's keys rather than a full scan.
//!
//! # Key Design
//!
//! Cache keys are `(identity, resource, action)`; the value is the full
//! `{item -> decision}` mapping accumulated for that scope. Identities are
//! isolated from each other: invalidation for one never touches another.
//!
//! # Cache Safety
//!
//! Caching is **disabled** by default. Cached positive decisions can serve
//! stale results after a policy change until the TTL expires or the
//! identity is invalidated. When disabled the cache is a transparent no-op:
//! every read misses and every write is dropped, so call sites need no
//! special-casing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;

/// Configuration for the decision cache.
#[derive(Debug, Clone)]
pub struct DecisionCacheConfig {
    /// Whether caching is enabled. Defaults to `false`: cached positive
    /// decisions may be stale until expiry, so enabling is an explicit
    /// opt-in.
    pub enabled: bool,
    /// Maximum number of `(identity, resource, action)` entries.
    pub max_capacity: u64,
    /// Sliding time-to-live: the expiry timer resets on every read hit.
    pub ttl: Duration,
}

impl Default for DecisionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 100_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl DecisionCacheConfig {
    /// Enables or disables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Sets the sliding TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cache key identifying one decision scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The normalized identity the decisions belong to.
    pub identity: String,
    /// The resource the decisions were evaluated against.
    pub resource: String,
    /// The action the decisions were evaluated for.
    pub action: String,
}

impl CacheKey {
    /// Creates a new cache key.
    pub fn new(
        identity: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// The `{item -> decision}` mapping stored per scope.
pub type DecisionSet = Arc<HashMap<String, bool>>;

/// Decision cache with sliding-TTL expiry and per-identity invalidation.
///
/// # Thread Safety
///
/// Fully thread-safe; shared across async tasks without external
/// synchronization. Per-identity write ordering is the caller's concern
/// (the enforcement layer serializes it with its identity lock table).
pub struct DecisionCache {
    /// The underlying Moka cache storing decision sets.
    cache: Cache<CacheKey, DecisionSet>,
    /// Configuration for this cache instance.
    config: DecisionCacheConfig,
    /// Secondary index: identity -> cache keys, for O(K) invalidation.
    by_identity: DashMap<String, HashSet<CacheKey>>,
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .field("identity_index_size", &self.by_identity.len())
            .finish()
    }
}

impl DecisionCache {
    /// Creates a new decision cache with the given configuration.
    pub fn new(config: DecisionCacheConfig) -> Self {
        // time_to_idle gives the sliding expiration: reads reset the timer.
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_idle(config.ttl)
            .build();

        Self {
            cache,
            config,
            by_identity: DashMap::new(),
        }
    }

    /// Returns the configuration for this cache.
    pub fn config(&self) -> &DecisionCacheConfig {
        &self.config
    }

    /// Returns whether caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Retrieves the cached decision set for a scope.
    ///
    /// Returns `None` on a miss, after expiry, or when caching is disabled.
    /// A hit refreshes the entry's expiry timer.
    ///
    /// # Metrics
    ///
    /// - `authgate_cache_hits_total` - incremented on cache hit
    /// - `authgate_cache_misses_total` - incremented on cache miss
    pub async fn get(&self, key: &CacheKey) -> Option<DecisionSet> {
        if !self.config.enabled {
            return None;
        }
        let result = self.cache.get(key).await;
        if result.is_some() {
            metrics::counter!("authgate_cache_hits_total").increment(1);
        } else {
            metrics::counter!("authgate_cache_misses_total").increment(1);
        }
        result
    }

    /// Stores the decision set for a scope, replacing any previous set.
    ///
    /// A no-op when caching is disabled.
    pub async fn insert(&self, key: CacheKey, decisions: HashMap<String, bool>) {
        if !self.config.enabled {
            return;
        }

        self.by_identity
            .entry(key.identity.clone())
            .or_default()
            .insert(key.clone());

        self.cache.insert(key, Arc::new(decisions)).await;
    }

    /// Drops every cached scope for one identity.
    ///
    /// Returns `false` when caching is disabled, `true` otherwise (whether
    /// or not entries existed). Other identities are unaffected.
    pub async fn invalidate_identity(&self, identity: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        // Atomic remove() so a concurrent insert cannot add keys between
        // reading the index and dropping the entries.
        if let Some((_, keys)) = self.by_identity.remove(identity) {
            for key in &keys {
                self.cache.invalidate(key).await;
            }
        }
        true
    }

    /// Flushes the entire cache.
    pub fn invalidate_all(&self) {
        if !self.config.enabled {
            return;
        }
        self.cache.invalidate_all();
        self.by_identity.clear();
    }

    /// Returns the approximate number of cached scopes.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks.
    ///
    /// Triggers any pending evictions. Useful for testing TTL behavior.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Clone for DecisionCache {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            config: self.config.clone(),
            by_identity: self.by_identity.clone(),
        }
    }
}
