//! Configuration for the enforcement layer.
//!
//! Settings load from environment variables with the `AUTHGATE_` prefix and
//! `__` as the nested key separator:
//!
//! - `AUTHGATE_CACHE__ENABLED=true` - enable the decision cache
//! - `AUTHGATE_CACHE__TTL_SECS=60` - sliding cache expiry in seconds
//! - `AUTHGATE_CACHE__MAX_CAPACITY=50000` - cached scope limit
//! - `AUTHGATE_BATCH__MAX_SHARDS=16` - maximum workers per batch call
//!
//! A malformed environment is never fatal: loading falls back to the
//! documented defaults and logs what happened.

use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use tracing::warn;

use authgate_domain::cache::DecisionCacheConfig;

/// Enforcement-layer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EnforcerConfig {
    /// Decision cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Batch evaluation settings
    #[serde(default)]
    pub batch: BatchSettings,
}

/// Decision cache settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// Enable the decision cache. Disabled by default: cached positive
    /// decisions may be stale until expiry.
    #[serde(default)]
    pub enabled: bool,

    /// Sliding expiry in seconds; every read hit resets the timer.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached `(identity, resource, action)` scopes.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_ttl_secs(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    100_000
}

/// Batch evaluation settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchSettings {
    /// Maximum number of concurrent shard workers per batch call. The
    /// effective count is `min(max_shards, batch length)`.
    #[serde(default = "default_max_shards")]
    pub max_shards: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_shards: default_max_shards(),
        }
    }
}

fn default_max_shards() -> usize {
    10
}

impl EnforcerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Starts from the defaults and applies `AUTHGATE_` prefixed
    /// overrides. Malformed values are recovered locally: each settings
    /// section deserializes independently, so one unparsable value
    /// reverts only its own section to the documented defaults (logged)
    /// while valid siblings survive. This function never fails.
    pub fn from_env() -> Self {
        let source = Config::builder()
            .add_source(Config::try_from(&EnforcerConfig::default()).unwrap_or_default())
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build();

        let source = match source {
            Ok(source) => source,
            Err(error) => {
                warn!(%error, "invalid enforcer configuration, using defaults");
                return EnforcerConfig::default();
            }
        };

        let cache = source.get("cache").unwrap_or_else(|error| {
            warn!(%error, "invalid cache settings, using defaults");
            CacheSettings::default()
        });
        let batch = source.get("batch").unwrap_or_else(|error| {
            warn!(%error, "invalid batch settings, using defaults");
            BatchSettings::default()
        });

        EnforcerConfig { cache, batch }.validated()
    }

    /// Clamps out-of-range values back to their defaults, logging each
    /// substitution.
    pub fn validated(mut self) -> Self {
        if self.batch.max_shards == 0 {
            warn!(
                fallback = default_max_shards(),
                "batch.max_shards must be positive, using default"
            );
            self.batch.max_shards = default_max_shards();
        }
        if self.cache.ttl_secs == 0 {
            warn!(
                fallback = default_ttl_secs(),
                "cache.ttl_secs must be positive, using default"
            );
            self.cache.ttl_secs = default_ttl_secs();
        }
        self
    }

    /// Translates the cache settings into a domain cache configuration.
    pub fn cache_config(&self) -> DecisionCacheConfig {
        DecisionCacheConfig::default()
            .with_enabled(self.cache.enabled)
            .with_ttl(Duration::from_secs(self.cache.ttl_secs))
            .with_max_capacity(self.cache.max_capacity)
    }
}
