//! Batch evaluation: shard fan-out, merge, and write-through caching.
//!
//! A batch call asks thousands of per-item questions for one
//! (identity, resource, action) scope. The pass is serialized per identity
//! by the lock table so concurrent callers cannot stampede the engine for
//! the same identity; items already decided in the cache are reused, and
//! only the remainder is partitioned across concurrent shard workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use authgate_domain::cache::CacheKey;

use crate::enforcer::Enforcer;

/// Computes contiguous `[start, end)` shard bounds covering `0..total`.
///
/// At most `max_shards` shards; every index is covered exactly once and
/// shard sizes differ by at most one. Empty for an empty input.
pub(crate) fn shard_bounds(total: usize, max_shards: usize) -> Vec<(usize, usize)> {
    if total == 0 || max_shards == 0 {
        return Vec::new();
    }
    let shards = max_shards.min(total);
    (0..shards)
        .map(|i| (i * total / shards, (i + 1) * total / shards))
        .collect()
}

impl Enforcer {
    /// Evaluates a batch of items for one identity/resource/action scope.
    ///
    /// Returns the full `{item -> decision}` mapping for the requested
    /// items. The pass holds the identity's lock end to end:
    ///
    /// 1. decisions already cached for the scope are reused;
    /// 2. remaining items are partitioned across at most
    ///    `batch.max_shards` concurrent workers, each evaluating its items
    ///    through the single-decision path;
    /// 3. all workers are joined, their partial maps merged, and the
    ///    scope's accumulated mapping (prior cached decisions plus this
    ///    call's) written back through the cache.
    ///
    /// Aggregate shard timing is emitted as a side effect; it is not part
    /// of the return contract.
    pub async fn enforce_batch(
        self: &Arc<Self>,
        identity: &str,
        resource: &str,
        action: &str,
        items: Vec<String>,
    ) -> HashMap<String, bool> {
        let identity = identity.to_lowercase();
        let _guard = self.locks.acquire(&identity).await;

        let key = CacheKey::new(identity.clone(), resource, action);
        let mut result: HashMap<String, bool> = HashMap::with_capacity(items.len());

        // The stored mapping accumulates every decision ever merged for
        // this scope, not just the current call's items; the returned
        // mapping stays restricted to what was asked for.
        let mut write_back: HashMap<String, bool> = HashMap::new();

        let mut remaining = items;
        if let Some(cached) = self.cache.get(&key).await {
            write_back = cached.as_ref().clone();
            remaining.retain(|item| match cached.get(item) {
                Some(decision) => {
                    result.insert(item.clone(), *decision);
                    false
                }
                None => true,
            });
            debug!(
                identity = %identity,
                resource,
                action,
                reused = result.len(),
                remaining = remaining.len(),
                "batch seeded from cache"
            );
        }

        let total = remaining.len();
        let bounds = shard_bounds(total, self.batch.max_shards);
        let dispatched = bounds.len();

        let mut workers = Vec::with_capacity(dispatched);
        for (start, end) in bounds {
            let shard = remaining[start..end].to_vec();
            let enforcer = Arc::clone(self);
            let identity = identity.clone();
            let resource = resource.to_string();
            let action = action.to_string();
            workers.push(tokio::spawn(async move {
                let started = Instant::now();
                let mut decisions = HashMap::with_capacity(shard.len());
                for item in shard {
                    let allowed = enforcer
                        .enforce_for_identity(&identity, &resource, &action, Some(&item))
                        .await;
                    decisions.insert(item, allowed);
                }
                (decisions, started.elapsed())
            }));
        }

        let mut latencies = Vec::with_capacity(dispatched);
        for outcome in join_all(workers).await {
            match outcome {
                Ok((decisions, elapsed)) => {
                    for (item, allowed) in decisions {
                        write_back.insert(item.clone(), allowed);
                        result.insert(item, allowed);
                    }
                    metrics::histogram!("authgate_batch_shard_duration_seconds")
                        .record(elapsed.as_secs_f64());
                    latencies.push(elapsed);
                }
                Err(error) => {
                    // A panicked worker loses its shard; the merged result
                    // simply omits those items rather than failing the call.
                    warn!(%error, identity = %identity, "batch shard worker failed");
                }
            }
        }

        self.cache.insert(key, write_back).await;

        log_shard_timing(
            &identity,
            resource,
            action,
            total,
            dispatched,
            self.cache.is_enabled(),
            &latencies,
        );

        result
    }
}

/// Emits the aggregate per-shard timing for one batch pass.
fn log_shard_timing(
    identity: &str,
    resource: &str,
    action: &str,
    total: usize,
    dispatched: usize,
    cached: bool,
    latencies: &[Duration],
) {
    let sum: Duration = latencies.iter().sum();
    let max = latencies.iter().max().copied().unwrap_or_default();
    let min = latencies.iter().min().copied().unwrap_or_default();
    let mean = if latencies.is_empty() {
        Duration::ZERO
    } else {
        sum / latencies.len() as u32
    };

    info!(
        identity = %identity,
        resource,
        action,
        size = total,
        shards = dispatched,
        total_ms = sum.as_millis() as u64,
        max_ms = max.as_millis() as u64,
        min_ms = min.as_millis() as u64,
        mean_ms = mean.as_millis() as u64,
        cached,
        "batch enforcement finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flattens shard bounds back into the covered index sequence.
    fn covered(bounds: &[(usize, usize)]) -> Vec<usize> {
        bounds.iter().flat_map(|&(s, e)| s..e).collect()
    }

    #[test]
    fn test_partition_completeness() {
        let max_shards = 10;
        for total in [0usize, 1, 9, 10, 11, 1000] {
            let bounds = shard_bounds(total, max_shards);
            let indices = covered(&bounds);
            assert_eq!(
                indices,
                (0..total).collect::<Vec<_>>(),
                "every index covered exactly once for total={total}"
            );
        }
    }

    #[test]
    fn test_shard_count_is_min_of_limit_and_total() {
        assert_eq!(shard_bounds(3, 10).len(), 3);
        assert_eq!(shard_bounds(100, 10).len(), 10);
        assert_eq!(shard_bounds(10, 10).len(), 10);
    }

    #[test]
    fn test_shard_sizes_differ_by_at_most_one() {
        for total in [1usize, 9, 10, 11, 95, 1000] {
            let bounds = shard_bounds(total, 10);
            let sizes: Vec<usize> = bounds.iter().map(|&(s, e)| e - s).collect();
            let min = sizes.iter().min().unwrap();
            let max = sizes.iter().max().unwrap();
            assert!(
                max - min <= 1,
                "sizes for total={total} spread too far: {sizes:?}"
            );
        }
    }

    #[test]
    fn test_empty_input_dispatches_nothing() {
        assert!(shard_bounds(0, 10).is_empty());
    }

    #[test]
    fn test_zero_shard_limit_dispatches_nothing() {
        // Config validation clamps this before it reaches a batch call.
        assert!(shard_bounds(5, 0).is_empty());
    }
}
