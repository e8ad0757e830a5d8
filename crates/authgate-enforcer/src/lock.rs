//! Per-identity lock table for serializing cache population.
//!
//! Each identity gets at most one in-flight cache-population pass at a
//! time; reads for other identities proceed fully concurrently. Slots are
//! created on first use and removed when the last holder or waiter leaves,
//! so the table never retains a handle for an idle identity.
//!
//! Acquisition uses DashMap's entry API for an atomic
//! get-or-create-and-increment, and release decrements under the same shard
//! locking, closing the window in which two callers racing on a
//! never-before-seen identity could each mint their own handle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One identity's lock slot: the mutex itself plus a count of holders and
/// waiters keeping the slot alive.
#[derive(Debug)]
struct LockSlot {
    mutex: Arc<Mutex<()>>,
    holders: AtomicUsize,
}

/// Table of per-identity mutual-exclusion handles.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    slots: DashMap<String, Arc<LockSlot>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Acquires the lock for `identity`, blocking until any in-flight
    /// critical section for that identity completes.
    ///
    /// The returned guard releases the lock on drop and removes the slot
    /// once no other holder or waiter remains.
    pub async fn acquire(&self, identity: &str) -> IdentityLockGuard<'_> {
        use dashmap::mapref::entry::Entry;

        // Registration and refcount increment are atomic per key: the
        // entry API holds the shard lock, so a concurrent release cannot
        // remove the slot between lookup and increment.
        let slot = match self.slots.entry(identity.to_string()) {
            Entry::Occupied(entry) => {
                let slot = Arc::clone(entry.get());
                slot.holders.fetch_add(1, Ordering::SeqCst);
                slot
            }
            Entry::Vacant(entry) => {
                let slot = Arc::new(LockSlot {
                    mutex: Arc::new(Mutex::new(())),
                    holders: AtomicUsize::new(1),
                });
                entry.insert(Arc::clone(&slot));
                slot
            }
        };

        let permit = Arc::clone(&slot.mutex).lock_owned().await;

        IdentityLockGuard {
            table: self,
            identity: identity.to_string(),
            slot,
            permit: Some(permit),
        }
    }

    /// Number of live slots. Zero whenever no critical section is pending
    /// or active.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn release(&self, identity: &str, slot: &Arc<LockSlot>) {
        if slot.holders.fetch_sub(1, Ordering::SeqCst) == 1 {
            // remove_if re-checks the count under the shard lock, so an
            // acquire racing with this release either keeps the slot alive
            // or finds it gone and creates a fresh one.
            self.slots
                .remove_if(identity, |_, s| s.holders.load(Ordering::SeqCst) == 0);
        }
    }
}

/// RAII guard for one identity's critical section.
#[must_use = "the identity lock is held only while the guard is alive"]
#[derive(Debug)]
pub struct IdentityLockGuard<'a> {
    table: &'a IdentityLocks,
    identity: String,
    slot: Arc<LockSlot>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityLockGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before retiring the slot so a queued waiter
        // wakes under a still-registered handle.
        self.permit.take();
        self.table.release(&self.identity, &self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_creates_and_release_removes_slot() {
        let locks = IdentityLocks::new();
        assert_eq!(locks.slot_count(), 0);

        let guard = locks.acquire("alice").await;
        assert_eq!(locks.slot_count(), 1);

        drop(guard);
        assert_eq!(locks.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_distinct_identities_do_not_contend() {
        let locks = Arc::new(IdentityLocks::new());

        let _alice = locks.acquire("alice").await;

        // Bob's acquisition must not wait on Alice's critical section.
        let bob = tokio::time::timeout(Duration::from_millis(100), locks.acquire("bob")).await;
        assert!(bob.is_ok(), "independent identity should acquire immediately");
        assert_eq!(locks.slot_count(), 2);
    }

    #[tokio::test]
    async fn test_same_identity_serializes() {
        let locks = Arc::new(IdentityLocks::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let guard = locks.acquire("alice").await;

        let locks2 = locks.clone();
        let order2 = order.clone();
        let waiter = tokio::spawn(async move {
            let _guard = locks2.acquire("alice").await;
            order2.lock().unwrap().push("second");
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        order.lock().unwrap().push("first");
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(locks.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_slot_alive_across_release() {
        let locks = Arc::new(IdentityLocks::new());

        let guard = locks.acquire("alice").await;

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = locks2.acquire("alice").await;
            // Hold briefly so the first release happens while we wait/hold.
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        // Let the waiter queue up, then release; the slot must survive
        // until the waiter is done with it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(locks.slot_count(), 1);
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(locks.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_no_slot_leak_under_racing_acquires() {
        let locks = Arc::new(IdentityLocks::new());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..20 {
                    let _guard = locks.acquire("hot").await;
                }
            }));
        }
        futures::future::join_all(handles).await;

        assert_eq!(locks.slot_count(), 0, "all slots must retire when idle");
    }
}
