//! Per-key async leases for single-flight operations
//!
//! At most one task holds the lease for a key at a time. Followers block on
//! the same lease; once the leader finishes, a follower should re-check
//! whether the work is still needed before doing it again.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use std::sync::Arc;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease for a key, waiting for the current holder.
    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_holders_run_work_exactly_once() {
        let locks = Arc::new(KeyedLocks::new());
        let upstream_calls = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let key = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let upstream_calls = upstream_calls.clone();
            let done = done.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(key).await;
                // Follower re-check: the leader already refreshed
                if done.load(Ordering::SeqCst) > 0 {
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                upstream_calls.fetch_add(1, Ordering::SeqCst);
                done.store(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_serialize() {
        let locks = KeyedLocks::new();
        let a = locks.acquire(Uuid::new_v4()).await;
        // acquiring a different key must not block while `a` is held
        let b = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(b.is_ok());
        drop(a);
    }
}
