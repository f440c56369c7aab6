use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes work per visitor fingerprint so find-then-update sequences
/// for the same visitor never interleave.
///
/// Each entry counts its holder plus waiters and is removed when that count
/// reaches zero, including when a waiter is cancelled.
#[derive(Default)]
pub struct FingerprintLocks {
    locks: Mutex<HashMap<String, (Arc<AsyncMutex<()>>, usize)>>,
}

/// Registration of one acquirer; releases its share of the entry on drop.
struct Slot<'a> {
    owner: &'a FingerprintLocks,
    key: String,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, users)) = locks.get_mut(&self.key) {
            *users -= 1;
            if *users == 0 {
                locks.remove(&self.key);
            }
        }
    }
}

pub struct FingerprintGuard<'a> {
    // Field order matters: unlock before giving up the slot
    _guard: OwnedMutexGuard<()>,
    _slot: Slot<'a>,
}

impl FingerprintLocks {
    pub async fn acquire(&self, key: &str) -> FingerprintGuard<'_> {
        let (lock, slot) = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            let (lock, users) = locks
                .entry(key.to_string())
                .or_insert_with(|| (Arc::new(AsyncMutex::new(())), 0));
            *users += 1;
            let slot = Slot {
                owner: self,
                key: key.to_string(),
            };
            (lock.clone(), slot)
        };

        let guard = lock.lock_owned().await;
        FingerprintGuard {
            _guard: guard,
            _slot: slot,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[actix_web::test]
    async fn entries_are_pruned_after_release() {
        let locks = FingerprintLocks::default();
        {
            let _a = locks.acquire("1.2.3.4_dev1").await;
            let _b = locks.acquire("5.6.7.8_dev2").await;
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }

    #[actix_web::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(FingerprintLocks::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            async move {
                let _guard = locks.acquire("same").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }
        });
        futures_util::future::join_all(tasks).await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }

    #[actix_web::test]
    async fn cancelled_waiter_does_not_leak_entry() {
        use futures_util::FutureExt;

        let locks = FingerprintLocks::default();
        let held = locks.acquire("1.2.3.4_dev1").await;

        // Polled once while the lock is held, then dropped mid-wait
        assert!(locks.acquire("1.2.3.4_dev1").now_or_never().is_none());
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.len(), 0);

        // The key is still usable afterwards
        let _again = locks.acquire("1.2.3.4_dev1").await;
        assert_eq!(locks.len(), 1);
    }
}
