use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type FolderLock = Arc<AsyncMutex<()>>;

/// Async locks keyed by folder id.
///
/// An entry lives only while some task holds or waits for it, so ids that
/// are never used again leave nothing behind.
#[derive(Default)]
pub(crate) struct FolderLocks {
    locks: Mutex<HashMap<String, FolderLock>>,
}

impl FolderLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<String, FolderLock>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn lock(&self, folder_id: &str) -> FolderGuard<'_> {
        let lock = self.map().entry(folder_id.to_string()).or_default().clone();

        // Built before waiting so a cancelled wait still cleans up.
        let mut held = FolderGuard {
            owner: self,
            folder_id: folder_id.to_string(),
            lock,
            guard: None,
        };
        held.guard = Some(held.lock.clone().lock_owned().await);
        held
    }

    pub(crate) fn len(&self) -> usize {
        self.map().len()
    }
}

pub(crate) struct FolderGuard<'a> {
    owner: &'a FolderLocks,
    folder_id: String,
    lock: FolderLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FolderGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.owner.map();
        // Only the map and this guard still point at the lock.
        if Arc::strong_count(&self.lock) == 2 {
            let ours = locks
                .get(&self.folder_id)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
            if ours {
                locks.remove(&self.folder_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_released_lock_is_forgotten() {
        let locks = FolderLocks::default();
        {
            let _guard = locks.lock("7").await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry_alive() {
        let locks = Arc::new(FolderLocks::default());
        let first = locks.lock("7").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("7").await;
                locks.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);

        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_wait_cleans_up() {
        let locks = FolderLocks::default();
        let held = locks.lock("7").await;

        let wait = tokio::time::timeout(Duration::from_millis(10), locks.lock("7")).await;
        assert!(wait.is_err());

        drop(held);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_folders_are_independent() {
        let locks = FolderLocks::default();
        let _a = locks.lock("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.lock("b"))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }
}
