use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use crate::ocr::PendingResultQueue;

use super::ResultCache;

const MAX_FOLDERS: u64 = 10_000;

#[derive(Clone)]
struct Entry {
    queue: PendingResultQueue,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// [`ResultCache`] backed by a bounded `moka` cache.
#[derive(Clone)]
pub struct MokaResultCache {
    inner: Cache<String, Entry>,
}

impl MokaResultCache {
    pub fn new() -> Self {
        Self::with_capacity(MAX_FOLDERS)
    }

    pub fn with_capacity(max_folders: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_folders)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MokaResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MokaResultCache {
    fn get(&self, key: &str) -> Option<PendingResultQueue> {
        self.inner.get(key).map(|entry| entry.queue)
    }

    fn set(&self, key: &str, queue: PendingResultQueue, ttl: Duration) {
        self.inner.insert(key.to_string(), Entry { queue, ttl });
    }

    fn remove(&self, key: &str) {
        self.inner.invalidate(key);
    }
}
