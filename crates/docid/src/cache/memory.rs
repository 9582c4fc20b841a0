use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::ocr::PendingResultQueue;

use super::ResultCache;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map backed [`ResultCache`] with an injectable clock.
///
/// Expired entries are dropped lazily on access.
pub struct MemoryResultCache<C: Clock = SystemClock> {
    clock: C,
    entries: Mutex<HashMap<String, (PendingResultQueue, Instant)>>,
}

impl MemoryResultCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryResultCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryResultCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (PendingResultQueue, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> ResultCache for MemoryResultCache<C> {
    fn get(&self, key: &str) -> Option<PendingResultQueue> {
        let now = self.clock.now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some((queue, expires_at)) if now < *expires_at => Some(queue.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, queue: PendingResultQueue, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries()
            .insert(key.to_string(), (queue, expires_at));
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{RequestId, ResultItem};

    const HOUR: Duration = Duration::from_secs(3600);

    fn single() -> PendingResultQueue {
        std::iter::once(ResultItem::new(RequestId::Int(1), "a.pdf")).collect()
    }

    #[test]
    fn test_expires_after_ttl() {
        let clock = ManualClock::new();
        let cache = MemoryResultCache::with_clock(clock.clone());
        cache.set("ocr_data_7", single(), HOUR);

        clock.advance(HOUR - Duration::from_secs(1));
        assert!(cache.get("ocr_data_7").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("ocr_data_7").is_none());
    }

    #[test]
    fn test_set_refreshes_expiry() {
        let clock = ManualClock::new();
        let cache = MemoryResultCache::with_clock(clock.clone());
        cache.set("k", single(), HOUR);

        clock.advance(Duration::from_secs(3000));
        cache.set("k", PendingResultQueue::new(), HOUR);
        clock.advance(Duration::from_secs(3000));

        assert_eq!(cache.get("k"), Some(PendingResultQueue::new()));
    }

    #[test]
    fn test_remove() {
        let cache = MemoryResultCache::new();
        cache.set("k", single(), HOUR);
        cache.remove("k");
        assert!(cache.get("k").is_none());
    }
}
