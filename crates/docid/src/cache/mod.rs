//! Process-wide store for harvested OCR results.
//!
//! Entries expire on their own; nothing here is durable.

pub mod memory;
pub mod moka_cache;

use std::time::Duration;

use crate::ocr::PendingResultQueue;

pub use memory::{Clock, ManualClock, MemoryResultCache, SystemClock};
pub use moka_cache::MokaResultCache;

/// Keyed store of pending result queues with per-entry expiry.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<PendingResultQueue>;

    /// Stores `queue` under `key`, replacing any previous value and
    /// restarting its time to live.
    fn set(&self, key: &str, queue: PendingResultQueue, ttl: Duration);

    fn remove(&self, key: &str);
}

/// Cache key of a folder's harvested results.
pub fn folder_key(folder_id: &str) -> String {
    format!("ocr_data_{}", folder_id)
}
