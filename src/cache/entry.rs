use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persisted cache entry: `{"timestamp": <epoch millis>, "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the data was fetched, epoch milliseconds
    pub timestamp: i64,

    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(timestamp: i64, data: T) -> Self {
        CacheEntry { timestamp, data }
    }

    /// Valid iff `now - timestamp < ttl`
    pub fn is_fresh(&self, now: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.timestamp) < ttl_ms
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
