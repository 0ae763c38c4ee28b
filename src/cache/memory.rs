use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::Cache;
use crate::error::Result;

/// Longest lifetime the volatile tier will honour.
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Process-local tier. Bounded by entry count; each operation holds the lock
/// for a single key only.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.put(
            key.to_string(),
            Entry {
                value,
                expires_at: expiry(ttl),
            },
        );
        Ok(())
    }
}

fn expiry(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_value_until_ttl_elapses() {
        let cache = MemoryCache::new(8);
        cache
            .set("price/native", json!({"usd": "1.25"}), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("price/native").await.unwrap(),
            Some(json!({"usd": "1.25"}))
        );

        cache
            .set("short", json!(1), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_bounds_entries() {
        let cache = MemoryCache::new(2);
        for key in ["a", "b", "c"] {
            cache.set(key, json!(key), Duration::from_secs(60)).await.unwrap();
        }
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("c").await.unwrap(), Some(json!("c")));
    }

    #[tokio::test]
    async fn oversized_ttl_is_capped_instead_of_overflowing() {
        let cache = MemoryCache::new(2);
        cache.set("k", json!(1), Duration::MAX).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));
    }
}
