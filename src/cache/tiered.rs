use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::cache::Cache;
use crate::error::Result;

/// Read-through composition of a volatile tier over a durable one.
///
/// Reads consult `local` first, then `durable`, backfilling `local` on a
/// durable hit. Writes go to both tiers. The local tier keeps its own TTL,
/// capped by the TTL of the write; a backfilled entry gets the full local
/// TTL because the remaining durable lifetime is not known. Durable-tier
/// errors are returned to the caller.
pub struct TieredCache<L, D> {
    local: L,
    durable: D,
    local_ttl: Duration,
}

impl<L: Cache, D: Cache> TieredCache<L, D> {
    pub fn new(local: L, durable: D, local_ttl: Duration) -> Self {
        Self {
            local,
            durable,
            local_ttl,
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }
}

#[async_trait]
impl<L: Cache, D: Cache> Cache for TieredCache<L, D> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.local.get(key).await? {
            debug!(key, tier = "local", "cache hit");
            return Ok(Some(value));
        }

        match self.durable.get(key).await? {
            Some(value) => {
                debug!(key, tier = "durable", "cache hit; backfilling local tier");
                self.local.set(key, value.clone(), self.local_ttl).await?;
                Ok(Some(value))
            }
            None => {
                debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.durable.set(key, value.clone(), ttl).await?;
        self.local.set(key, value, ttl.min(self.local_ttl)).await
    }
}
