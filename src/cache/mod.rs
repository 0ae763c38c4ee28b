use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{LedgerPilotError, Result};

pub mod memory;
mod schema;
pub mod sqlite;
pub mod tiered;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use tiered::TieredCache;

/// Keyed JSON cache with per-entry time-to-live. Expiry is checked lazily on
/// read; nothing evicts in the background.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
}

/// Entries that no longer decode as `T` are treated as misses.
pub async fn get_typed<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    let Some(value) = cache.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(err) => {
            warn!(key, "ignoring undecodable cache entry: {err}");
            Ok(None)
        }
    }
}

pub async fn set_typed<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let encoded = serde_json::to_value(value)
        .map_err(|e| LedgerPilotError::Serialization(format!("cache encode failed: {e}")))?;
    cache.set(key, encoded, ttl).await
}

/// Quotes are per asset; the asset id is part of the key.
pub fn price_key(asset_id: &str) -> String {
    format!("price/{asset_id}")
}

/// Chain reads are scoped by network so one cache file can serve several.
pub fn balance_key(network: &str, address: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => format!("balance/{network}/{address}/{token}"),
        None => format!("balance/{network}/{address}"),
    }
}

pub fn portfolio_key(network: &str, address: &str, asset_id: &str) -> String {
    format!("portfolio/{network}/{address}/{asset_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_separate_networks_and_assets() {
        assert_ne!(
            balance_key("devnet", "A", None),
            balance_key("mainnet", "A", None)
        );
        assert_eq!(balance_key("devnet", "A", Some("T")), "balance/devnet/A/T");
        assert_ne!(
            portfolio_key("devnet", "A", "mina-protocol"),
            portfolio_key("devnet", "A", "bitcoin")
        );
        assert_ne!(price_key("mina-protocol"), price_key("bitcoin"));
    }
}
