use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{self, Cache};
use crate::config::PriceSettings;
use crate::error::{LedgerPilotError, Result};
use crate::units;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2_000);

/// Bounded exponential backoff: attempt `n` (1-based) is followed by a pause
/// of `base_delay * 2^(n-1)`. No pause follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `operation` until it succeeds or the attempts are exhausted,
    /// returning the last error.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{label} failed on attempt={attempt}/{max_attempts}; retrying in {}ms: {err}",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!("{label} failed on attempt={attempt}/{max_attempts}; giving up: {err}");
                    return Err(err);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub usd: Decimal,
    pub fetched_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub total_native: Decimal,
    pub total_usd: Decimal,
    pub price_usd: Decimal,
}

impl Portfolio {
    pub fn compose(total_native: Decimal, price_usd: Decimal) -> Result<Self> {
        let total_usd = total_native.checked_mul(price_usd).ok_or_else(|| {
            LedgerPilotError::NetworkUnavailable(format!(
                "price quote {price_usd} is out of range for this balance"
            ))
        })?;
        Ok(Self {
            total_native,
            total_usd,
            price_usd,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "{} (${} USD at ${} each)",
            units::display(self.total_native),
            units::display(self.total_usd),
            units::display(self.price_usd)
        )
    }
}

/// Native asset USD price, read through the cache and refreshed from a
/// CoinGecko-shaped `simple/price` endpoint under a retry policy.
pub struct PriceFetcher {
    cache: Arc<dyn Cache>,
    http: reqwest::Client,
    url: String,
    asset_id: String,
    ttl: Duration,
    retry: RetryPolicy,
}

impl PriceFetcher {
    pub fn new(
        cache: Arc<dyn Cache>,
        settings: &PriceSettings,
        ttl: Duration,
        http_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| LedgerPilotError::Http(e.to_string()))?;
        Ok(Self {
            cache,
            http,
            url: settings.url.clone(),
            asset_id: settings.asset_id.clone(),
            ttl,
            retry: RetryPolicy::with_base_delay(settings.retry_base_delay),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub async fn fetch_price(&self) -> Result<PriceQuote> {
        let key = cache::price_key(&self.asset_id);
        if let Some(quote) = cache::get_typed::<PriceQuote>(self.cache.as_ref(), &key).await? {
            debug!(usd = %quote.usd, "using cached price");
            return Ok(quote);
        }

        let usd = self
            .retry
            .run("price fetch", |_| self.fetch_origin_price())
            .await?;
        let quote = PriceQuote {
            usd,
            fetched_at: unix_now(),
        };
        cache::set_typed(self.cache.as_ref(), &key, &quote, self.ttl).await?;
        Ok(quote)
    }

    async fn fetch_origin_price(&self) -> Result<Decimal> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("ids", self.asset_id.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| LedgerPilotError::NetworkUnavailable(format!("price request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LedgerPilotError::NetworkUnavailable(format!("price read failed: {e}")))?;
        if !status.is_success() {
            return Err(LedgerPilotError::NetworkUnavailable(format!(
                "price endpoint returned {status}: {body}"
            )));
        }
        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            LedgerPilotError::NetworkUnavailable(format!("price response is not JSON: {e}"))
        })?;
        parse_price(&payload, &self.asset_id)
    }
}

fn parse_price(payload: &Value, asset_id: &str) -> Result<Decimal> {
    let usd = payload
        .get(asset_id)
        .and_then(|asset| asset.get("usd"))
        .ok_or_else(|| {
            LedgerPilotError::NetworkUnavailable(format!("price response has no usd quote for {asset_id}"))
        })?;
    units::decimal_from_json(usd)
        .map_err(|e| LedgerPilotError::NetworkUnavailable(format!("malformed usd quote: {}", e.detail())))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
