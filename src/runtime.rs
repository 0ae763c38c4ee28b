use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Cache, MemoryCache, SqliteCache, TieredCache};
use crate::chain::faucet::FaucetClient;
use crate::chain::{ChainConnector, RpcConnector};
use crate::config::{SettingsSource, WalletConfig};
use crate::error::Result;
use crate::extraction::{IntentExtractor, OpenAiExtractor, UnavailableExtractor};
use crate::price::PriceFetcher;
use crate::wallet::WalletProvider;

const CACHE_NAMESPACE_PREFIX: &str = "ledger_pilot";

/// Long-lived collaborators shared by every action. Configuration is re-read
/// and validated on each invocation; the chain client is built per invocation.
pub struct WalletRuntime {
    settings: Arc<dyn SettingsSource>,
    extractor: Arc<dyn IntentExtractor>,
    connector: Arc<dyn ChainConnector>,
    cache: Arc<dyn Cache>,
}

impl WalletRuntime {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        extractor: Arc<dyn IntentExtractor>,
        connector: Arc<dyn ChainConnector>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            settings,
            extractor,
            connector,
            cache,
        }
    }

    /// Production wiring: tiered memory/SQLite cache namespaced by wallet
    /// address, OpenAI extraction and the JSON-RPC chain client.
    pub async fn open(settings: Arc<dyn SettingsSource>) -> Result<Self> {
        let config = WalletConfig::from_settings(settings.as_ref())?;
        let address = config.keypair()?.address();
        let durable = SqliteCache::open(
            &config.cache.sqlite_path,
            format!("{CACHE_NAMESPACE_PREFIX}/{address}"),
        )
        .await?;
        let cache = TieredCache::new(MemoryCache::default(), durable, config.cache.local_ttl);
        let extractor: Arc<dyn IntentExtractor> = match OpenAiExtractor::from_settings(&config.openai) {
            Ok(extractor) => Arc::new(extractor.with_timeout(config.network.http_timeout)?),
            Err(err) => {
                warn!("intent extraction disabled: {err}");
                Arc::new(UnavailableExtractor::new(err.detail()))
            }
        };
        info!(
            network = %config.network.network,
            %address,
            cache = %config.cache.sqlite_path,
            "wallet runtime ready"
        );
        Ok(Self::new(
            settings,
            extractor,
            Arc::new(RpcConnector),
            Arc::new(cache),
        ))
    }

    pub fn with_connector(mut self, connector: Arc<dyn ChainConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IntentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> Result<WalletConfig> {
        WalletConfig::from_settings(self.settings.as_ref())
    }

    pub fn extractor(&self) -> &Arc<dyn IntentExtractor> {
        &self.extractor
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn wallet(&self, config: &WalletConfig) -> Result<WalletProvider> {
        let chain = self.connector.connect(&config.network)?;
        let prices = PriceFetcher::new(
            self.cache.clone(),
            &config.price,
            config.cache.ttl,
            config.network.http_timeout,
        )?;
        Ok(WalletProvider::new(
            config.keypair()?,
            config.network.clone(),
            chain,
            self.cache.clone(),
            prices,
            config.cache.ttl,
            config.cache.portfolio_ttl,
        ))
    }

    pub fn faucet(&self, config: &WalletConfig) -> Result<FaucetClient> {
        FaucetClient::new(&config.network)
    }
}
