use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::cache::{self, Cache};
use crate::chain::{AccountState, ChainClient, Operation, TransactionBuilder};
use crate::config::NetworkContext;
use crate::error::{LedgerPilotError, Result};
use crate::keys::{Address, TokenId, WalletKeypair};
use crate::price::{Portfolio, PriceFetcher, PriceQuote};
use crate::units;

/// Wallet identity plus the collaborators every action needs: the chain
/// client for this invocation, the shared cache and the price fetcher.
pub struct WalletProvider {
    keypair: WalletKeypair,
    network: NetworkContext,
    chain: Arc<dyn ChainClient>,
    cache: Arc<dyn Cache>,
    prices: PriceFetcher,
    balance_ttl: Duration,
    portfolio_ttl: Duration,
}

impl WalletProvider {
    pub fn new(
        keypair: WalletKeypair,
        network: NetworkContext,
        chain: Arc<dyn ChainClient>,
        cache: Arc<dyn Cache>,
        prices: PriceFetcher,
        balance_ttl: Duration,
        portfolio_ttl: Duration,
    ) -> Self {
        Self {
            keypair,
            network,
            chain,
            cache,
            prices,
            balance_ttl,
            portfolio_ttl,
        }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn keypair(&self) -> &WalletKeypair {
        &self.keypair
    }

    pub fn network(&self) -> &NetworkContext {
        &self.network
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Raw balance; a missing account reads as zero.
    pub async fn get_balance(&self, address: &Address, token: Option<&TokenId>) -> Result<u64> {
        match self.chain.fetch_account(address, token).await? {
            Some(account) => Ok(account.balance),
            None => {
                debug!(%address, "account not found; reporting zero balance");
                Ok(0)
            }
        }
    }

    /// Unlike balance reads, sends require the account to exist.
    pub async fn require_account(&self, address: &Address) -> Result<AccountState> {
        self.chain
            .fetch_account(address, None)
            .await?
            .ok_or_else(|| {
                LedgerPilotError::AccountNotFound(format!(
                    "account {address} does not exist on {}",
                    self.network.network
                ))
            })
    }

    pub async fn get_nonce(&self, address: &Address) -> Result<u64> {
        Ok(self.require_account(address).await?.nonce)
    }

    /// Decimal places of the native asset or of `token`. An unknown token is
    /// an error; its amounts cannot be scaled.
    pub async fn decimals_for(&self, token: Option<&TokenId>) -> Result<u32> {
        let Some(token) = token else {
            return Ok(self.network.decimals);
        };
        match self.chain.fetch_token(token).await? {
            Some(info) => {
                debug!(%token, decimals = info.decimals, "resolved token decimals");
                Ok(info.decimals)
            }
            None => Err(LedgerPilotError::AccountNotFound(format!(
                "token {token} is not deployed on {}",
                self.network.network
            ))),
        }
    }

    pub async fn fetch_price(&self) -> Result<PriceQuote> {
        self.prices.fetch_price().await
    }

    async fn cached_native_balance(&self, address: &Address) -> Result<u64> {
        let key = cache::balance_key(self.network.network.as_str(), &address.to_string(), None);
        if let Some(balance) = cache::get_typed::<u64>(self.cache.as_ref(), &key).await? {
            return Ok(balance);
        }
        let balance = self.get_balance(address, None).await?;
        cache::set_typed(self.cache.as_ref(), &key, &balance, self.balance_ttl).await?;
        Ok(balance)
    }

    pub async fn fetch_portfolio(&self, address: &Address) -> Result<Portfolio> {
        let key = cache::portfolio_key(
            self.network.network.as_str(),
            &address.to_string(),
            self.prices.asset_id(),
        );
        if let Some(portfolio) = cache::get_typed::<Portfolio>(self.cache.as_ref(), &key).await? {
            return Ok(portfolio);
        }

        let quote = self.fetch_price().await?;
        let raw = self.cached_native_balance(address).await?;
        let portfolio = Portfolio::compose(units::to_human(raw, self.network.decimals), quote.usd)?;
        cache::set_typed(self.cache.as_ref(), &key, &portfolio, self.portfolio_ttl).await?;
        Ok(portfolio)
    }

    /// Prompt context describing the wallet. Falls back to the bare balance
    /// when the price is unavailable.
    pub async fn wallet_context(&self) -> String {
        let address = self.address();
        let holdings = match self.fetch_portfolio(&address).await {
            Ok(portfolio) => portfolio.summary(),
            Err(err) => {
                warn!("portfolio unavailable for wallet context: {err}");
                match self.get_balance(&address, None).await {
                    Ok(raw) => units::display(units::to_human(raw, self.network.decimals)),
                    Err(err) => {
                        warn!("balance unavailable for wallet context: {err}");
                        "unavailable".to_string()
                    }
                }
            }
        };
        format!(
            "Wallet address: {address}\nNetwork: {}\nBalance: {holdings}",
            self.network.network
        )
    }

    /// Native raw units to human units.
    pub fn human(&self, raw: u64) -> Decimal {
        units::to_human(raw, self.network.decimals)
    }

    /// Builds, signs and submits one transaction from this wallet. The wallet
    /// key always signs; `co_signers` authorize operations on other accounts.
    pub async fn submit(
        &self,
        nonce: u64,
        operations: Vec<Operation>,
        co_signers: &[&WalletKeypair],
    ) -> Result<String> {
        let mut builder = TransactionBuilder::new(self.network.network.as_str())
            .sender(self.address())
            .fee(self.network.tx_fee)
            .memo(&self.network.memo)
            .nonce(nonce);
        for operation in operations {
            builder = builder.operation(operation);
        }
        let mut signers = vec![&self.keypair];
        signers.extend_from_slice(co_signers);
        let signed = builder.build()?.sign(&signers)?;
        let hash = self.chain.submit(&signed).await?;
        info!(%hash, nonce, "transaction submitted");
        Ok(hash)
    }

    /// Blocks until `hash` is included when the network asks for it.
    pub async fn confirm(&self, hash: &str) -> Result<()> {
        if !self.network.wait_for_inclusion {
            return Ok(());
        }
        self.chain.wait_for_inclusion(hash).await?;
        info!(%hash, "transaction included");
        Ok(())
    }
}
