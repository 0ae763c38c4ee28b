use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::NetworkContext;
use crate::error::Result;
use crate::keys::{Address, TokenId};

pub mod faucet;
pub mod rpc;
pub mod transaction;

pub use transaction::{Operation, SignedTransaction, Transaction, TransactionBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: u64,
    pub nonce: u64,
}

/// Token ledger metadata as recorded by its deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Included,
    Failed { error: String },
}

/// Chain access used by the wallet. `fetch_account` returns `Ok(None)` when
/// the account does not exist; every other failure is an error.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn fetch_account(
        &self,
        address: &Address,
        token: Option<&TokenId>,
    ) -> Result<Option<AccountState>>;

    /// Metadata for a deployed token; `Ok(None)` when no such token exists.
    async fn fetch_token(&self, token: &TokenId) -> Result<Option<TokenInfo>>;

    /// Submits a signed transaction and returns its hash.
    async fn submit(&self, tx: &SignedTransaction) -> Result<String>;

    async fn wait_for_inclusion(&self, hash: &str) -> Result<()>;
}

/// Builds a chain client for one handler invocation.
pub trait ChainConnector: Send + Sync {
    fn connect(&self, network: &NetworkContext) -> Result<Arc<dyn ChainClient>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RpcConnector;

impl ChainConnector for RpcConnector {
    fn connect(&self, network: &NetworkContext) -> Result<Arc<dyn ChainClient>> {
        Ok(Arc::new(rpc::RpcChainClient::new(network)?))
    }
}
