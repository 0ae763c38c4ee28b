use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::actions::{
    BalanceAction, BatchTransferAction, DeployTokenAction, FaucetAction, TransferAction,
};
use crate::error::Result;
use crate::interfaces::actions::{Action, ContextProvider, Message, Plugin, State};
use crate::plugins::registry::ActionRegistry;
use crate::runtime::WalletRuntime;

pub const PLUGIN_NAME: &str = "ledger-pilot";

/// Injects the wallet address, network and holdings into agent prompts.
pub struct WalletContextProvider {
    runtime: Arc<WalletRuntime>,
}

impl WalletContextProvider {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl ContextProvider for WalletContextProvider {
    fn name(&self) -> &str {
        "wallet"
    }

    async fn get(&self, _message: &Message, _state: &State) -> Result<String> {
        let config = self.runtime.config()?;
        let wallet = self.runtime.wallet(&config)?;
        Ok(wallet.wallet_context().await)
    }
}

pub struct WalletPlugin {
    runtime: Arc<WalletRuntime>,
}

impl WalletPlugin {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    pub fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![
            Arc::new(BalanceAction::new(self.runtime.clone())),
            Arc::new(FaucetAction::new(self.runtime.clone())),
            Arc::new(TransferAction::new(self.runtime.clone())),
            Arc::new(BatchTransferAction::new(self.runtime.clone())),
            Arc::new(DeployTokenAction::new(self.runtime.clone())),
        ]
    }
}

#[async_trait]
impl Plugin for WalletPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn description(&self) -> &str {
        "Wallet balances, faucet funding, transfers, batch transfers and token deployment"
    }

    async fn initialize(&self, registry: &ActionRegistry) -> bool {
        let mut ok = true;
        for action in self.actions() {
            let name = action.name().to_string();
            if !registry.register_action(action).await {
                warn!(action = %name, "action already registered");
                ok = false;
            }
        }
        let provider = Arc::new(WalletContextProvider::new(self.runtime.clone()));
        ok &= registry.register_provider(provider).await;
        ok
    }
}
