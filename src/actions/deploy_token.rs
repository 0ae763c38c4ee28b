use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::templates::{deploy_token_schema, DEPLOY_TOKEN_TEMPLATE};
use crate::actions::{
    extract_intent, finish, has_text, optional_address, required_amount, required_string,
    ActionOutcome,
};
use crate::chain::Operation;
use crate::error::{LedgerPilotError, Result};
use crate::interfaces::actions::{Action, ActionCallback, ActionExample, ActionReply, Message, State};
use crate::keys::WalletKeypair;
use crate::runtime::WalletRuntime;
use crate::units;

pub const NAME: &str = "DEPLOY_TOKEN";

const MAX_SYMBOL_LEN: usize = 6;
const MAX_TOKEN_DECIMALS: u32 = 18;
const DEFAULT_TOKEN_DECIMALS: u32 = 9;

pub struct DeployTokenAction {
    runtime: Arc<WalletRuntime>,
}

impl DeployTokenAction {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    async fn run(&self, message: &Message, state: &State) -> ActionOutcome {
        let config = self.runtime.config()?;
        let wallet = self.runtime.wallet(&config)?;
        let intent = extract_intent(
            &self.runtime,
            &wallet,
            DEPLOY_TOKEN_TEMPLATE,
            &deploy_token_schema(),
            message,
            state,
        )
        .await?;

        let symbol = token_symbol(&intent)?;
        let decimals = token_decimals(&intent)?;
        let recipient = optional_address(&intent, "recipient")?.unwrap_or_else(|| wallet.address());
        let supply = required_amount(&intent, "initial_supply")?;
        let raw_supply = units::to_raw(supply, decimals)?;

        let sender = wallet.require_account(&wallet.address()).await?;

        // Fresh per deployment; neither key is stored.
        let token_key = WalletKeypair::generate()?;
        let admin_key = WalletKeypair::generate()?;
        let token = token_key.address();
        let admin = admin_key.address();

        let hash = wallet
            .submit(
                sender.nonce,
                vec![
                    Operation::DeployToken {
                        token,
                        admin,
                        symbol: symbol.clone(),
                        decimals,
                    },
                    Operation::Mint {
                        token,
                        to: recipient,
                        amount: raw_supply,
                    },
                ],
                &[&token_key, &admin_key],
            )
            .await?;
        wallet.confirm(&hash).await?;

        Ok(ActionReply::success(
            format!(
                "Deployed token {symbol} at {token} and minted {} to {recipient}. Transaction hash: {hash}",
                units::display(supply)
            ),
            json!({
                "symbol": symbol,
                "decimals": decimals,
                "token_address": token.to_string(),
                "admin_address": admin.to_string(),
                "recipient": recipient.to_string(),
                "initial_supply": supply.to_string(),
                "hash": hash,
            }),
        ))
    }
}

fn token_symbol(intent: &Value) -> Result<String> {
    let symbol = required_string(intent, "symbol")?.to_ascii_uppercase();
    if symbol.len() > MAX_SYMBOL_LEN || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LedgerPilotError::ExtractionInvalid(format!(
            "symbol must be 1-{MAX_SYMBOL_LEN} ASCII letters or digits: {symbol}"
        )));
    }
    Ok(symbol)
}

fn token_decimals(intent: &Value) -> Result<u32> {
    let decimals = match intent.get("decimals") {
        None | Some(Value::Null) => return Ok(DEFAULT_TOKEN_DECIMALS),
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match decimals {
        Some(value) if value <= MAX_TOKEN_DECIMALS as u64 => Ok(value as u32),
        _ => Err(LedgerPilotError::ExtractionInvalid(format!(
            "decimals must be an integer between 0 and {MAX_TOKEN_DECIMALS}"
        ))),
    }
}

#[async_trait]
impl Action for DeployTokenAction {
    fn name(&self) -> &str {
        NAME
    }

    fn similes(&self) -> &[&str] {
        &["CREATE_TOKEN", "LAUNCH_TOKEN", "MINT_NEW_TOKEN"]
    }

    fn description(&self) -> &str {
        "Deploy a new fungible token and mint its initial supply to a recipient"
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        vec![vec![
            ActionExample::user("Create a token called PILOT with 1,000,000 supply"),
            ActionExample::agent("Deploying the PILOT token now.", NAME),
        ]]
    }

    fn validate(&self, message: &Message) -> bool {
        has_text(message) && self.runtime.config().is_ok()
    }

    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool {
        let outcome = self.run(message, state).await;
        finish(NAME, "Token deployment failed", outcome, callback)
    }
}
